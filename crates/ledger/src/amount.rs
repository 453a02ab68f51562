// Cost cell parsing. Money is carried as i64 minor units (cents) so every
// total in the ledger is exact.

/// Parse a monetary cell into cents.
///
/// - Strips a leading `R$` or `$`, surrounding and inner whitespace
/// - Accepts `1234.56`, `1,234.56`, `1.234,56`, `1234,56`
/// - A lone separator followed by exactly three digits (`1,234`) is a
///   thousands separator when it is a comma, a decimal point when it is a dot
/// - Rounds half-up to two decimal places
///
/// Returns `None` for blank, non-numeric and negative values (`-5`, `(5)`).
pub fn parse_cost(raw: &str) -> Option<i64> {
    let body = numeric_body(raw)?;
    let canonical = canonicalize_separators(&body)?;
    to_cents(&canonical)
}

/// True for a lone dot followed by exactly three digits (`1.234`).
///
/// [`parse_cost`] reads it as a decimal point; a Brazilian export would mean
/// a thousands separator there.
pub fn is_ambiguous_cost(raw: &str) -> bool {
    numeric_body(raw).is_some_and(|body| {
        !body.contains(',')
            && body.matches('.').count() == 1
            && body.rsplit('.').next().is_some_and(|frac| frac.len() == 3)
    })
}

/// Digits and separators of a cost cell, without currency, sign or spaces.
fn numeric_body(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('(') && trimmed.ends_with(')') {
        return None;
    }

    let body = trimmed
        .strip_prefix("R$")
        .or_else(|| trimmed.strip_prefix('$'))
        .unwrap_or(trimmed);

    let cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let unsigned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if unsigned.is_empty() {
        return None;
    }

    if !unsigned.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        return None;
    }
    Some(unsigned.to_string())
}

/// True when the cell holds something, but not a usable cost.
pub fn is_invalid_cost(raw: &str) -> bool {
    !raw.trim().is_empty() && parse_cost(raw).is_none()
}

/// Format cents as a plain decimal string (`123456` → `"1234.56"`).
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Rewrite to digits with at most one `.` as the decimal point.
fn canonicalize_separators(s: &str) -> Option<String> {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    let decimal = match (commas, dots) {
        (0, 0) => None,
        (0, 1) => Some('.'),
        (0, _) => None,
        (1, 0) => {
            let after = s.rsplit(',').next().unwrap_or("");
            if after.len() == 3 {
                None
            } else {
                Some(',')
            }
        }
        (_, 0) => None,
        _ => {
            let last_comma = s.rfind(',')?;
            let last_dot = s.rfind('.')?;
            let sep = if last_comma > last_dot { ',' } else { '.' };
            let sep_count = if sep == ',' { commas } else { dots };
            if sep_count != 1 {
                return None;
            }
            Some(sep)
        }
    };

    let out = s
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            c if Some(c) == decimal => Some('.'),
            _ => None,
        })
        .collect();
    Some(out)
}

fn to_cents(s: &str) -> Option<i64> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let whole: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };

    let mut digits = frac_part.chars().map(|c| c.to_digit(10).map(i64::from));
    let tenths = digits.next().flatten().unwrap_or(0);
    let hundredths = digits.next().flatten().unwrap_or(0);
    let round_up = matches!(digits.next().flatten(), Some(d) if d >= 5);

    whole
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths)?
        .checked_add(i64::from(round_up))
}
