use std::fmt;

use serde::Serialize;

/// Join key across sources: the digits of a fiscal identifier, in order.
///
/// Only [`normalize`] builds one, so every key in the engine is digit-only.
/// An empty key is valid; no length or checksum validation is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip every non-digit character from a raw identifier.
pub fn normalize(raw: &str) -> IdentityKey {
    IdentityKey(raw.chars().filter(|c| c.is_ascii_digit()).collect())
}
