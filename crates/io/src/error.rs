use std::fmt;
use std::path::PathBuf;

/// Failure while reading a source file or writing a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// File could not be opened or read.
    Read { path: PathBuf, message: String },
    /// File was readable but its contents are not a usable table.
    Parse { path: PathBuf, message: String },
    /// No header row, or a header with no data rows under it.
    EmptyTable { path: PathBuf },
    UnsupportedFormat { path: PathBuf, extension: String },
    /// `target` is a path, or `"<stream>"` for writer-based output.
    Write { target: String, message: String },
}

impl IoError {
    pub(crate) fn read(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        IoError::Read { path: path.into(), message: err.to_string() }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        IoError::Parse { path: path.into(), message: err.to_string() }
    }

    pub(crate) fn write(target: impl Into<String>, err: impl fmt::Display) -> Self {
        IoError::Write { target: target.into(), message: err.to_string() }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Read { path, message } => {
                write!(f, "cannot read {}: {message}", path.display())
            }
            IoError::Parse { path, message } => {
                write!(f, "cannot parse {}: {message}", path.display())
            }
            IoError::EmptyTable { path } => {
                write!(f, "{} has no data rows under a header", path.display())
            }
            IoError::UnsupportedFormat { path, extension } => {
                if extension.is_empty() {
                    write!(f, "{}: file has no extension", path.display())
                } else {
                    write!(f, "{}: unsupported format '.{extension}'", path.display())
                }
            }
            IoError::Write { target, message } => write!(f, "cannot write {target}: {message}"),
        }
    }
}

impl std::error::Error for IoError {}
