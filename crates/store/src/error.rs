use std::fmt;

use lahimena_io::IoError;

#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing the backing workbook failed.
    Workbook(IoError),
    /// Filesystem error outside the workbook codec.
    Io(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workbook(e) => write!(f, "{e}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Workbook(e) => Some(e),
            Self::Io(_) => None,
        }
    }
}

impl From<IoError> for StoreError {
    fn from(e: IoError) -> Self {
        Self::Workbook(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Exchange-rate lookup failures. Callers fall back to configured rates.
#[derive(Debug)]
pub enum RateError {
    /// Request could not be sent or timed out.
    Network(String),
    /// Endpoint answered with a non-success status.
    Http(u16),
    /// Body was not the expected JSON or lacked a usable rate.
    Parse(String),
}

impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "rate request failed: {msg}"),
            Self::Http(status) => write!(f, "rate endpoint returned HTTP {status}"),
            Self::Parse(msg) => write!(f, "invalid rate response: {msg}"),
        }
    }
}

impl std::error::Error for RateError {}
