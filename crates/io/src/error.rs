use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum IoError {
    /// Workbook file could not be opened or is not a spreadsheet.
    Open { path: String, message: String },
    /// A sheet inside an opened workbook could not be read.
    Read { sheet: String, message: String },
    /// Serializing or writing the workbook failed.
    Write { path: String, message: String },
    /// Filesystem error outside the workbook codec.
    Io(String),
}

impl IoError {
    pub(crate) fn open(path: &Path, message: impl ToString) -> Self {
        Self::Open { path: path.display().to_string(), message: message.to_string() }
    }

    pub(crate) fn write(path: &Path, message: impl ToString) -> Self {
        Self::Write { path: path.display().to_string(), message: message.to_string() }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, message } => write!(f, "cannot open workbook '{path}': {message}"),
            Self::Read { sheet, message } => write!(f, "cannot read sheet '{sheet}': {message}"),
            Self::Write { path, message } => write!(f, "cannot write workbook '{path}': {message}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
