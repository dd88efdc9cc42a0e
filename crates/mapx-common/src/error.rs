use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum MapError {
    /// A tag or region parse hit an unknown kind, an out-of-bounds length or a
    /// truncated buffer at `offset`.
    MalformedData { offset: usize, reason: String },
    CompressionError(String),
    IoError(std::io::Error),
    /// The palette has no entry at the requested index.
    MissingPaletteEntry(usize),
    InvalidDimensions { expected: String, actual: String },
}

impl MapError {
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        MapError::MalformedData {
            offset,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::MalformedData { offset, reason } => {
                write!(f, "Malformed data at offset {}: {}", offset, reason)
            }
            MapError::CompressionError(msg) => write!(f, "Compression error: {}", msg),
            MapError::IoError(err) => write!(f, "IO error: {}", err),
            MapError::MissingPaletteEntry(index) => {
                write!(f, "Palette has no entry for index {}", index)
            }
            MapError::InvalidDimensions { expected, actual } => {
                write!(f, "Invalid dimensions: expected {}, got {}", expected, actual)
            }
        }
    }
}

impl Error for MapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MapError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MapError {
    fn from(err: std::io::Error) -> Self {
        MapError::IoError(err)
    }
}
