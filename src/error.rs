use thiserror::Error;

/// Result type alias for disk operations
pub type Result<T> = std::result::Result<T, DiskError>;

/// Host-side errors raised while opening, parsing or saving disk images
///
/// Errors seen by the emulated machine never use this type; those are
/// reported through the controller status register instead.
#[derive(Debug, Error)]
pub enum DiskError {
    /// I/O error occurred while reading or writing the backing stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream looked like a known format but its contents are invalid
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// No disk format recognised the stream
    #[error("Unrecognised disk image: {0}")]
    UnrecognisedFormat(String),

    /// Parse error at specific offset
    #[error("Parse error at offset {offset}: {message}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Error message
        message: String,
    },

    /// Operation not supported by this format
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Stream or image is read-only
    #[error("Image is read-only: {0}")]
    ReadOnly(String),
}

impl DiskError {
    /// Create a parse error with context
    pub fn parse<S: Into<String>>(offset: usize, message: S) -> Self {
        DiskError::ParseError {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        DiskError::InvalidFormat(message.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        DiskError::Unsupported(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiskError::UnrecognisedFormat("game.xyz".into());
        assert_eq!(err.to_string(), "Unrecognised disk image: game.xyz");
    }

    #[test]
    fn test_parse_error() {
        let err = DiskError::parse(256, "Invalid track marker");
        assert_eq!(
            err.to_string(),
            "Parse error at offset 256: Invalid track marker"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DiskError = io.into();
        assert!(matches!(err, DiskError::Io(_)));
    }
}
