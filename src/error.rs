use std::fmt;

use thiserror::Error;

/// Engine errors using thiserror for structured error handling.
///
/// Every failure is returned synchronously to the caller; the boundary layer
/// turns these into a `(kind, message)` reply.

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("A reference does not exist for the specified audio id: {0}")]
    NotFound(String),

    #[error("A reference already exists for the specified audio id: {0}")]
    DuplicateId(String),

    #[error("Failed to decode audio: {path}")]
    Decode {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Audio backend failure: {0}")]
    Backend(String),
}

/// Category of an [`EngineError`], stable across messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    DuplicateId,
    DecodeError,
    InvalidArgument,
    Backend,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::DuplicateId => "DuplicateId",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::Backend => "Backend",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::DuplicateId(_) => ErrorKind::DuplicateId,
            EngineError::Decode { .. } => ErrorKind::DecodeError,
            EngineError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            EngineError::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Wrap any decoder failure for the given source
    pub(crate) fn decode<E>(path: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        EngineError::Decode {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = EngineError::NotFound("shot".to_string());
        assert_eq!(
            err.to_string(),
            "A reference does not exist for the specified audio id: shot"
        );

        let err = EngineError::InvalidArgument("missing id".to_string());
        assert_eq!(err.to_string(), "Invalid argument: missing id");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            EngineError::DuplicateId("a".into()).kind(),
            ErrorKind::DuplicateId
        );
        assert_eq!(EngineError::Backend("x".into()).kind().as_str(), "Backend");
        assert_eq!(ErrorKind::DecodeError.to_string(), "DecodeError");
    }

    #[test]
    fn test_error_source_chain() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = EngineError::decode("/sounds/missing.wav", io_err);

        assert!(err.source().is_some());
        assert_eq!(err.kind(), ErrorKind::DecodeError);
        assert_eq!(err.to_string(), "Failed to decode audio: /sounds/missing.wav");
    }
}
