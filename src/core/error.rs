use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;

impl From<crate::backend::error::BackendError> for ChatError {
    fn from(err: crate::backend::error::BackendError) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChatError::InvalidRequest("no model selected".to_string());
        assert_eq!(err.to_string(), "Invalid request: no model selected");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ChatError = io_err.into();
        assert!(matches!(err, ChatError::Io(_)));
    }

    #[test]
    fn test_error_from_backend() {
        let backend = crate::backend::error::BackendError::Connection("refused".to_string());
        let err: ChatError = backend.into();
        assert!(matches!(err, ChatError::Transport(_)));
    }
}
