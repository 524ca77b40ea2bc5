use thiserror::Error;

/// Top-level error type for zapcast.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The WhatsApp session is not authenticated/connected.
    #[error("session error: {0}")]
    Session(String),

    /// A phone number could not be resolved to a WhatsApp destination.
    #[error("number not found: {0}")]
    NumberNotFound(String),

    /// A message or media send failed.
    #[error("send error: {0}")]
    Send(String),

    /// Media payload could not be decoded.
    #[error("media error: {0}")]
    Media(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = BridgeError::from(io_err);
        let display = format!("{err}");
        assert!(
            display.contains("io error"),
            "expected 'io error' in display, got: {display}"
        );
        assert!(
            display.contains("file missing"),
            "expected 'file missing' in display, got: {display}"
        );
    }

    #[test]
    fn test_session_error_display() {
        let err = BridgeError::Session("qr pending".into());
        assert_eq!(format!("{err}"), "session error: qr pending");
    }

    #[test]
    fn test_number_not_found_display() {
        let err = BridgeError::NumberNotFound("5511".into());
        assert_eq!(format!("{err}"), "number not found: 5511");
    }
}
