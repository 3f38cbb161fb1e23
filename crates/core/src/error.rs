use thiserror::Error;

#[derive(Error, Debug)]
pub enum VeilNetError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout")]
    Timeout,

    #[error("No relays available")]
    NoRelaysAvailable,

    #[error("Shutdown")]
    Shutdown,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<serde_json::Error> for VeilNetError {
    fn from(err: serde_json::Error) -> Self {
        VeilNetError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VeilNetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = VeilNetError::Validation("bad node_id".to_string());
        assert_eq!(err.to_string(), "Validation error: bad node_id");
    }

    #[test]
    fn test_error_display_timeout() {
        assert_eq!(VeilNetError::Timeout.to_string(), "Timeout");
    }

    #[test]
    fn test_error_display_no_relays() {
        assert_eq!(
            VeilNetError::NoRelaysAvailable.to_string(),
            "No relays available"
        );
    }

    #[test]
    fn test_json_error_converts_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let converted: VeilNetError = err.into();
        assert!(matches!(converted, VeilNetError::Serialization(_)));
    }
}
