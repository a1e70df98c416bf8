//! Error types shared across dyno crates.

use thiserror::Error;

/// A native value could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("invalid number literal '{text}'")]
    InvalidNumber { text: String },

    #[error("number exponent out of range in '{text}'")]
    ExponentOutOfRange { text: String },

    #[error("non-finite float cannot be stored as a number")]
    NonFinite,
}

/// A call to a remote collaborator (store or model endpoint) failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteCallError {
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("{operation} failed: {code}: {message}")]
    Service {
        operation: String,
        code: String,
        message: String,
    },
}

impl RemoteCallError {
    pub fn service(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Service { code, .. } => matches!(
                code.as_str(),
                "ThrottlingException"
                    | "ProvisionedThroughputExceededException"
                    | "RequestLimitExceeded"
                    | "InternalServerError"
                    | "ServiceUnavailable"
            ),
        }
    }

    pub fn operation(&self) -> &str {
        match self {
            Self::Timeout { operation, .. } | Self::Service { operation, .. } => operation,
        }
    }
}

/// Configuration could not be loaded, parsed, or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("config io error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("config parse error: {message}")]
    Parse { message: String },

    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        let err = RemoteCallError::Timeout {
            operation: "scan".into(),
            after_ms: 10_000,
        };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "scan timed out after 10000ms");
    }

    #[test]
    fn test_service_retryable_only_for_throttling_codes() {
        let throttled = RemoteCallError::service("put_item", "ThrottlingException", "slow down");
        let denied = RemoteCallError::service("put_item", "AccessDeniedException", "nope");
        assert!(throttled.is_retryable());
        assert!(!denied.is_retryable());
        assert_eq!(denied.operation(), "put_item");
    }
}
