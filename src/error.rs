// Error types for configuration and collaborator calls
//
// The validation engine itself never fails: collaborator errors are
// absorbed into invalid / not-findable results by the call guard.

use thiserror::Error;

/// Failure of a single external collaborator call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    /// The call did not finish within the configured timeout
    #[error("{source_name} timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    /// The collaborator answered with an error
    #[error("{source_name} failed: {message}")]
    Failed { source_name: String, message: String },

    /// The collaborator is not reachable or not configured
    #[error("{source_name} unavailable: {message}")]
    Unavailable { source_name: String, message: String },
}

impl CollaboratorError {
    pub fn failed(source_name: &str, message: impl Into<String>) -> Self {
        CollaboratorError::Failed {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn unavailable(source_name: &str, message: impl Into<String>) -> Self {
        CollaboratorError::Unavailable {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    /// Timeouts and failures may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CollaboratorError::Unavailable { .. })
    }
}

/// Rejected validator configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("weight for layer {layer} must be a finite value in [0, 1], got {value}")]
    InvalidWeight { layer: u8, value: f64 },

    #[error("layer weights sum to {0}, which exceeds 1.0")]
    WeightsExceedOne(f64),

    #[error("authoritative source list is empty")]
    EmptyAllowList,

    #[error("collaborator timeout must be greater than zero")]
    ZeroTimeout,

    #[error("max_retries is {value}, the limit is {max}")]
    TooManyRetries { value: u32, max: u32 },

    #[error("batch concurrency must be greater than zero")]
    ZeroConcurrency,
}
