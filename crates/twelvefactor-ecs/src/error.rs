//! ECS backend error types.

use thiserror::Error;
use twelvefactor_core::SchedulerError;

/// Errors from the ECS API boundary.
#[derive(Debug, Error)]
pub enum EcsError {
    /// An API call was rejected or failed in transport.
    #[error("{operation}: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("invalid arn: {0}")]
    InvalidArn(String),
}

impl EcsError {
    pub fn api(operation: &'static str, message: impl Into<String>) -> Self {
        EcsError::Api {
            operation,
            message: message.into(),
        }
    }
}

impl From<EcsError> for SchedulerError {
    fn from(err: EcsError) -> Self {
        SchedulerError::backend(err)
    }
}

pub type EcsResult<T> = Result<T, EcsError>;
