//! Scheduler error types.

use thiserror::Error;

use crate::types::Task;

/// Errors returned by [`Scheduler`](crate::Scheduler) implementations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The target process has no matching backend resource.
    #[error("{0} process not found")]
    ProcessNotFound(String),

    #[error("duplicate process name: {0}")]
    DuplicateProcess(String),

    /// The backend does not support the requested operation.
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// Listing tasks failed part-way. `collected` holds the tasks gathered
    /// from services visited before the failure and is never empty.
    #[error("{source}")]
    PartialTasks {
        collected: Vec<Task>,
        source: Box<SchedulerError>,
    },

    /// Any error from the backend, passed through as-is.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl SchedulerError {
    /// Wrap a backend error without altering its message.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SchedulerError::Backend(Box::new(err))
    }

    /// The underlying cause, looking through `PartialTasks`.
    pub fn root(&self) -> &SchedulerError {
        match self {
            SchedulerError::PartialTasks { source, .. } => source.root(),
            other => other,
        }
    }

    /// Tasks collected before a failure, if any.
    pub fn partial_tasks(&self) -> &[Task] {
        match self {
            SchedulerError::PartialTasks { collected, .. } => collected,
            _ => &[],
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
