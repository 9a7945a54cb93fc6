//! Pipeline error types

use crate::pipeline::task::BoxError;
use thiserror::Error;

/// Error types for pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Admission rejected because every slot holds an outstanding task
    #[error("Pipeline is full: {capacity} tasks outstanding")]
    Capacity { capacity: usize },

    /// The task at `index` failed to report whether it is done
    #[error("Completion query failed for task at slot {index}: {source}")]
    CompletionQuery {
        index: usize,
        #[source]
        source: BoxError,
    },

    /// The ready callback rejected the task at `index`
    #[error("Delivery failed for task at slot {index}: {source}")]
    Delivery {
        index: usize,
        #[source]
        source: BoxError,
    },

    /// Attaching the completion listener to an admitted task failed
    #[error("Listener registration failed: {source}")]
    ListenerRegistration {
        #[source]
        source: BoxError,
    },

    /// The pipeline behind a handle has been dropped
    #[error("Pipeline closed")]
    Closed,
}

/// Convenience result alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Whether this error leaves the failing task at the head to be retried
    /// on the next completion event.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::CompletionQuery { .. } | PipelineError::Delivery { .. }
        )
    }
}
