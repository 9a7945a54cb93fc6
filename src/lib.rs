//! `kodegen_pipeline` - Ordered delivery of concurrently resolving tasks
//!
//! This library provides a bounded, single-threaded pipeline that accepts
//! async tasks in submission order, lets them resolve in any order, and
//! delivers each one to a consumer callback strictly in the order it was
//! admitted.

// Module declarations
pub mod pipeline;
pub mod runtime;

// Re-export pipeline types
pub use pipeline::{
    BoxError, CAPACITY, CompletionListener, Pipeline, PipelineBuilder, PipelineError,
    PipelineHandle, PipelineResult, Task,
};

// Re-export runtime types
pub use runtime::{AsyncStream, AsyncTask, Completer, StreamError, ordered, ordered_with};
