//! Runtime module
//!
//! Provides task handles and streaming primitives built on the pipeline.

pub mod async_stream;
pub mod async_task;

// Re-export runtime types
pub use async_stream::{AsyncStream, StreamError, ordered, ordered_with};
pub use async_task::{AsyncTask, Completer};
