//! Ordered stream of task outputs.
//!
//! Channel-based design: the pipeline's ready callback feeds an unbounded
//! channel, so consumers read outputs as a `Stream` in admission order.

use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::runtime::async_task::AsyncTask;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;

/// Delivery failures of the ordered stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// The receiving `AsyncStream` has been dropped
    #[error("Ordered stream receiver dropped")]
    ReceiverDropped,

    /// The task's output was taken before the pipeline delivered it
    #[error("Task output already taken")]
    OutputTaken,
}

// ============================================================================
// AsyncStream - Multi-result streaming operation
// ============================================================================

/// A handle to an asynchronous stream that produces multiple results.
///
/// Uses unbounded mpsc channel; the pipeline's capacity bounds how far
/// producers can run ahead of delivery.
pub struct AsyncStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> AsyncStream<T> {
    /// Create from unbounded receiver.
    #[inline]
    #[must_use]
    pub fn new(rx: mpsc::UnboundedReceiver<T>) -> Self {
        Self { rx }
    }
}

impl<T> Stream for AsyncStream<T> {
    type Item = T;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Create a pipeline whose delivered outputs are yielded by the returned
/// stream, in admission order.
///
/// The stream ends once the pipeline is dropped and every delivered output
/// has been read.
#[must_use]
pub fn ordered<T: 'static>() -> (Pipeline<AsyncTask<T>>, AsyncStream<T>) {
    ordered_with(PipelineBuilder::new())
}

/// [`ordered`] with a configured builder.
#[must_use]
pub fn ordered_with<T: 'static>(
    builder: PipelineBuilder,
) -> (Pipeline<AsyncTask<T>>, AsyncStream<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pipeline = builder.build(move |task: &AsyncTask<T>| {
        // Checked before taking so a failed delivery keeps the output.
        if tx.is_closed() {
            return Err(StreamError::ReceiverDropped.into());
        }
        let value = task.take_output().ok_or(StreamError::OutputTaken)?;
        tx.send(value).map_err(|_| StreamError::ReceiverDropped)?;
        Ok(())
    });
    (pipeline, AsyncStream::new(rx))
}
