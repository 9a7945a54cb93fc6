//! Task capability interface consumed by the pipeline.

use crate::pipeline::error::PipelineResult;
use std::fmt;
use std::rc::Weak;

/// Boxed error returned by task and consumer callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An in-flight unit of asynchronous work tracked by a [`Pipeline`].
///
/// Implementors are cheap shared handles: the pipeline keeps one clone in its
/// queue and registers its listener through another.
///
/// [`Pipeline`]: crate::Pipeline
pub trait Task: Clone {
    /// Whether the task has resolved.
    ///
    /// Must be monotonic: once this returns `Ok(true)` it never returns
    /// `Ok(false)` again for the same task.
    fn is_done(&self) -> Result<bool, BoxError>;

    /// Register a listener to be notified when the task resolves.
    ///
    /// Either registers the listener and returns `Ok`, or returns `Err`
    /// without ever calling it. A task that is already done may notify the
    /// listener before returning.
    fn on_complete(&self, listener: CompletionListener) -> Result<(), BoxError>;
}

/// Runs the in-order drain of a pipeline.
pub(crate) trait Drain {
    fn drain(&self) -> PipelineResult<usize>;
}

/// Token a task uses to raise a completion event on the pipeline that
/// admitted it.
///
/// Holds only a weak reference: a listener stored inside a task never keeps
/// the pipeline alive.
#[derive(Clone)]
pub struct CompletionListener {
    target: Weak<dyn Drain>,
}

impl CompletionListener {
    pub(crate) fn new(target: Weak<dyn Drain>) -> Self {
        Self { target }
    }

    /// Raise a completion event.
    ///
    /// Returns the number of tasks delivered by this event. Notifying a
    /// listener whose pipeline has been dropped does nothing.
    pub fn notify(&self) -> PipelineResult<usize> {
        match self.target.upgrade() {
            Some(pipeline) => pipeline.drain(),
            None => Ok(0),
        }
    }

    /// Whether the pipeline behind this listener still exists.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl fmt::Debug for CompletionListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionListener")
            .field("attached", &self.is_attached())
            .finish()
    }
}
