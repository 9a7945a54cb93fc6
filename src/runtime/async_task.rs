//! Single-threaded task handles for the ordered pipeline.
//!
//! Rc-based design: a task resolves on the thread that owns it, and its
//! completion listeners run synchronously inside [`Completer::complete`].

use crate::pipeline::{BoxError, CompletionListener, PipelineResult, Task};
use log::warn;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

struct Inner<T> {
    done: Cell<bool>,
    output: RefCell<Option<T>>,
    listeners: RefCell<Vec<CompletionListener>>,
}

// ============================================================================
// AsyncTask - Shared handle to a single result
// ============================================================================

/// A handle to an asynchronous operation that produces a single result.
///
/// Cloning is cheap (Rc clone); every clone observes the same completion.
pub struct AsyncTask<T> {
    inner: Rc<Inner<T>>,
}

impl<T> AsyncTask<T> {
    /// Create an unresolved task together with the completer that resolves it.
    #[must_use]
    pub fn pending() -> (Self, Completer<T>) {
        let inner = Rc::new(Inner {
            done: Cell::new(false),
            output: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        });
        let completer = Completer {
            inner: Rc::clone(&inner),
        };
        (Self { inner }, completer)
    }

    /// Create a task that has already resolved to `value`.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                done: Cell::new(true),
                output: RefCell::new(Some(value)),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Whether the task has resolved.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.done.get()
    }

    /// Take the result out of a resolved task.
    ///
    /// Returns `None` while the task is pending or once the result has been
    /// taken through any clone.
    pub fn take_output(&self) -> Option<T> {
        self.inner.output.borrow_mut().take()
    }
}

impl<T: 'static> AsyncTask<T> {
    /// Spawn `future` on the current tokio `LocalSet`.
    ///
    /// The task resolves with the future's output. Listener errors raised at
    /// that point have no caller to return to and are logged.
    pub fn spawn_local<F>(future: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        let (task, completer) = Self::pending();
        tokio::task::spawn_local(async move {
            let value = future.await;
            if let Err(e) = completer.complete(value) {
                warn!("Completion listener failed: {e}");
            }
        });
        task
    }
}

impl<T> Task for AsyncTask<T> {
    fn is_done(&self) -> Result<bool, BoxError> {
        Ok(self.inner.done.get())
    }

    fn on_complete(&self, listener: CompletionListener) -> Result<(), BoxError> {
        if !self.inner.done.get() {
            self.inner.listeners.borrow_mut().push(listener);
            return Ok(());
        }

        // Already resolved: raise the event now. A failing drain leaves the
        // task at the head of its pipeline for the next event to retry.
        if let Err(e) = listener.notify() {
            warn!("Completion listener failed: {e}");
        }
        Ok(())
    }
}

impl<T> Clone for AsyncTask<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for AsyncTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTask")
            .field("done", &self.inner.done.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

// ============================================================================
// Completer - Resolving side of a pending AsyncTask
// ============================================================================

/// Resolves the [`AsyncTask`] it was created with.
///
/// Dropping a completer without calling [`complete`](Self::complete) leaves
/// the task pending forever.
pub struct Completer<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Completer<T> {
    /// Resolve the task with `value` and notify its listeners in registration
    /// order.
    ///
    /// Every listener runs even if an earlier one fails; the first failure is
    /// returned and later ones are logged.
    pub fn complete(self, value: T) -> PipelineResult<()> {
        *self.inner.output.borrow_mut() = Some(value);
        self.inner.done.set(true);

        let listeners = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        let mut first_error = None;
        for listener in listeners {
            if let Err(e) = listener.notify() {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!("Completion listener failed: {e}");
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").finish_non_exhaustive()
    }
}
