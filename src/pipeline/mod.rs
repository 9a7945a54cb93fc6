//! Ordered completion pipeline
//!
//! Tracks up to [`CAPACITY`] concurrently resolving tasks and hands them to a
//! consumer callback strictly in admission order, however they finish.
//!
//! Every completion event re-scans from the head of the queue and delivers
//! the longest run of finished tasks. A pending task at the head holds back
//! everything admitted after it.
//!
//! # Examples
//!
//! ```rust
//! use kodegen_pipeline::{AsyncTask, Pipeline};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let delivered = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&delivered);
//! let pipeline = Pipeline::new(move |task: &AsyncTask<&'static str>| {
//!     sink.borrow_mut().extend(task.take_output());
//!     Ok(())
//! });
//!
//! let (first, first_done) = AsyncTask::pending();
//! let (second, second_done) = AsyncTask::pending();
//! pipeline.admit(first)?;
//! pipeline.admit(second)?;
//!
//! second_done.complete("second")?;
//! assert!(delivered.borrow().is_empty());
//!
//! first_done.complete("first")?;
//! assert_eq!(*delivered.borrow(), ["first", "second"]);
//! assert!(pipeline.is_empty());
//! # Ok::<(), kodegen_pipeline::PipelineError>(())
//! ```

pub mod error;
mod ring;
pub mod task;

pub use error::{PipelineError, PipelineResult};
pub use ring::CAPACITY;
pub use task::{BoxError, CompletionListener, Task};

use log::{debug, trace};
use ring::Ring;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use task::Drain;

type ReadyFn<T> = Box<dyn FnMut(&T) -> Result<(), BoxError>>;

/// Queue of outstanding tasks that delivers them in admission order.
///
/// Single-threaded: completion events, admissions and the ready callback are
/// expected to run on one thread, one at a time.
pub struct Pipeline<T: Task + 'static> {
    shared: Rc<Shared<T>>,
}

impl<T: Task + 'static> Pipeline<T> {
    /// Create a pipeline that hands each finished task to `ready`.
    pub fn new<F>(ready: F) -> Self
    where
        F: FnMut(&T) -> Result<(), BoxError> + 'static,
    {
        PipelineBuilder::new().build(ready)
    }

    /// Create a pipeline whose ready callback can reach the pipeline itself.
    ///
    /// `make_ready` receives a weak [`PipelineHandle`], so a callback that
    /// admits follow-up work does not keep the pipeline alive.
    pub fn new_cyclic<F, M>(make_ready: M) -> Self
    where
        F: FnMut(&T) -> Result<(), BoxError> + 'static,
        M: FnOnce(PipelineHandle<T>) -> F,
    {
        PipelineBuilder::new().build_cyclic(make_ready)
    }

    /// Admit `task` at the tail of the queue and attach the completion
    /// listener to it.
    ///
    /// Fails with [`PipelineError::Capacity`] when [`CAPACITY`] tasks are
    /// outstanding, and with [`PipelineError::ListenerRegistration`] when the
    /// task refuses the listener. The queue is unchanged on either error.
    ///
    /// Each task should be outstanding in at most one admission at a time.
    pub fn admit(&self, task: T) -> PipelineResult<()> {
        self.shared.admit(task)
    }

    /// Run a completion event: deliver every finished task from the head,
    /// stopping at the first one still pending.
    ///
    /// Returns how many tasks were delivered. On error the failing task stays
    /// at the head and is retried on the next event.
    pub fn drain(&self) -> PipelineResult<usize> {
        self.shared.drain()
    }

    /// Whether no admitted task is waiting for delivery.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.ring.borrow().is_empty()
    }

    /// Number of admitted tasks not yet delivered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.ring.borrow().len()
    }

    /// Whether the next admission would be rejected.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.shared.ring.borrow().is_full()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// Position of the oldest undelivered task.
    #[must_use]
    pub fn head(&self) -> usize {
        self.shared.ring.borrow().head()
    }

    /// Position the next admitted task will take.
    #[must_use]
    pub fn tail(&self) -> usize {
        self.shared.ring.borrow().tail()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// A listener raising completion events on this pipeline.
    #[must_use]
    pub fn listener(&self) -> CompletionListener {
        self.shared.listener()
    }

    /// A weak handle to this pipeline.
    #[must_use]
    pub fn handle(&self) -> PipelineHandle<T> {
        PipelineHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }
}

impl<T: Task + 'static> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ring = self.shared.ring.borrow();
        f.debug_struct("Pipeline")
            .field("name", &self.shared.name)
            .field("head", &ring.head())
            .field("tail", &ring.tail())
            .finish()
    }
}

/// Builder for [`Pipeline`]
#[derive(Clone, Debug)]
pub struct PipelineBuilder {
    name: String,
}

impl PipelineBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "pipeline".to_string(),
        }
    }

    /// Label used in log output
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Build the pipeline around a ready callback
    pub fn build<T, F>(self, ready: F) -> Pipeline<T>
    where
        T: Task + 'static,
        F: FnMut(&T) -> Result<(), BoxError> + 'static,
    {
        self.build_cyclic(|_| ready)
    }

    /// Build the pipeline around a ready callback that needs a handle back
    /// to the pipeline
    pub fn build_cyclic<T, F, M>(self, make_ready: M) -> Pipeline<T>
    where
        T: Task + 'static,
        F: FnMut(&T) -> Result<(), BoxError> + 'static,
        M: FnOnce(PipelineHandle<T>) -> F,
    {
        let shared = Rc::new_cyclic(|this: &Weak<Shared<T>>| {
            let handle = PipelineHandle {
                shared: this.clone(),
            };
            let ready: ReadyFn<T> = Box::new(make_ready(handle));
            Shared {
                name: self.name,
                this: this.clone(),
                ring: RefCell::new(Ring::new()),
                ready: RefCell::new(ready),
                draining: Cell::new(false),
                rescan: Cell::new(false),
            }
        });
        debug!("{}: created with capacity {CAPACITY}", shared.name);
        Pipeline { shared }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak handle to a [`Pipeline`].
///
/// Operations on a handle whose pipeline has been dropped fail with
/// [`PipelineError::Closed`].
pub struct PipelineHandle<T: Task + 'static> {
    shared: Weak<Shared<T>>,
}

impl<T: Task + 'static> PipelineHandle<T> {
    fn upgrade(&self) -> PipelineResult<Rc<Shared<T>>> {
        self.shared.upgrade().ok_or(PipelineError::Closed)
    }

    /// See [`Pipeline::admit`].
    pub fn admit(&self, task: T) -> PipelineResult<()> {
        self.upgrade()?.admit(task)
    }

    /// See [`Pipeline::drain`].
    pub fn drain(&self) -> PipelineResult<usize> {
        self.upgrade()?.drain()
    }

    /// `true` once the pipeline is gone.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared
            .upgrade()
            .is_none_or(|shared| shared.ring.borrow().is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .upgrade()
            .map_or(0, |shared| shared.ring.borrow().len())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.strong_count() == 0
    }
}

impl<T: Task + 'static> Clone for PipelineHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Task + 'static> fmt::Debug for PipelineHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct Shared<T> {
    name: String,
    this: Weak<Shared<T>>,
    ring: RefCell<Ring<T>>,
    ready: RefCell<ReadyFn<T>>,
    /// A drain is on the stack; nested completion events only set `rescan`.
    draining: Cell<bool>,
    rescan: Cell<bool>,
}

impl<T: Task + 'static> Shared<T> {
    fn listener(&self) -> CompletionListener {
        let target: Weak<dyn Drain> = self.this.clone();
        CompletionListener::new(target)
    }

    fn admit(&self, task: T) -> PipelineResult<()> {
        let registrar = task.clone();
        let position = self.ring.borrow_mut().push(task).map_err(|_rejected| {
            debug!("{}: rejected admission, {CAPACITY} tasks outstanding", self.name);
            PipelineError::Capacity { capacity: CAPACITY }
        })?;
        trace!("{}: admitted task at position {position}", self.name);

        // No borrow is held here: the task may notify synchronously.
        if let Err(source) = registrar.on_complete(self.listener()) {
            self.ring.borrow_mut().pop_back();
            debug!("{}: rolled back admission at position {position}", self.name);
            return Err(PipelineError::ListenerRegistration { source });
        }
        Ok(())
    }

    /// One pass over the tasks outstanding when the pass starts.
    fn scan(&self) -> PipelineResult<usize> {
        let bound = self.ring.borrow().len();
        let mut delivered = 0;

        while delivered < bound {
            let (index, task) = {
                let ring = self.ring.borrow();
                match ring.peek_head() {
                    Some(task) => (ring.head(), task.clone()),
                    None => break,
                }
            };

            match task.is_done() {
                Ok(true) => {}
                Ok(false) => {
                    debug!("{}: head task at position {index} still pending", self.name);
                    break;
                }
                Err(source) => return Err(PipelineError::CompletionQuery { index, source }),
            }

            let delivery = {
                let mut ready = self.ready.borrow_mut();
                (*ready)(&task)
            };
            if let Err(source) = delivery {
                return Err(PipelineError::Delivery { index, source });
            }

            // `ready` may have admitted more work, but never moves the head.
            let released = self.ring.borrow_mut().pop_head();
            drop(released);
            trace!("{}: delivered task at position {index}", self.name);
            delivered += 1;
        }

        Ok(delivered)
    }
}

impl<T: Task + 'static> Drain for Shared<T> {
    fn drain(&self) -> PipelineResult<usize> {
        if self.draining.replace(true) {
            self.rescan.set(true);
            debug!("{}: completion event during drain, rescanning", self.name);
            return Ok(0);
        }
        let _guard = DrainGuard(&self.draining);

        let mut delivered = 0;
        loop {
            self.rescan.set(false);
            delivered += self.scan()?;
            if !self.rescan.get() {
                break;
            }
        }
        Ok(delivered)
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let outstanding = self.ring.get_mut().len();
        if outstanding > 0 {
            debug!("{}: dropped with {outstanding} undelivered tasks", self.name);
        }
    }
}

struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
