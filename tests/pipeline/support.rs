//! Shared fixtures for pipeline tests.

use kodegen_pipeline::{BoxError, CompletionListener, Pipeline, PipelineResult, Task};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type Delivered = Rc<RefCell<Vec<u32>>>;

/// Pipeline that records `key(task)` for every delivered task.
pub fn recorder<T, K>(key: K) -> (Pipeline<T>, Delivered)
where
    T: Task + 'static,
    K: Fn(&T) -> Option<u32> + 'static,
{
    let delivered = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&delivered);
    let pipeline = Pipeline::new(move |task: &T| {
        sink.borrow_mut().extend(key(task));
        Ok(())
    });
    (pipeline, delivered)
}

/// Task whose completion, query failures and listener registration are
/// driven by the test.
///
/// Listeners stay registered after firing, so `fire` can repeat a
/// completion event.
#[derive(Clone)]
pub struct ScriptedTask {
    pub id: u32,
    state: Rc<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    done: Cell<bool>,
    fail_query: Cell<bool>,
    refuse_listeners: Cell<bool>,
    queries: Cell<usize>,
    listeners: RefCell<Vec<CompletionListener>>,
}

impl ScriptedTask {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            state: Rc::default(),
        }
    }

    pub fn resolve(&self) {
        self.state.done.set(true);
    }

    pub fn fail_query(&self, fail: bool) {
        self.state.fail_query.set(fail);
    }

    pub fn refuse_listeners(&self) {
        self.state.refuse_listeners.set(true);
    }

    pub fn queries(&self) -> usize {
        self.state.queries.get()
    }

    pub fn listeners(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    /// Raise a completion event through every registered listener.
    pub fn fire(&self) -> PipelineResult<usize> {
        let listeners = self.state.listeners.borrow().clone();
        let mut delivered = 0;
        for listener in listeners {
            delivered += listener.notify()?;
        }
        Ok(delivered)
    }

    pub fn resolve_and_fire(&self) -> PipelineResult<usize> {
        self.resolve();
        self.fire()
    }
}

impl Task for ScriptedTask {
    fn is_done(&self) -> Result<bool, BoxError> {
        self.state.queries.set(self.state.queries.get() + 1);
        if self.state.fail_query.get() {
            return Err("completion query failed".into());
        }
        Ok(self.state.done.get())
    }

    fn on_complete(&self, listener: CompletionListener) -> Result<(), BoxError> {
        if self.state.refuse_listeners.get() {
            return Err("listener refused".into());
        }
        self.state.listeners.borrow_mut().push(listener);
        Ok(())
    }
}

/// Recorder over scripted tasks, keyed by task id.
pub fn scripted_recorder() -> (Pipeline<ScriptedTask>, Delivered) {
    recorder(|task: &ScriptedTask| Some(task.id))
}
