#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::engine::Server;
use crate::error::TaskError;
use crate::shred::event::{Event, EventInner};
use crate::Tick;

/// Value handed to a task when an event wakes it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// How a task gives control back to the scheduler.
#[derive(Debug, Clone)]
pub enum Suspension {
    /// Run again at the current tick, after the tasks already due.
    Immediate,
    /// Run again this many ticks from now. `Timed(0)` is `Immediate`.
    Timed(Tick),
    /// Park on the event until it is signalled or broadcast.
    Await(Event),
    /// The task is done; its body is dropped.
    Terminated,
}

/// A cooperatively scheduled routine ("shred").
///
/// The scheduler calls `resume` every time the task becomes due. `wake` is
/// `None` on the first run and after timed waits, and carries the event's
/// value after an `Await`. Returning `Err` terminates the task without
/// disturbing anything else on the clock.
pub trait Task: 'static {
    fn resume(&mut self, server: &Server, wake: Option<Value>) -> Result<Suspension, TaskError>;

    /// Called once if the task is cancelled before it terminates on its own.
    fn cancel(&mut self) {}
}

impl Task for Box<dyn Task> {
    fn resume(&mut self, server: &Server, wake: Option<Value>) -> Result<Suspension, TaskError> {
        (**self).resume(server, wake)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}

/// Task built from a closure, see [`from_fn`].
pub struct FnTask<F>(F);

/// Turn a closure into a task.
///
/// The closure is the body of a state machine: captured variables are its
/// state, and each call runs one step.
///
/// ```
/// use tickshred::shred::{task, Suspension};
///
/// let mut beats = 0;
/// let metronome = task::from_fn(move |_server, _wake| {
///     beats += 1;
///     Ok(if beats < 4 { Suspension::Timed(100) } else { Suspension::Terminated })
/// });
/// # let _ = metronome;
/// ```
pub fn from_fn<F>(f: F) -> FnTask<F>
where
    F: FnMut(&Server, Option<Value>) -> Result<Suspension, TaskError> + 'static,
{
    FnTask(f)
}

impl<F> Task for FnTask<F>
where
    F: FnMut(&Server, Option<Value>) -> Result<Suspension, TaskError> + 'static,
{
    fn resume(&mut self, server: &Server, wake: Option<Value>) -> Result<Suspension, TaskError> {
        (self.0)(server, wake)
    }
}

/// Server-unique task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shred#{}", self.0)
    }
}

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// In the scheduler queue, due at or before the current tick.
    Runnable,
    /// Being resumed right now.
    Running,
    /// In the scheduler queue, due at a later tick.
    Sleeping,
    /// Parked on an event's wait list.
    Waiting,
    /// Finished, faulted or cancelled. Never resumed again.
    Terminated,
}

pub(crate) struct TaskCell {
    id: TaskId,
    state: Cell<TaskState>,
    wake_tick: Cell<Tick>,
    body: RefCell<Option<Box<dyn Task>>>,
    waiting_on: RefCell<Weak<EventInner>>,
}

/// Shared handle to a sporked task.
#[derive(Clone)]
pub struct TaskHandle(Rc<TaskCell>);

pub(crate) struct WeakTask(Weak<TaskCell>);

impl WeakTask {
    pub(crate) fn upgrade(&self) -> Option<TaskHandle> {
        self.0.upgrade().map(TaskHandle)
    }
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, body: Box<dyn Task>, wake_tick: Tick) -> Self {
        TaskHandle(Rc::new(TaskCell {
            id,
            state: Cell::new(TaskState::Runnable),
            wake_tick: Cell::new(wake_tick),
            body: RefCell::new(Some(body)),
            waiting_on: RefCell::new(Weak::new()),
        }))
    }

    pub fn id(&self) -> TaskId {
        self.0.id
    }

    pub fn state(&self) -> TaskState {
        self.0.state.get()
    }

    /// Tick the task was last scheduled for.
    pub fn wake_tick(&self) -> Tick {
        self.0.wake_tick.get()
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == TaskState::Terminated
    }

    pub fn ptr_eq(&self, other: &TaskHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Terminate the task wherever it is queued.
    ///
    /// An event wait list drops it immediately; the scheduler discards its
    /// entry when it comes up. The body's `cancel` hook runs and the body is
    /// dropped. Returns `false` if the task had already terminated.
    pub fn cancel(&self) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.0.state.set(TaskState::Terminated);

        let event = self.0.waiting_on.replace(Weak::new());
        if let Some(event) = event.upgrade() {
            event.remove(self.id());
        }

        // A running task holds its own body; the server finishes the
        // cancellation once the current resume returns.
        let body = self
            .0
            .body
            .try_borrow_mut()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(mut body) = body {
            body.cancel();
        }

        debug!(task = %self.id(), "cancelled");
        true
    }

    pub(crate) fn downgrade(&self) -> WeakTask {
        WeakTask(Rc::downgrade(&self.0))
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.0.state.set(state);
    }

    pub(crate) fn set_wake_tick(&self, tick: Tick) {
        self.0.wake_tick.set(tick);
    }

    pub(crate) fn park_on(&self, event: Weak<EventInner>) {
        self.0.state.set(TaskState::Waiting);
        *self.0.waiting_on.borrow_mut() = event;
    }

    pub(crate) fn unpark(&self) {
        *self.0.waiting_on.borrow_mut() = Weak::new();
    }

    /// Run the body once. `None` if there is no body to run.
    pub(crate) fn resume_body(
        &self,
        server: &Server,
        wake: Option<Value>,
    ) -> Option<Result<Suspension, TaskError>> {
        let mut slot = self.0.body.try_borrow_mut().ok()?;
        let body = slot.as_mut()?;
        Some(body.resume(server, wake))
    }

    /// Drop the body, running its cancel hook first when `cancelled`.
    pub(crate) fn release(&self, cancelled: bool) {
        self.0.state.set(TaskState::Terminated);
        let body = self
            .0
            .body
            .try_borrow_mut()
            .ok()
            .and_then(|mut slot| slot.take());
        if let (Some(mut body), true) = (body, cancelled) {
            body.cancel();
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("wake_tick", &self.wake_tick())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Dropping {
        cancelled: Rc<Cell<bool>>,
    }

    impl Task for Dropping {
        fn resume(&mut self, _: &Server, _: Option<Value>) -> Result<Suspension, TaskError> {
            Ok(Suspension::Immediate)
        }

        fn cancel(&mut self) {
            self.cancelled.set(true);
        }
    }

    #[test]
    fn cancel_runs_hook_once() {
        let flag = Rc::new(Cell::new(false));
        let handle = TaskHandle::new(
            TaskId(0),
            Box::new(Dropping {
                cancelled: Rc::clone(&flag),
            }),
            0,
        );

        assert!(handle.cancel());
        assert!(flag.get());
        assert!(handle.is_terminated());

        flag.set(false);
        assert!(!handle.cancel());
        assert!(!flag.get());
    }

    #[test]
    fn release_without_cancel_skips_hook() {
        let flag = Rc::new(Cell::new(false));
        let handle = TaskHandle::new(
            TaskId(1),
            Box::new(Dropping {
                cancelled: Rc::clone(&flag),
            }),
            0,
        );
        handle.release(false);
        assert!(!flag.get());
        assert!(handle.is_terminated());
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from(()), Value::Unit);
        assert_eq!(Value::from("go").as_str(), Some("go"));
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::Bool(true).as_int(), None);
    }
}
