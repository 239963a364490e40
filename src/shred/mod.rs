//! Cooperative tasks ("shreds") and the events they wait on.
//!
//! A shred is a state machine the server resumes between graph evaluations.
//! It runs until it hands back a [`Suspension`]: sleep for some ticks, wait
//! on an [`Event`], yield for the current tick, or finish. Nothing preempts
//! a shred, so everything it does between two suspensions happens at one
//! instant of the virtual clock.

/// Wait lists with signal and broadcast.
pub mod event;
/// The task trait, handles and lifecycle.
pub mod task;

pub use event::Event;
pub use task::{from_fn, Suspension, Task, TaskHandle, TaskId, TaskState, Value};
