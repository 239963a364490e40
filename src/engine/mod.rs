//! The clock and everything it drives.
//!
//! [`Server`] owns the virtual clock, the I/O node and the shred scheduler.
//! One call to [`Server::tick`] is one sample frame:
//!
//! ```text
//! apply queued remote commands
//! resume every shred due at `now`
//! pull the graph from the I/O node
//! now += 1
//! ```
//!
//! Shreds therefore always run before the samples of their tick are
//! computed, and a parameter they set is heard in the same frame.

/// Cross-thread command queue.
#[cfg(feature = "rtrb")]
pub mod command;
/// Server configuration.
pub mod config;
/// Time-ordered run queue.
pub mod scheduler;

pub use config::ServerConfig;
pub use scheduler::Scheduler;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error, info, warn};

#[cfg(feature = "rtrb")]
use self::command::{Inbox, Remote};
use crate::dsp::Waveform;
use crate::error::{ConfigError, GraphError};
use crate::graph::{self, Node, NodeRef, OscNode, Route};
use crate::io::{AudioInput, AudioOutput};
use crate::shred::task::{TaskId, WeakTask};
use crate::shred::{Event, Suspension, Task, TaskHandle, TaskState, Value};
use crate::{time, Tick};

/// Running counters, see [`Server::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Ticks completed.
    pub ticks: u64,
    /// Task resumptions, including those triggered by events.
    pub resumes: u64,
    /// Tasks terminated by an error.
    pub faults: u64,
    /// Ticks on which the drain limit was hit.
    pub deferred: u64,
    /// Tasks sporked.
    pub sporked: u64,
}

/// Sample-accurate clock, signal graph root and shred scheduler.
///
/// A server is single-threaded. Other threads reach it through a
/// [`command::Remote`], whose commands run at the start of the next tick.
pub struct Server {
    config: ServerConfig,
    now: Cell<Tick>,
    io: NodeRef,
    scheduler: RefCell<Scheduler>,
    registry: RefCell<BTreeMap<TaskId, WeakTask>>,
    next_task_id: Cell<u64>,
    #[cfg(feature = "rtrb")]
    inbox: RefCell<Option<Inbox>>,
    stats: Cell<ServerStats>,
    /// One frame of each direction for `process_block`.
    scratch_in: RefCell<Box<[f32]>>,
    scratch_out: RefCell<Box<[f32]>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            sample_rate = config.sample_rate,
            inputs = config.input_channels,
            outputs = config.output_channels,
            "server started"
        );
        Ok(Self {
            io: Node::new(config.output_channels, config.input_channels),
            now: Cell::new(0),
            scheduler: RefCell::new(Scheduler::new()),
            registry: RefCell::new(BTreeMap::new()),
            next_task_id: Cell::new(0),
            #[cfg(feature = "rtrb")]
            inbox: RefCell::new(None),
            stats: Cell::new(ServerStats::default()),
            scratch_in: RefCell::new(vec![0.0; config.input_channels].into_boxed_slice()),
            scratch_out: RefCell::new(vec![0.0; config.output_channels].into_boxed_slice()),
            config,
        })
    }

    /// A server with a command queue of `config.command_capacity` already
    /// attached, and the sending half for other threads.
    #[cfg(feature = "rtrb")]
    pub fn with_remote(config: ServerConfig) -> Result<(Self, Remote), ConfigError> {
        let (remote, inbox) = command::channel(config.command_capacity);
        let server = Self::new(config)?;
        server.attach(inbox);
        Ok((server, remote))
    }

    /// Take commands from `inbox` from now on, replacing any earlier one.
    #[cfg(feature = "rtrb")]
    pub fn attach(&self, inbox: Inbox) {
        *self.inbox.borrow_mut() = Some(inbox);
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The tick about to be processed.
    pub fn now(&self) -> Tick {
        self.now.get()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn stats(&self) -> ServerStats {
        self.stats.get()
    }

    fn record(&self, f: impl FnOnce(&mut ServerStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    // Clock

    /// Advance the clock by one frame.
    pub fn tick(&self) {
        let now = self.now.get();

        #[cfg(feature = "rtrb")]
        self.apply_commands();

        self.drain(now);
        graph::render(&self.io, now);

        self.now.set(now + 1);
        self.record(|s| s.ticks += 1);
    }

    /// Run `ticks` frames with no hardware attached.
    pub fn advance(&self, ticks: Tick) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    #[cfg(feature = "rtrb")]
    fn apply_commands(&self) {
        loop {
            let command = match self.inbox.borrow_mut().as_mut().and_then(Inbox::pop) {
                Some(command) => command,
                None => break,
            };
            command(self);
        }
    }

    fn drain(&self, now: Tick) {
        let limit = self.config.max_resumes_per_tick;
        let mut resumed = 0;
        loop {
            if resumed == limit {
                if self.scheduler.borrow_mut().has_due(now) {
                    warn!(tick = now, limit, "drain limit reached, deferring due shreds");
                    self.record(|s| s.deferred += 1);
                }
                return;
            }
            // Released before resuming: the task may spork or reschedule.
            let Some(task) = self.scheduler.borrow_mut().pop_due(now) else {
                return;
            };
            self.resume_task(&task, None);
            resumed += 1;
        }
    }

    /// Resume `task` once and file it according to how it suspended.
    pub(crate) fn resume_task(&self, task: &TaskHandle, wake: Option<Value>) {
        if task.is_terminated() {
            return;
        }
        task.set_state(TaskState::Running);
        self.record(|s| s.resumes += 1);

        let Some(outcome) = task.resume_body(self, wake) else {
            return;
        };

        // Cancelled from inside its own resume.
        if task.is_terminated() {
            task.release(true);
            return;
        }

        let now = self.now.get();
        match outcome {
            Ok(Suspension::Immediate) | Ok(Suspension::Timed(0)) => {
                task.set_state(TaskState::Runnable);
                self.scheduler.borrow_mut().schedule(task.clone(), now);
            }
            Ok(Suspension::Timed(ticks)) => {
                task.set_state(TaskState::Sleeping);
                self.scheduler
                    .borrow_mut()
                    .schedule(task.clone(), now.saturating_add(ticks));
            }
            Ok(Suspension::Await(event)) => event.wait(task.clone()),
            Ok(Suspension::Terminated) => {
                task.release(false);
                self.registry.borrow_mut().remove(&task.id());
                debug!(task = %task.id(), tick = now, "terminated");
            }
            Err(err) => {
                task.release(false);
                self.registry.borrow_mut().remove(&task.id());
                self.record(|s| s.faults += 1);
                error!(task = %task.id(), tick = now, "{err}");
            }
        }
    }

    // Shreds

    /// Start `task` at the current tick.
    pub fn spork(&self, task: impl Task) -> TaskHandle {
        self.spork_at(self.now(), task)
    }

    /// Start `task` at tick `when`. A tick in the past means now.
    pub fn spork_at(&self, when: Tick, task: impl Task) -> TaskHandle {
        let now = self.now();
        let when = when.max(now);

        let id = TaskId(self.next_task_id.get());
        self.next_task_id.set(id.0 + 1);

        let handle = TaskHandle::new(id, Box::new(task), when);
        handle.set_state(if when > now {
            TaskState::Sleeping
        } else {
            TaskState::Runnable
        });

        self.registry.borrow_mut().insert(id, handle.downgrade());
        self.scheduler.borrow_mut().schedule(handle.clone(), when);
        self.record(|s| s.sporked += 1);
        debug!(task = %id, at = when, "sporked");
        handle
    }

    /// Start `task` `delay` ticks from now.
    pub fn spork_in(&self, delay: Tick, task: impl Task) -> TaskHandle {
        self.spork_at(self.now().saturating_add(delay), task)
    }

    /// Cancel `task`. Returns `false` if it had already terminated.
    pub fn cancel(&self, task: &TaskHandle) -> bool {
        let cancelled = task.cancel();
        self.registry.borrow_mut().remove(&task.id());
        cancelled
    }

    /// Every task that has not terminated, oldest first.
    pub fn live_tasks(&self) -> Vec<TaskHandle> {
        let mut registry = self.registry.borrow_mut();
        registry.retain(|_, task| task.upgrade().is_some_and(|t| !t.is_terminated()));
        registry.values().filter_map(WeakTask::upgrade).collect()
    }

    /// Entries in the run queue.
    ///
    /// Cancelled tasks are dropped from the queue lazily, so this can count
    /// some of them until they come due or the queue is next compacted.
    pub fn pending(&self) -> usize {
        self.scheduler.borrow().len()
    }

    pub fn event(&self) -> Event {
        Event::new()
    }

    // Graph

    /// The I/O node: its inputs go to the speakers, its outputs carry the
    /// captured input.
    pub fn io(&self) -> &NodeRef {
        &self.io
    }

    /// Same node as [`Server::io`], named for connecting into it.
    pub fn dac(&self) -> &NodeRef {
        &self.io
    }

    /// Same node as [`Server::io`], named for reading from it.
    pub fn adc(&self) -> &NodeRef {
        &self.io
    }

    /// A passive node.
    pub fn node(&self, input_size: usize, output_size: usize) -> NodeRef {
        Node::new(input_size, output_size)
    }

    /// An oscillator at this server's sample rate.
    pub fn oscillator(&self, waveform: Waveform) -> NodeRef {
        OscNode::new(waveform, self.config.sample_rate)
    }

    pub fn gain(&self, channels: usize, level: f32) -> NodeRef {
        Node::gain(channels, level)
    }

    /// Connect with the default route.
    pub fn connect(&self, source: &NodeRef, target: &NodeRef) -> Result<(), GraphError> {
        graph::connect(source, target, None)
    }

    pub fn connect_with(
        &self,
        source: &NodeRef,
        target: &NodeRef,
        route: Route,
    ) -> Result<(), GraphError> {
        graph::connect(source, target, Some(route))
    }

    pub fn disconnect(&self, source: &NodeRef, target: &NodeRef) -> bool {
        graph::disconnect(source, target)
    }

    // Time

    pub fn ms(&self, ms: f64) -> Tick {
        time::ms(self.config.sample_rate, ms)
    }

    pub fn seconds(&self, seconds: f64) -> Tick {
        time::seconds(self.config.sample_rate, seconds)
    }

    pub fn minutes(&self, minutes: f64) -> Tick {
        time::minutes(self.config.sample_rate, minutes)
    }

    pub fn hours(&self, hours: f64) -> Tick {
        time::hours(self.config.sample_rate, hours)
    }

    // Audio boundary

    /// Process one frame: `input` feeds the I/O node's outputs (missing
    /// channels read as silence), one tick runs, and the I/O node's inputs
    /// are copied to `output` (extra channels are zeroed).
    pub fn process_frame(&self, input: &[f32], output: &mut [f32]) {
        self.io.reset_output();
        self.io.write_outputs(input);

        self.tick();

        output.fill(0.0);
        self.io.read_inputs(output);
    }

    /// Process interleaved frames, one tick each. `None` input is silence.
    /// Returns the number of frames processed.
    pub fn process_interleaved(&self, input: Option<&[f32]>, output: &mut [f32]) -> usize {
        let ins = self.config.input_channels;
        let outs = self.config.output_channels;
        let frames = if outs > 0 {
            output.len() / outs
        } else {
            input.map_or(0, |input| input.len() / ins.max(1))
        };

        for frame in 0..frames {
            let captured = input
                .and_then(|input| input.get(frame * ins..(frame + 1) * ins))
                .unwrap_or(&[]);
            self.process_frame(captured, &mut output[frame * outs..(frame + 1) * outs]);
        }
        output[frames * outs..].fill(0.0);
        frames
    }

    /// Process planar buffers, one tick per frame of `output`.
    pub fn process_block(&self, input: &AudioInput, output: &mut AudioOutput) {
        let mut captured = self.scratch_in.borrow_mut();
        let mut played = self.scratch_out.borrow_mut();

        for frame in 0..output.frames() {
            input.read_frame(frame, &mut captured[..]);
            self.process_frame(&captured[..], &mut played[..]);
            output.write_frame(frame, &played[..]);
        }
    }

    // Shutdown

    /// Cancel every shred and detach the graph from the I/O node.
    pub fn stop(self) {
        drop(self);
    }

    fn shutdown(&self) {
        let registry = std::mem::take(&mut *self.registry.borrow_mut());
        let mut tasks: Vec<TaskHandle> = registry.values().filter_map(WeakTask::upgrade).collect();
        tasks.extend(self.scheduler.borrow_mut().clear());

        let cancelled = tasks.iter().filter(|task| task.cancel()).count();
        self.io.clear_sources();
        info!(tick = self.now(), cancelled, "server stopped");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("now", &self.now.get())
            .field("config", &self.config)
            .field("pending", &self.scheduler.borrow().len())
            .field("stats", &self.stats.get())
            .finish()
    }
}
