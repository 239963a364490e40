use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::dsp::{gain, Oscillator};
use crate::error::GraphError;
use crate::graph::route::Route;
use crate::Tick;

/*
Signal Nodes
============

A node is a unit generator with fixed-size input and output buffers. Each
clock tick the graph is pulled from its sink: the sink asks every source to
tick, sums their outputs through the routes into its own inputs, then runs
its kernel to turn inputs into outputs.

    tick(now)
      |- already ticked at `now`?  -> return (memoized)
      |- last_tick = now            (marked before recursing)
      |- fetch(now)                 (zero inputs, tick sources, accumulate)
      '- compute(now)               (kernel: inputs -> outputs)

Memoization
-----------

A node computes at most once per tick however many sinks pull it. In a
diamond (U feeds A and B, both feed D) U runs once per tick.

Feedback
--------

Because `last_tick` is set before fetching, a cycle terminates: when the
pull comes back around to a node that is still in progress, the memo check
returns immediately and the caller reads that node's outputs as they were
left by the previous tick. Every cyclic edge is therefore a one-sample
delay. Self-loops behave the same way.

Ownership
---------

Nodes are shared through `NodeRef` (`Rc<Node>`). A sink only keeps *weak*
references to its sources, so it never keeps them alive by itself. When the
last strong owner of a source goes away, the next fetch on the sink drops
that edge.
*/

/// Shared handle to a node.
pub type NodeRef = Rc<Node>;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique node identity, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// User-defined kernel.
///
/// Reads the node's inputs and writes its outputs once per tick. Closures
/// with the matching signature implement it directly.
pub trait Compute: 'static {
    fn compute(&mut self, input: &[f32], output: &mut [f32], now: Tick);
}

impl<F> Compute for F
where
    F: FnMut(&[f32], &mut [f32], Tick) + 'static,
{
    fn compute(&mut self, input: &[f32], output: &mut [f32], now: Tick) {
        self(input, output, now)
    }
}

/// What a node does with its inputs each tick.
pub enum Kernel {
    /// Leaves the outputs untouched. The I/O node uses this: the driver
    /// writes hardware input into its outputs.
    Passive,
    /// `output[i] = input[i] * gain` over the common channels.
    Gain(f32),
    /// One sample per tick into output 0.
    Oscillator(Oscillator),
    Custom(Box<dyn Compute>),
}

impl Kernel {
    #[inline]
    fn run(&mut self, input: &[f32], output: &mut [f32], now: Tick) {
        match self {
            Kernel::Passive => {}
            Kernel::Gain(level) => gain::scale_into(input, output, *level),
            Kernel::Oscillator(osc) => {
                if let Some(out) = output.first_mut() {
                    *out = osc.next_sample();
                }
            }
            Kernel::Custom(kernel) => kernel.compute(input, output, now),
        }
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::Passive => f.write_str("Passive"),
            Kernel::Gain(level) => f.debug_tuple("Gain").field(level).finish(),
            Kernel::Oscillator(osc) => f.debug_tuple("Oscillator").field(osc).finish(),
            Kernel::Custom(_) => f.write_str("Custom"),
        }
    }
}

struct SourceEntry {
    node: Weak<Node>,
    route: Route,
}

impl SourceEntry {
    fn is(&self, node: &Node) -> bool {
        std::ptr::eq(self.node.as_ptr(), node)
    }
}

pub struct Node {
    id: NodeId,
    input_size: usize,
    output_size: usize,
    input: RefCell<Box<[f32]>>,
    output: RefCell<Box<[f32]>>,
    last_tick: Cell<Option<Tick>>,
    sources: RefCell<Vec<SourceEntry>>,
    kernel: RefCell<Kernel>,
}

impl Node {
    /// A passive node: inputs are summed from sources, outputs are whatever
    /// was last written with `set_output`.
    pub fn new(input_size: usize, output_size: usize) -> NodeRef {
        Self::from_kernel(input_size, output_size, Kernel::Passive)
    }

    pub fn from_kernel(input_size: usize, output_size: usize, kernel: Kernel) -> NodeRef {
        Rc::new(Self {
            id: NodeId::next(),
            input_size,
            output_size,
            input: RefCell::new(vec![0.0; input_size].into_boxed_slice()),
            output: RefCell::new(vec![0.0; output_size].into_boxed_slice()),
            last_tick: Cell::new(None),
            sources: RefCell::new(Vec::new()),
            kernel: RefCell::new(kernel),
        })
    }

    pub fn custom(input_size: usize, output_size: usize, kernel: impl Compute) -> NodeRef {
        Self::from_kernel(input_size, output_size, Kernel::Custom(Box::new(kernel)))
    }

    /// Custom node from a closure `(inputs, outputs, now)`.
    pub fn from_fn<F>(input_size: usize, output_size: usize, f: F) -> NodeRef
    where
        F: FnMut(&[f32], &mut [f32], Tick) + 'static,
    {
        Self::custom(input_size, output_size, f)
    }

    /// `channels` in, `channels` out, scaled by `level`.
    pub fn gain(channels: usize, level: f32) -> NodeRef {
        Self::from_kernel(channels, channels, Kernel::Gain(level))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Tick at which this node last computed, `None` if it never has.
    pub fn last_tick(&self) -> Option<Tick> {
        self.last_tick.get()
    }

    pub fn input(&self, channel: usize) -> Option<f32> {
        self.input.borrow().get(channel).copied()
    }

    pub fn set_input(&self, channel: usize, value: f32) -> Result<(), GraphError> {
        write_channel(&mut self.input.borrow_mut(), channel, value)
    }

    pub fn output(&self, channel: usize) -> Option<f32> {
        self.output.borrow().get(channel).copied()
    }

    pub fn set_output(&self, channel: usize, value: f32) -> Result<(), GraphError> {
        write_channel(&mut self.output.borrow_mut(), channel, value)
    }

    pub fn inputs(&self) -> Ref<'_, [f32]> {
        Ref::map(self.input.borrow(), |buf| &**buf)
    }

    pub fn outputs(&self) -> Ref<'_, [f32]> {
        Ref::map(self.output.borrow(), |buf| &**buf)
    }

    /// Copy `samples` into the outputs, starting at channel 0.
    pub fn write_outputs(&self, samples: &[f32]) {
        let mut output = self.output.borrow_mut();
        let n = output.len().min(samples.len());
        output[..n].copy_from_slice(&samples[..n]);
    }

    /// Copy the inputs into `samples`, starting at channel 0.
    pub fn read_inputs(&self, samples: &mut [f32]) {
        let input = self.input.borrow();
        let n = input.len().min(samples.len());
        samples[..n].copy_from_slice(&input[..n]);
    }

    pub fn reset_input(&self) {
        self.input.borrow_mut().fill(0.0);
    }

    pub fn reset_output(&self) {
        self.output.borrow_mut().fill(0.0);
    }

    /// Route `source`'s outputs into this node's inputs.
    ///
    /// A route of the wrong shape is rejected and the node is left as it
    /// was. A second route from the same source replaces the first.
    pub fn add_source(&self, source: &NodeRef, route: Route) -> Result<(), GraphError> {
        if !route.fits(source.output_size, self.input_size) {
            let err = GraphError::ShapeMismatch {
                route_source: route.source_size(),
                route_target: route.target_size(),
                source_outputs: source.output_size,
                target_inputs: self.input_size,
            };
            warn!(from = %source.id, to = %self.id, "{err}");
            return Err(err);
        }

        let mut sources = self.sources.borrow_mut();
        match sources.iter_mut().find(|entry| entry.is(source)) {
            Some(entry) => entry.route = route,
            None => sources.push(SourceEntry {
                node: Rc::downgrade(source),
                route,
            }),
        }
        debug!(from = %source.id, to = %self.id, "connected");
        Ok(())
    }

    /// Connect with the default identity / full-mix route.
    pub fn add_source_default(&self, source: &NodeRef) -> Result<(), GraphError> {
        self.add_source(source, Route::between(source, self))
    }

    /// Drop the edge from `source`. Returns whether there was one.
    pub fn remove_source(&self, source: &Node) -> bool {
        let mut sources = self.sources.borrow_mut();
        let before = sources.len();
        sources.retain(|entry| !entry.is(source));
        before != sources.len()
    }

    pub fn has_source(&self, source: &Node) -> bool {
        self.sources.borrow().iter().any(|entry| entry.is(source))
    }

    /// The route currently used for `source`, if connected.
    pub fn route_from(&self, source: &Node) -> Option<Route> {
        self.sources
            .borrow()
            .iter()
            .find(|entry| entry.is(source))
            .map(|entry| entry.route.clone())
    }

    /// Number of recorded edges, including expired ones not yet pruned.
    pub fn source_count(&self) -> usize {
        self.sources.borrow().len()
    }

    /// Live sources in connection order.
    pub fn sources(&self) -> Vec<NodeRef> {
        self.sources
            .borrow()
            .iter()
            .filter_map(|entry| entry.node.upgrade())
            .collect()
    }

    pub fn clear_sources(&self) {
        self.sources.borrow_mut().clear();
    }

    /// Evaluate this node for tick `now`, pulling its sources first.
    pub fn tick(&self, now: Tick) {
        if self.last_tick.get().is_some_and(|last| last >= now) {
            return;
        }
        self.last_tick.set(Some(now));
        self.fetch(now);
        self.compute(now);
    }

    /// Zero the inputs, tick every live source and accumulate its outputs.
    pub fn fetch(&self, now: Tick) {
        self.input.borrow_mut().fill(0.0);

        // Index-based so no borrow of `sources` is held while a source
        // ticks; in a cycle that source may pull this node again.
        let mut expired = false;
        let mut index = 0;
        loop {
            let upstream = match self.sources.borrow().get(index) {
                Some(entry) => entry.node.upgrade(),
                None => break,
            };
            index += 1;

            let Some(source) = upstream else {
                expired = true;
                continue;
            };
            source.tick(now);

            let sources = self.sources.borrow();
            let route = &sources[index - 1].route;
            route.accumulate(&source.output.borrow(), &mut self.input.borrow_mut());
        }

        if expired {
            let mut sources = self.sources.borrow_mut();
            let before = sources.len();
            sources.retain(|entry| entry.node.strong_count() > 0);
            debug!(node = %self.id, pruned = before - sources.len(), "dropped expired sources");
        }
    }

    /// Run the kernel over the current inputs.
    pub fn compute(&self, now: Tick) {
        let input = self.input.borrow();
        let mut output = self.output.borrow_mut();
        self.kernel.borrow_mut().run(&input, &mut output, now);
    }

    /// Inspect or replace the kernel.
    pub fn with_kernel<R>(&self, f: impl FnOnce(&mut Kernel) -> R) -> R {
        f(&mut self.kernel.borrow_mut())
    }

    /// Access the oscillator of an oscillator node.
    pub fn with_oscillator<R>(&self, f: impl FnOnce(&mut Oscillator) -> R) -> Option<R> {
        match &mut *self.kernel.borrow_mut() {
            Kernel::Oscillator(osc) => Some(f(osc)),
            _ => None,
        }
    }
}

fn write_channel(buffer: &mut [f32], channel: usize, value: f32) -> Result<(), GraphError> {
    let size = buffer.len();
    match buffer.get_mut(channel) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(GraphError::ChannelOutOfRange { channel, size }),
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("input_size", &self.input_size)
            .field("output_size", &self.output_size)
            .field("last_tick", &self.last_tick.get())
            .field("sources", &self.sources.borrow().len())
            .finish()
    }
}
