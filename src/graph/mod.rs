//! The clocked signal graph.
//!
//! Nodes hold fixed-size sample buffers and a kernel; routes are the weight
//! matrices on the edges. The graph is never walked as a whole: each tick the
//! server pulls its I/O node, which pulls its sources recursively. Anything
//! not reachable from the sink does not run.

/// Nodes, kernels and per-tick evaluation.
pub mod node;
/// Oscillator node constructors.
pub mod oscillator;
/// Weighted connection matrices.
pub mod route;

pub use node::{Compute, Kernel, Node, NodeId, NodeRef};
pub use oscillator::OscNode;
pub use route::Route;

use crate::error::GraphError;
use crate::Tick;

/// Route `source` into `target`, using the default route when none is given.
///
/// Connecting the same pair again replaces the route.
pub fn connect(source: &NodeRef, target: &NodeRef, route: Option<Route>) -> Result<(), GraphError> {
    match route {
        Some(route) => target.add_source(source, route),
        None => target.add_source_default(source),
    }
}

/// Remove the edge `source -> target`. Returns whether it existed.
pub fn disconnect(source: &NodeRef, target: &NodeRef) -> bool {
    target.remove_source(source)
}

/// Pull `sink` and everything upstream of it for tick `now`.
pub fn render(sink: &NodeRef, now: Tick) {
    sink.tick(now);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_uses_default_route() {
        let source = Node::new(0, 1);
        let target = Node::new(2, 2);
        connect(&source, &target, None).unwrap();
        assert_eq!(target.route_from(&source), Some(Route::new(1, 2)));
    }

    #[test]
    fn connect_rejects_wrong_route() {
        let source = Node::new(0, 1);
        let target = Node::new(2, 2);
        assert!(connect(&source, &target, Some(Route::new(2, 2))).is_err());
        assert!(!target.has_source(&source));
    }

    #[test]
    fn disconnect_silences_target() {
        let source = OscNode::square(8_000);
        let target = Node::new(1, 0);
        connect(&source, &target, None).unwrap();

        render(&target, 0);
        assert_ne!(target.input(0), Some(0.0));

        assert!(disconnect(&source, &target));
        render(&target, 1);
        assert_eq!(target.input(0), Some(0.0));
        assert!(!disconnect(&source, &target));
    }

    #[test]
    fn unreachable_nodes_do_not_run() {
        let sink = Node::new(1, 0);
        let stray = OscNode::sine(8_000);
        render(&sink, 0);
        assert_eq!(stray.last_tick(), None);
    }
}
