pub mod dsp; // Oscillator math behind the built-in kernels
pub mod engine; // Clock/server, scheduler, cross-thread commands
pub mod error;
pub mod graph; // Signal nodes, routes and pull evaluation
pub mod io;
pub mod shred; // Cooperative tasks and events
pub mod time;

pub use engine::{Server, ServerConfig};
pub use error::{CommandError, ConfigError, GraphError, ParamError, TaskError};
pub use graph::{Node, NodeRef, Route};
pub use shred::{Event, Suspension, Task, TaskHandle, Value};

/// One discrete advance of the virtual clock. One tick is one audio frame.
pub type Tick = u64;
