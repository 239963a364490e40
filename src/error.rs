//! Error types shared across the runtime.

/// Errors raised while wiring the signal graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error(
        "route shape {route_source}x{route_target} does not match source outputs ({source_outputs}) and target inputs ({target_inputs})"
    )]
    ShapeMismatch {
        route_source: usize,
        route_target: usize,
        source_outputs: usize,
        target_inputs: usize,
    },

    #[error("malformed route weights: {0}")]
    MalformedRoute(String),

    #[error("channel {channel} out of range for a buffer of {size}")]
    ChannelOutOfRange { channel: usize, size: usize },
}

/// A generator parameter was rejected. The previous value is kept.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("frequency must be positive, got {0}")]
    Frequency(f32),

    #[error("phase must lie in (-pi, pi], got {0}")]
    Phase(f32),

    #[error("gain must be non-negative, got {0}")]
    Gain(f32),

    #[error("width must lie in [0, 1], got {0}")]
    Width(f32),
}

/// A task body failed while being resumed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("task fault: {0}")]
    Fault(String),
}

impl TaskError {
    pub fn fault(message: impl Into<String>) -> Self {
        TaskError::Fault(message.into())
    }
}

/// Rejected server configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    SampleRate,

    #[error("at least one input or output channel is required")]
    Channels,

    #[error("drain limit must be at least 1")]
    DrainLimit,
}

/// Errors from the cross-thread command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("command queue is full")]
    Full,
}
