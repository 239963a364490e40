#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: usize = 2;
pub const DEFAULT_MAX_RESUMES_PER_TICK: usize = 65_536;
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

/// Fixed parameters of a server. None of them change after construction.
///
/// ```
/// use tickshred::ServerConfig;
///
/// let config = ServerConfig::new().sample_rate(48_000).channels(1);
/// assert_eq!(config.output_channels, 1);
/// assert!(config.validate().is_ok());
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub sample_rate: u32,
    /// Channels captured from the device (the I/O node's outputs).
    pub input_channels: usize,
    /// Channels sent to the device (the I/O node's inputs).
    pub output_channels: usize,
    /// Upper bound on task resumptions within one tick.
    pub max_resumes_per_tick: usize,
    /// Slots in the cross-thread command queue.
    pub command_capacity: usize,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Same channel count in both directions.
    pub fn channels(mut self, channels: usize) -> Self {
        self.input_channels = channels;
        self.output_channels = channels;
        self
    }

    pub fn input_channels(mut self, channels: usize) -> Self {
        self.input_channels = channels;
        self
    }

    pub fn output_channels(mut self, channels: usize) -> Self {
        self.output_channels = channels;
        self
    }

    pub fn max_resumes_per_tick(mut self, limit: usize) -> Self {
        self.max_resumes_per_tick = limit;
        self
    }

    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::SampleRate);
        }
        if self.input_channels == 0 && self.output_channels == 0 {
            return Err(ConfigError::Channels);
        }
        if self.max_resumes_per_tick == 0 {
            return Err(ConfigError::DrainLimit);
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            input_channels: DEFAULT_CHANNELS,
            output_channels: DEFAULT_CHANNELS,
            max_resumes_per_tick: DEFAULT_MAX_RESUMES_PER_TICK,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_cd_stereo() {
        let config = ServerConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!((config.input_channels, config.output_channels), (2, 2));
        assert_eq!(config.max_resumes_per_tick, 65_536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_configs() {
        assert_eq!(
            ServerConfig::new().sample_rate(0).validate(),
            Err(ConfigError::SampleRate)
        );
        assert_eq!(
            ServerConfig::new().channels(0).validate(),
            Err(ConfigError::Channels)
        );
        assert_eq!(
            ServerConfig::new().max_resumes_per_tick(0).validate(),
            Err(ConfigError::DrainLimit)
        );
        assert!(ServerConfig::new().input_channels(0).validate().is_ok());
    }
}
