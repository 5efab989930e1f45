//! Simulation parameters and their validity ranges.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUFFER_SIZE_RANGE: RangeInclusive<usize> = 1..=10;
pub const PRODUCER_COUNT_RANGE: RangeInclusive<usize> = 1..=5;
pub const CONSUMER_COUNT_RANGE: RangeInclusive<usize> = 1..=5;
pub const ANIMATION_SPEED_RANGE: RangeInclusive<f64> = 0.5..=3.0;

/// Parameters a simulation is built from.
///
/// All ranges are closed. The engine rejects (and leaves state untouched on)
/// any configuration outside them; nothing is clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of slots in the bounded buffer.
    pub buffer_size: usize,
    pub producer_count: usize,
    pub consumer_count: usize,
    /// Playback pacing in steps per second. Opaque to the engine: it is
    /// carried through to front-ends and the trace exporter unchanged.
    pub animation_speed: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            buffer_size: 5,
            producer_count: 2,
            consumer_count: 2,
            animation_speed: 1.0,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("buffer size {0} is outside 1..=10")]
    BufferSize(usize),
    #[error("producer count {0} is outside 1..=5")]
    ProducerCount(usize),
    #[error("consumer count {0} is outside 1..=5")]
    ConsumerCount(usize),
    #[error("animation speed {0} is outside 0.5..=3.0")]
    AnimationSpeed(f64),
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !BUFFER_SIZE_RANGE.contains(&self.buffer_size) {
            return Err(ConfigError::BufferSize(self.buffer_size));
        }
        if !PRODUCER_COUNT_RANGE.contains(&self.producer_count) {
            return Err(ConfigError::ProducerCount(self.producer_count));
        }
        if !CONSUMER_COUNT_RANGE.contains(&self.consumer_count) {
            return Err(ConfigError::ConsumerCount(self.consumer_count));
        }
        if !speed_in_range(self.animation_speed) {
            return Err(ConfigError::AnimationSpeed(self.animation_speed));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Returns `true` if `speed` is an acceptable animation speed.
/// `NaN` fails the range check and is therefore rejected.
pub fn speed_in_range(speed: f64) -> bool {
    ANIMATION_SPEED_RANGE.contains(&speed)
}
