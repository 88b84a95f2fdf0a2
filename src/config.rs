//! Engine configuration
//!
//! Loaded from JSON (all fields optional), then overridden by the `init`
//! payload and CLI flags.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::buffer::{DEFAULT_SAMPLE_RATE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use crate::error::{Result, VoxscapeError};

/// Runtime configuration for an [`AudioEngine`](crate::engine::AudioEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Engine sample rate in Hz
    pub sample_rate: u32,
    /// Seed for every procedural generator; `None` draws one from entropy
    pub seed: Option<u64>,
    /// Master gain at startup (0 to 1)
    pub master_volume: f32,
    /// Length of the master volume ramp in milliseconds
    pub volume_ramp_ms: f32,
    /// Length of the looped noise buffers in seconds
    pub noise_seconds: f32,
    /// Length of the synthetic impulse responses in seconds
    pub impulse_seconds: f32,
    /// Length of each looped ambience layer in seconds
    pub layer_seconds: f32,
    /// Reply `unhandled_command` instead of silently dropping unknown types
    pub reply_unhandled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            seed: None,
            master_volume: 0.8,
            volume_ramp_ms: 100.0,
            noise_seconds: 2.0,
            impulse_seconds: 3.0,
            layer_seconds: 4.0,
            reply_unhandled: false,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Builder-style seed override
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder-style sample rate override
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Validate every field against its accepted range
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(invalid(
                "sample_rate",
                self.sample_rate,
                format!("{} to {} Hz", MIN_SAMPLE_RATE, MAX_SAMPLE_RATE),
            ));
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(invalid("master_volume", self.master_volume, "0 to 1"));
        }
        if !(1.0..=5000.0).contains(&self.volume_ramp_ms) {
            return Err(invalid("volume_ramp_ms", self.volume_ramp_ms, "1 to 5000 ms"));
        }
        if !(0.1..=30.0).contains(&self.noise_seconds) {
            return Err(invalid("noise_seconds", self.noise_seconds, "0.1 to 30 s"));
        }
        if !(0.1..=10.0).contains(&self.impulse_seconds) {
            return Err(invalid("impulse_seconds", self.impulse_seconds, "0.1 to 10 s"));
        }
        if !(0.1..=30.0).contains(&self.layer_seconds) {
            return Err(invalid("layer_seconds", self.layer_seconds, "0.1 to 30 s"));
        }
        Ok(())
    }
}

fn invalid(param: &str, value: impl ToString, expected: impl Into<String>) -> VoxscapeError {
    VoxscapeError::InvalidParameter {
        param: param.to_string(),
        value: value.to_string(),
        expected: expected.into(),
    }
}
