//! Master sink
//!
//! The single path to the output: ramped master gain into a gentle
//! compressor, then a hard clamp to [-1, 1].

use crate::dsp::{Compressor, CompressorParams, Effect, RampedGain};
use crate::engine::AudioBuffer;

/// Master gain and dynamics
#[derive(Debug, Clone)]
pub struct MasterBus {
    gain: RampedGain,
    compressor: Compressor,
    sample_rate: u32,
    ramp_ms: f32,
}

impl MasterBus {
    pub fn new(volume: f32, ramp_ms: f32, sample_rate: u32) -> Self {
        Self {
            gain: RampedGain::new(volume.clamp(0.0, 1.0)),
            compressor: Compressor::new(CompressorParams::master(), sample_rate),
            sample_rate,
            ramp_ms,
        }
    }

    /// Ramp length in samples
    pub fn ramp_samples(&self) -> usize {
        (self.ramp_ms / 1000.0 * self.sample_rate as f32).round() as usize
    }

    /// Ramp toward `volume` (clamped to [0, 1]); returns the clamped target
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = volume.clamp(0.0, 1.0);
        let ramp = self.ramp_samples();
        self.gain.set_target(volume, ramp);
        volume
    }

    /// Gain applied to the next sample
    pub fn current_gain(&self) -> f32 {
        self.gain.current()
    }

    /// Volume the ramp is heading toward
    pub fn volume(&self) -> f32 {
        self.gain.target()
    }

    pub fn is_ramping(&self) -> bool {
        self.gain.is_ramping()
    }

    /// Advance the gain one sample without processing audio
    pub fn next_gain(&mut self) -> f32 {
        self.gain.next_gain()
    }

    /// Run a block through gain, compressor and clamp
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        self.gain.process(buffer);
        self.compressor.process(buffer);
        buffer.clamp();
    }
}
