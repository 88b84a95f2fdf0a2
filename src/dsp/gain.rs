//! Ramped gain
//!
//! Linear gain whose changes are spread across a ramp window so the output
//! never jumps between two samples. Used for the master volume.

use crate::dsp::effect::{Effect, EffectParams};
use crate::engine::AudioBuffer;
use crate::impl_effect_common;
use serde_json::{json, Value};

/// Linear gain with per-sample ramping
#[derive(Debug, Clone)]
pub struct RampedGain {
    params: EffectParams,
    current: f32,
    target: f32,
    step: f32,
    remaining: usize,
}

impl RampedGain {
    /// Create a gain settled at `gain`
    pub fn new(gain: f32) -> Self {
        let gain = gain.max(0.0);
        Self {
            params: EffectParams::default(),
            current: gain,
            target: gain,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Gain applied to the next sample
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Gain the ramp is heading toward
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether a ramp is still in progress
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    /// Samples left in the current ramp
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Start a linear ramp from the current value to `target`
    ///
    /// A zero-length ramp jumps immediately. Starting a new ramp mid-way
    /// continues from wherever the previous ramp had reached.
    pub fn set_target(&mut self, target: f32, ramp_samples: usize) {
        let target = target.max(0.0);
        self.target = target;
        if ramp_samples == 0 || (target - self.current).abs() < f32::EPSILON {
            self.current = target;
            self.step = 0.0;
            self.remaining = 0;
            return;
        }
        self.step = (target - self.current) / ramp_samples as f32;
        self.remaining = ramp_samples;
    }

    /// Advance one sample and return the gain for it
    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }
}

impl Default for RampedGain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Effect for RampedGain {
    impl_effect_common!(RampedGain, "ramped_gain", "Gain");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }

        // Settled unity gain leaves the buffer untouched
        if !self.is_ramping() && (self.current - 1.0).abs() < f32::EPSILON {
            return;
        }

        for frame in 0..buffer.num_samples() {
            let gain = self.next_gain();
            for channel in &mut buffer.samples {
                channel[frame] *= gain;
            }
        }
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {
        self.current = self.target;
        self.step = 0.0;
        self.remaining = 0;
    }

    fn get_params(&self) -> Value {
        json!({
            "current": self.current,
            "target": self.target,
            "remaining": self.remaining,
            "enabled": self.params.enabled
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChannelLayout;

    #[test]
    fn test_ramp_is_strictly_monotonic() {
        let mut gain = RampedGain::new(0.8);
        gain.set_target(0.5, 4410);

        let mut previous = gain.current();
        for _ in 0..4410 {
            let g = gain.next_gain();
            assert!(g < previous, "{} !< {}", g, previous);
            previous = g;
        }
        assert_eq!(gain.current(), 0.5);
        assert!(!gain.is_ramping());
        assert_eq!(gain.next_gain(), 0.5);
    }

    #[test]
    fn test_ramp_has_no_large_steps() {
        let mut gain = RampedGain::new(0.0);
        gain.set_target(1.0, 100);
        let mut previous = gain.current();
        for _ in 0..100 {
            let g = gain.next_gain();
            assert!((g - previous).abs() <= 0.0101);
            previous = g;
        }
    }

    #[test]
    fn test_zero_length_ramp_jumps() {
        let mut gain = RampedGain::new(1.0);
        gain.set_target(0.25, 0);
        assert_eq!(gain.current(), 0.25);
        assert!(!gain.is_ramping());
    }

    #[test]
    fn test_retarget_mid_ramp_continues_from_current() {
        let mut gain = RampedGain::new(0.0);
        gain.set_target(1.0, 10);
        for _ in 0..5 {
            gain.next_gain();
        }
        let mid = gain.current();
        gain.set_target(0.0, 10);
        let next = gain.next_gain();
        assert!(next < mid && (mid - next) < 0.06);
    }

    #[test]
    fn test_process_applies_ramp_per_frame() {
        let mut gain = RampedGain::new(1.0);
        gain.set_target(0.0, 4);
        let mut buffer = AudioBuffer::new(6, ChannelLayout::Stereo);
        for ch in 0..2 {
            buffer.channel_mut(ch).iter_mut().for_each(|s| *s = 1.0);
        }
        gain.process(&mut buffer);
        assert_eq!(buffer.channel(0), buffer.channel(1));
        let out = buffer.channel(0);
        assert!((out[0] - 0.75).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[3], 0.0);
        assert_eq!(out[5], 0.0);
    }
}
