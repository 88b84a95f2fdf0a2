//! Downward expander
//!
//! Widens dynamic range by pushing material below the threshold further
//! down, so quiet ambience breathes instead of sitting as a flat bed. The
//! attenuation is bounded by `range_db`.

use crate::dsp::effect::{time_coefficient, Effect, EffectParams};
use crate::engine::buffer::{db_to_linear, AudioBuffer};
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Expander parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpanderParams {
    /// Threshold in dB (-80 to 0)
    pub threshold_db: f32,
    /// Expansion ratio (1.0 to 10.0)
    pub ratio: f32,
    /// Attack time in ms (0.1 to 100)
    pub attack_ms: f32,
    /// Release time in ms (10 to 1000)
    pub release_ms: f32,
    /// Maximum attenuation in dB (-80 to 0)
    pub range_db: f32,
}

impl Default for ExpanderParams {
    fn default() -> Self {
        Self {
            threshold_db: -42.0,
            ratio: 2.0,
            attack_ms: 5.0,
            release_ms: 150.0,
            range_db: -24.0,
        }
    }
}

impl ExpanderParams {
    /// Clamp parameters to valid ranges
    pub fn clamp(&mut self) {
        self.threshold_db = self.threshold_db.clamp(-80.0, 0.0);
        self.ratio = self.ratio.clamp(1.0, 10.0);
        self.attack_ms = self.attack_ms.clamp(0.1, 100.0);
        self.release_ms = self.release_ms.clamp(10.0, 1000.0);
        self.range_db = self.range_db.clamp(-80.0, 0.0);
    }
}

/// Downward expander with a peak envelope follower
#[derive(Debug, Clone)]
pub struct Expander {
    params: EffectParams,
    settings: ExpanderParams,
    sample_rate: u32,
    envelope: f32,
    gain: f32,
    detector_release: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl Expander {
    /// Create an expander; parameters are clamped to valid ranges
    pub fn new(mut settings: ExpanderParams, sample_rate: u32) -> Self {
        settings.clamp();
        let mut expander = Self {
            params: EffectParams::default(),
            settings,
            sample_rate,
            envelope: 0.0,
            gain: 1.0,
            detector_release: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
        };
        expander.update_coefficients();
        expander
    }

    /// Get the current parameters
    pub fn settings(&self) -> &ExpanderParams {
        &self.settings
    }

    fn update_coefficients(&mut self) {
        self.detector_release = time_coefficient(30.0, self.sample_rate);
        self.attack_coeff = time_coefficient(self.settings.attack_ms, self.sample_rate);
        self.release_coeff = time_coefficient(self.settings.release_ms, self.sample_rate);
    }

    /// Gain change in dB for a detected level in dB (0 or negative)
    fn compute_gain_db(&self, level_db: f32) -> f32 {
        if level_db >= self.settings.threshold_db {
            return 0.0;
        }
        let under = level_db - self.settings.threshold_db;
        (under * (self.settings.ratio - 1.0)).max(self.settings.range_db)
    }
}

impl Effect for Expander {
    impl_effect_common!(Expander, "expander", "Expander");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }

        for frame in 0..buffer.num_samples() {
            let level = buffer
                .samples
                .iter()
                .map(|ch| ch[frame].abs())
                .fold(0.0_f32, f32::max);

            // Instant attack, smoothed release on the detector
            self.envelope = if level > self.envelope {
                level
            } else {
                self.detector_release * self.envelope + (1.0 - self.detector_release) * level
            };

            let level_db = if self.envelope > 0.0 {
                20.0 * self.envelope.log10()
            } else {
                -120.0
            };
            let target = db_to_linear(self.compute_gain_db(level_db));

            // Opening the expander is the "attack"
            let coeff = if target > self.gain {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain = coeff * self.gain + (1.0 - coeff) * target;

            for channel in &mut buffer.samples {
                channel[frame] *= self.gain;
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
        self.gain = 1.0;
    }

    fn get_params(&self) -> Value {
        json!({
            "threshold_db": self.settings.threshold_db,
            "ratio": self.settings.ratio,
            "attack_ms": self.settings.attack_ms,
            "release_ms": self.settings.release_ms,
            "range_db": self.settings.range_db,
            "enabled": self.params.enabled
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChannelLayout;

    fn constant_buffer(value: f32, num_samples: usize) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(num_samples, ChannelLayout::Mono);
        buffer.channel_mut(0).iter_mut().for_each(|s| *s = value);
        buffer
    }

    #[test]
    fn test_loud_material_passes() {
        let mut expander = Expander::new(ExpanderParams::default(), 44100);
        let mut buffer = constant_buffer(0.5, 4410);
        expander.process(&mut buffer);
        assert!((buffer.channel(0)[4000] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_quiet_material_is_pushed_down() {
        let mut expander = Expander::new(ExpanderParams::default(), 44100);
        // -52 dB: 10 dB under threshold, 2:1 adds 10 dB of attenuation
        let mut buffer = constant_buffer(0.0025, 44100);
        expander.process(&mut buffer);
        let out = buffer.channel(0)[44000];
        let expected = 0.0025 * db_to_linear(-10.0);
        assert!((out - expected).abs() < expected * 0.1, "got {}", out);
    }

    #[test]
    fn test_attenuation_bounded_by_range() {
        let expander = Expander::new(ExpanderParams::default(), 44100);
        assert_eq!(expander.compute_gain_db(-120.0), -24.0);
        assert_eq!(expander.compute_gain_db(0.0), 0.0);
    }
}
