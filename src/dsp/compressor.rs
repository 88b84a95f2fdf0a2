//! Compressor effect
//!
//! A dynamics processor that reduces the dynamic range of audio signals.
//! Features envelope follower, gain computer with soft knee, attack/release
//! smoothing and makeup gain. Used by the radio chain and the master sink.

use crate::dsp::effect::{time_coefficient, Effect, EffectParams};
use crate::engine::buffer::{db_to_linear, AudioBuffer};
use crate::error::{Result, VoxscapeError};
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Compressor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorParams {
    /// Threshold level in dB (-60 to 0 dB)
    pub threshold_db: f32,
    /// Compression ratio (1.0 to 20.0, representing 1:1 to 20:1)
    pub ratio: f32,
    /// Attack time in milliseconds (0.1 to 100 ms)
    pub attack_ms: f32,
    /// Release time in milliseconds (10 to 1000 ms)
    pub release_ms: f32,
    /// Knee width in dB (0 = hard knee, up to 12 dB for soft knee)
    pub knee_db: f32,
    /// Makeup gain in dB (0 to 24 dB)
    pub makeup_gain_db: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            ratio: 4.0,
            attack_ms: 3.0,
            release_ms: 250.0,
            knee_db: 6.0,
            makeup_gain_db: 0.0,
        }
    }
}

impl CompressorParams {
    /// Narrowband loudness setting: fast attack, fast release, heavy ratio
    pub fn radio() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 8.0,
            attack_ms: 1.0,
            release_ms: 50.0,
            knee_db: 3.0,
            makeup_gain_db: 6.0,
        }
    }

    /// Gentle glue for the master sink
    pub fn master() -> Self {
        Self {
            threshold_db: -12.0,
            ratio: 3.0,
            attack_ms: 5.0,
            release_ms: 200.0,
            knee_db: 6.0,
            makeup_gain_db: 0.0,
        }
    }

    /// Validate parameters against accepted ranges
    pub fn validate(&self) -> Result<()> {
        check("threshold_db", self.threshold_db, -60.0, 0.0, "-60 to 0 dB")?;
        check("ratio", self.ratio, 1.0, 20.0, "1.0 to 20.0")?;
        check("attack_ms", self.attack_ms, 0.1, 100.0, "0.1 to 100 ms")?;
        check("release_ms", self.release_ms, 10.0, 1000.0, "10 to 1000 ms")?;
        check("knee_db", self.knee_db, 0.0, 12.0, "0 to 12 dB")?;
        check("makeup_gain_db", self.makeup_gain_db, 0.0, 24.0, "0 to 24 dB")?;
        Ok(())
    }

    /// Clamp parameters to valid ranges
    pub fn clamp(&mut self) {
        self.threshold_db = self.threshold_db.clamp(-60.0, 0.0);
        self.ratio = self.ratio.clamp(1.0, 20.0);
        self.attack_ms = self.attack_ms.clamp(0.1, 100.0);
        self.release_ms = self.release_ms.clamp(10.0, 1000.0);
        self.knee_db = self.knee_db.clamp(0.0, 12.0);
        self.makeup_gain_db = self.makeup_gain_db.clamp(0.0, 24.0);
    }
}

fn check(param: &str, value: f32, min: f32, max: f32, expected: &str) -> Result<()> {
    if value < min || value > max {
        return Err(VoxscapeError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}

/// Feed-forward compressor with linked-channel peak detection
#[derive(Debug, Clone)]
pub struct Compressor {
    params: EffectParams,
    settings: CompressorParams,
    sample_rate: u32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Current smoothed gain (linear)
    gain: f32,
}

impl Compressor {
    /// Create a compressor; parameters are clamped to valid ranges
    pub fn new(settings: CompressorParams, sample_rate: u32) -> Self {
        let mut comp = Self {
            params: EffectParams::default(),
            settings,
            sample_rate,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            gain: 1.0,
        };
        comp.settings.clamp();
        comp.update_coefficients();
        comp
    }

    /// Get the current parameters
    pub fn settings(&self) -> &CompressorParams {
        &self.settings
    }

    /// Current gain reduction in dB (0 or negative)
    pub fn gain_reduction_db(&self) -> f32 {
        if self.gain > 0.0 {
            20.0 * self.gain.log10()
        } else {
            -96.0
        }
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_coefficient(self.settings.attack_ms, self.sample_rate);
        self.release_coeff = time_coefficient(self.settings.release_ms, self.sample_rate);
    }

    /// Gain change in dB for an input level in dB (0 or negative)
    fn compute_gain_reduction_db(&self, input_db: f32) -> f32 {
        let threshold = self.settings.threshold_db;
        let ratio = self.settings.ratio;
        let knee = self.settings.knee_db;

        if knee > 0.0 {
            let knee_start = threshold - knee / 2.0;
            let knee_end = threshold + knee / 2.0;

            if input_db <= knee_start {
                0.0
            } else if input_db >= knee_end {
                (threshold + (input_db - threshold) / ratio) - input_db
            } else {
                // Quadratic interpolation through the knee
                let over = input_db - knee_start;
                (1.0 / ratio - 1.0) * over * over / (2.0 * knee)
            }
        } else if input_db <= threshold {
            0.0
        } else {
            (threshold + (input_db - threshold) / ratio) - input_db
        }
    }
}

impl Effect for Compressor {
    impl_effect_common!(Compressor, "compressor", "Compressor");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }

        let makeup = db_to_linear(self.settings.makeup_gain_db);

        for frame in 0..buffer.num_samples() {
            // Linked detection: loudest channel drives all channels
            let level = buffer
                .samples
                .iter()
                .map(|ch| ch[frame].abs())
                .fold(0.0_f32, f32::max);

            let input_db = if level > 0.0 {
                20.0 * level.log10()
            } else {
                -96.0
            };
            let target = db_to_linear(self.compute_gain_reduction_db(input_db));

            let coeff = if target < self.gain {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain = coeff * self.gain + (1.0 - coeff) * target;

            let total_gain = self.gain * makeup;
            for channel in &mut buffer.samples {
                channel[frame] *= total_gain;
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.gain = 1.0;
    }

    fn get_params(&self) -> Value {
        json!({
            "threshold_db": self.settings.threshold_db,
            "ratio": self.settings.ratio,
            "attack_ms": self.settings.attack_ms,
            "release_ms": self.settings.release_ms,
            "knee_db": self.settings.knee_db,
            "makeup_gain_db": self.settings.makeup_gain_db,
            "enabled": self.params.enabled
        })
    }
}
