//! Waveshaping distortion
//!
//! A static transfer curve sampled over [-1, 1] and read with linear
//! interpolation. The curve is a pure function of the saturation constant,
//! so two shapers with the same constant produce identical output.

use crate::dsp::effect::{Effect, EffectParams};
use crate::engine::AudioBuffer;
use crate::impl_effect_common;
use serde_json::{json, Value};
use std::f32::consts::PI;

/// Number of points in the transfer curve
pub const CURVE_SAMPLES: usize = 4096;

/// Default saturation constant for the radio chain
pub const DEFAULT_SATURATION: f32 = 50.0;

/// Largest accepted saturation constant
pub const MAX_SATURATION: f32 = 1000.0;

/// Build the distortion curve for saturation constant `k`
///
/// `f(x) = (3 + k) * x * 20° / (π + k * |x|)` over `x ∈ [-1, 1]`.
pub fn distortion_curve(k: f32, samples: usize) -> Vec<f32> {
    let deg = PI / 180.0;
    let last = (samples.max(2) - 1) as f32;
    (0..samples.max(2))
        .map(|i| {
            let x = i as f32 * 2.0 / last - 1.0;
            (3.0 + k) * x * 20.0 * deg / (PI + k * x.abs())
        })
        .collect()
}

/// Curve-lookup waveshaper
#[derive(Debug, Clone)]
pub struct WaveShaper {
    params: EffectParams,
    saturation: f32,
    curve: Vec<f32>,
}

impl WaveShaper {
    /// Create a shaper for saturation constant `k` (clamped to 0..=1000)
    pub fn new(saturation: f32) -> Self {
        let saturation = saturation.clamp(0.0, MAX_SATURATION);
        Self {
            params: EffectParams::default(),
            saturation,
            curve: distortion_curve(saturation, CURVE_SAMPLES),
        }
    }

    /// Current saturation constant
    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    /// Rebuild the curve for a new saturation constant
    pub fn set_saturation(&mut self, saturation: f32) {
        self.saturation = saturation.clamp(0.0, MAX_SATURATION);
        self.curve = distortion_curve(self.saturation, CURVE_SAMPLES);
    }

    /// The transfer curve
    pub fn curve(&self) -> &[f32] {
        &self.curve
    }

    /// Shape a single sample
    #[inline]
    pub fn shape(&self, x: f32) -> f32 {
        let last = (self.curve.len() - 1) as f32;
        let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * last;
        let idx = pos.floor() as usize;
        let frac = pos - idx as f32;
        let a = self.curve[idx];
        let b = self.curve.get(idx + 1).copied().unwrap_or(a);
        a + (b - a) * frac
    }
}

impl Effect for WaveShaper {
    impl_effect_common!(WaveShaper, "waveshaper", "Waveshaper");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        for channel in 0..buffer.num_channels() {
            for i in 0..buffer.num_samples() {
                let x = buffer.channel(channel)[i];
                buffer.channel_mut(channel)[i] = self.shape(x);
            }
        }
    }

    fn prepare(&mut self, _sample_rate: u32) {
        // Stateless and rate-independent
    }

    fn reset(&mut self) {}

    fn get_params(&self) -> Value {
        json!({
            "saturation": self.saturation,
            "curve_samples": self.curve.len(),
            "enabled": self.params.enabled
        })
    }
}
