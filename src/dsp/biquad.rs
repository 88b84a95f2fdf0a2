//! Biquad filter node
//!
//! Second-order IIR filter using the Audio EQ Cookbook formulas. Used for the
//! radio band-pass, the modulated underwater lowpass and the ambient EQ.

use crate::dsp::effect::{Effect, EffectParams};
use crate::engine::AudioBuffer;
use crate::impl_effect_common;
use serde_json::{json, Value};
use std::f64::consts::PI;

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    /// Remove above frequency
    #[default]
    LowPass,
    /// Remove below frequency
    HighPass,
    /// Bell curve boost/cut
    Peak,
    /// Boost/cut below frequency
    LowShelf,
    /// Boost/cut above frequency
    HighShelf,
}

impl FilterType {
    fn as_str(&self) -> &'static str {
        match self {
            FilterType::LowPass => "lowpass",
            FilterType::HighPass => "highpass",
            FilterType::Peak => "peak",
            FilterType::LowShelf => "lowshelf",
            FilterType::HighShelf => "highshelf",
        }
    }
}

/// Biquad filter coefficients, normalized by a0
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Calculate coefficients
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    pub(crate) fn calculate(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        // Keep below Nyquist
        let freq = frequency.clamp(10.0, sample_rate / 2.0 - 1.0);
        let q = q.clamp(0.1, 30.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Per-channel filter history (transposed direct form II)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }
}

/// A single biquad filter with per-channel state
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    params: EffectParams,
    filter_type: FilterType,
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: u32,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl BiquadFilter {
    /// Create a filter; coefficients are computed immediately
    pub fn new(filter_type: FilterType, frequency: f32, q: f32, sample_rate: u32) -> Self {
        Self::with_gain(filter_type, frequency, q, 0.0, sample_rate)
    }

    /// Create a shelf or peak filter with a gain in dB
    pub fn with_gain(
        filter_type: FilterType,
        frequency: f32,
        q: f32,
        gain_db: f32,
        sample_rate: u32,
    ) -> Self {
        let coeffs = BiquadCoeffs::calculate(
            filter_type,
            sample_rate as f64,
            frequency as f64,
            gain_db as f64,
            q as f64,
        );
        Self {
            params: EffectParams::default(),
            filter_type,
            frequency,
            q,
            gain_db,
            sample_rate,
            coeffs,
            states: vec![BiquadState::default(); 2],
        }
    }

    /// Create a lowpass filter
    pub fn low_pass(frequency: f32, q: f32, sample_rate: u32) -> Self {
        Self::new(FilterType::LowPass, frequency, q, sample_rate)
    }

    /// Create a highpass filter
    pub fn high_pass(frequency: f32, q: f32, sample_rate: u32) -> Self {
        Self::new(FilterType::HighPass, frequency, q, sample_rate)
    }

    /// Cutoff or center frequency in Hz
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Gain in dB (shelf and peak types only)
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Filter type
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Move the cutoff; history is kept so modulation stays click-free
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        self.update_coefficients();
    }

    /// Change the shelf/peak gain
    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db = gain_db;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        self.coeffs = BiquadCoeffs::calculate(
            self.filter_type,
            self.sample_rate as f64,
            self.frequency as f64,
            self.gain_db as f64,
            self.q as f64,
        );
    }

    /// Filter one sample on one channel
    #[inline]
    pub fn process_sample(&mut self, sample: f32, channel: usize) -> f32 {
        if channel >= self.states.len() {
            self.states.resize(channel + 1, BiquadState::default());
        }
        self.states[channel].process(sample as f64, &self.coeffs) as f32
    }
}

impl Effect for BiquadFilter {
    impl_effect_common!(BiquadFilter, "biquad", "Biquad Filter");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        for channel in 0..buffer.num_channels() {
            for i in 0..buffer.num_samples() {
                let x = buffer.channel(channel)[i];
                buffer.channel_mut(channel)[i] = self.process_sample(x, channel);
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        for state in &mut self.states {
            *state = BiquadState::default();
        }
    }

    fn get_params(&self) -> Value {
        json!({
            "type": self.filter_type.as_str(),
            "frequency": self.frequency,
            "q": self.q,
            "gain_db": self.gain_db,
            "enabled": self.params.enabled
        })
    }
}
