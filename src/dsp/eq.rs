//! Three-band equalizer
//!
//! Low shelf, mid peak and high shelf in series, each a [`BiquadFilter`].

use crate::dsp::biquad::{BiquadFilter, FilterType};
use crate::dsp::effect::{Effect, EffectParams};
use crate::engine::AudioBuffer;
use crate::impl_effect_common;
use serde_json::{json, Value};

/// Low shelf corner frequency in Hz
pub const LOW_SHELF_HZ: f32 = 250.0;

/// Mid peak center frequency in Hz
pub const MID_PEAK_HZ: f32 = 1000.0;

/// High shelf corner frequency in Hz
pub const HIGH_SHELF_HZ: f32 = 4000.0;

/// Band gain limit in dB (either direction)
pub const MAX_BAND_GAIN_DB: f32 = 24.0;

/// Equalizer band selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Mid,
    High,
}

/// Three-band equalizer
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    params: EffectParams,
    low: BiquadFilter,
    mid: BiquadFilter,
    high: BiquadFilter,
}

impl ThreeBandEq {
    /// Create an EQ with band gains in dB (clamped to ±24 dB)
    pub fn new(low_db: f32, mid_db: f32, high_db: f32, sample_rate: u32) -> Self {
        let clamp = |db: f32| db.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
        Self {
            params: EffectParams::default(),
            low: BiquadFilter::with_gain(
                FilterType::LowShelf,
                LOW_SHELF_HZ,
                0.707,
                clamp(low_db),
                sample_rate,
            ),
            mid: BiquadFilter::with_gain(
                FilterType::Peak,
                MID_PEAK_HZ,
                0.8,
                clamp(mid_db),
                sample_rate,
            ),
            high: BiquadFilter::with_gain(
                FilterType::HighShelf,
                HIGH_SHELF_HZ,
                0.707,
                clamp(high_db),
                sample_rate,
            ),
        }
    }

    fn band(&self, band: Band) -> &BiquadFilter {
        match band {
            Band::Low => &self.low,
            Band::Mid => &self.mid,
            Band::High => &self.high,
        }
    }

    /// Gain of a band in dB
    pub fn gain_db(&self, band: Band) -> f32 {
        self.band(band).gain_db()
    }

    /// Set the gain of a band in dB (clamped to ±24 dB)
    pub fn set_gain_db(&mut self, band: Band, gain_db: f32) {
        let gain_db = gain_db.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
        match band {
            Band::Low => self.low.set_gain_db(gain_db),
            Band::Mid => self.mid.set_gain_db(gain_db),
            Band::High => self.high.set_gain_db(gain_db),
        }
    }
}

impl Effect for ThreeBandEq {
    impl_effect_common!(ThreeBandEq, "three_band_eq", "3-Band EQ");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        self.low.process(buffer);
        self.mid.process(buffer);
        self.high.process(buffer);
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.low.prepare(sample_rate);
        self.mid.prepare(sample_rate);
        self.high.prepare(sample_rate);
    }

    fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }

    fn get_params(&self) -> Value {
        json!({
            "low_db": self.low.gain_db(),
            "mid_db": self.mid.gain_db(),
            "high_db": self.high.gain_db(),
            "enabled": self.params.enabled
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::biquad::tests::{rms, sine_buffer};

    #[test]
    fn test_flat_eq_is_transparent() {
        let mut eq = ThreeBandEq::new(0.0, 0.0, 0.0, 44100);
        let mut buffer = sine_buffer(1000.0, 44100, 4410);
        let before = rms(&buffer, 0);
        eq.process(&mut buffer);
        assert!((rms(&buffer, 0) - before).abs() < 0.01);
    }

    #[test]
    fn test_low_shelf_cut() {
        let mut eq = ThreeBandEq::new(-12.0, 0.0, 0.0, 44100);
        let mut buffer = sine_buffer(60.0, 44100, 8820);
        eq.process(&mut buffer);
        assert!(rms(&buffer, 2000) < 0.35);
    }

    #[test]
    fn test_gain_clamped() {
        let mut eq = ThreeBandEq::new(0.0, 0.0, 0.0, 44100);
        eq.set_gain_db(Band::High, 60.0);
        assert_eq!(eq.gain_db(Band::High), MAX_BAND_GAIN_DB);
        assert_eq!(eq.gain_db(Band::Low), 0.0);
    }
}
