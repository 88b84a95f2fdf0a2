//! Low-frequency sine oscillator
//!
//! Drives parameter modulation (underwater cutoff sweep, chorus delay).

use std::f64::consts::TAU;

/// Sub-audio sine oscillator
#[derive(Debug, Clone)]
pub struct Lfo {
    rate_hz: f32,
    depth: f32,
    phase: f64,
    sample_rate: u32,
}

impl Lfo {
    /// Create an oscillator; `depth` is the peak output value
    pub fn new(rate_hz: f32, depth: f32, sample_rate: u32) -> Self {
        Self {
            rate_hz: rate_hz.max(0.0),
            depth,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Start at a phase offset in cycles (0.0 to 1.0)
    pub fn with_phase(mut self, cycles: f64) -> Self {
        self.phase = cycles.rem_euclid(1.0);
        self
    }

    pub fn rate_hz(&self) -> f32 {
        self.rate_hz
    }

    pub fn set_rate_hz(&mut self, rate_hz: f32) {
        self.rate_hz = rate_hz.max(0.0);
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Current output without advancing
    #[inline]
    pub fn value(&self) -> f32 {
        self.depth * (self.phase * TAU).sin() as f32
    }

    /// Current output, then advance by one sample
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        let value = self.value();
        self.advance(1);
        value
    }

    /// Advance the phase by `samples`
    #[inline]
    pub fn advance(&mut self, samples: usize) {
        if self.sample_rate == 0 {
            return;
        }
        let step = self.rate_hz as f64 / self.sample_rate as f64;
        self.phase = (self.phase + step * samples as f64).rem_euclid(1.0);
    }

    /// Return to phase zero
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_cycle_reaches_depth() {
        let mut lfo = Lfo::new(1.0, 300.0, 1000);
        assert_eq!(lfo.value(), 0.0);
        lfo.advance(250);
        assert!((lfo.value() - 300.0).abs() < 1e-3);
        lfo.advance(500);
        assert!((lfo.value() + 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_output_bounded_by_depth() {
        let mut lfo = Lfo::new(0.3, 2.0, 44100);
        for _ in 0..44100 {
            assert!(lfo.next_value().abs() <= 2.0);
        }
    }

    #[test]
    fn test_phase_offset() {
        let lfo = Lfo::new(1.0, 1.0, 1000).with_phase(0.25);
        assert!((lfo.value() - 1.0).abs() < 1e-6);
    }
}
