//! Noise generators
//!
//! White noise is uniform in [-1, 1]. Pink noise runs white noise through
//! Paul Kellet's six-pole filter, which approximates a -3 dB/octave slope
//! across the audio band.

use crate::engine::AudioBuffer;
use rand::Rng;
use rand_pcg::Pcg32;

/// Output scale that keeps the filter sum near unit amplitude
const PINK_SCALE: f32 = 0.11;

/// Pole and input coefficients for b0..b5
const POLES: [(f32, f32); 6] = [
    (0.99886, 0.0555179),
    (0.99332, 0.0750759),
    (0.96900, 0.1538520),
    (0.86650, 0.3104856),
    (0.55000, 0.5329522),
    (-0.7616, -0.0168980),
];

/// Streaming pink-noise filter state
#[derive(Debug, Clone, Default)]
pub struct PinkFilter {
    b: [f32; 6],
    b6: f32,
}

impl PinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one white sample into one pink sample, clamped to [-1, 1]
    #[inline]
    pub fn next(&mut self, white: f32) -> f32 {
        for (state, &(pole, gain)) in self.b.iter_mut().zip(POLES.iter()) {
            *state = pole * *state + white * gain;
        }
        let sum: f32 = self.b.iter().sum::<f32>() + self.b6 + white * 0.5362;
        self.b6 = white * 0.115926;
        (sum * PINK_SCALE).clamp(-1.0, 1.0)
    }
}

/// One uniform white sample in [-1, 1]
#[inline]
pub fn white_sample(rng: &mut Pcg32) -> f32 {
    rng.gen_range(-1.0..=1.0)
}

/// Generate `len` samples of white noise
pub fn white_noise(rng: &mut Pcg32, len: usize) -> Vec<f32> {
    (0..len).map(|_| white_sample(rng)).collect()
}

/// Generate `len` samples of pink noise
pub fn pink_noise(rng: &mut Pcg32, len: usize) -> Vec<f32> {
    let mut filter = PinkFilter::new();
    (0..len).map(|_| filter.next(white_sample(rng))).collect()
}

/// Mono pink-noise buffer of `seconds` at `sample_rate`
pub fn pink_noise_buffer(rng: &mut Pcg32, sample_rate: u32, seconds: f32) -> AudioBuffer {
    let len = (sample_rate as f32 * seconds.max(0.0)).round() as usize;
    AudioBuffer::from_mono(pink_noise(rng, len), sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::rng::create_rng;

    #[test]
    fn test_pink_buffer_length_and_range() {
        let mut rng = create_rng(1);
        let buffer = pink_noise_buffer(&mut rng, 44100, 2.0);
        assert_eq!(buffer.num_samples(), 88200);
        assert_eq!(buffer.num_channels(), 1);
        assert!(buffer.channel(0).iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(buffer.peak() > 0.05);
    }

    #[test]
    fn test_pink_is_deterministic_for_seed() {
        let a = pink_noise(&mut create_rng(99), 1000);
        let b = pink_noise(&mut create_rng(99), 1000);
        let c = pink_noise(&mut create_rng(100), 1000);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_pink_has_less_high_frequency_energy_than_white() {
        // First difference acts as a crude high-pass
        fn diff_energy(x: &[f32]) -> f32 {
            let total: f32 = x.iter().map(|s| s * s).sum();
            let diff: f32 = x.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
            diff / total
        }
        let white = white_noise(&mut create_rng(5), 44100);
        let pink = pink_noise(&mut create_rng(5), 44100);
        assert!(diff_energy(&pink) < diff_energy(&white) * 0.5);
    }

    #[test]
    fn test_white_noise_range() {
        let noise = white_noise(&mut create_rng(3), 10_000);
        assert!(noise.iter().all(|s| (-1.0..=1.0).contains(s)));
        let mean = noise.iter().sum::<f32>() / noise.len() as f32;
        assert!(mean.abs() < 0.05);
    }
}
