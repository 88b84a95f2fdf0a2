//! Audio Buffer Management
//!
//! Provides the core audio buffer type shared by the effect chains, the
//! ambience sources and the wire protocol.

use crate::error::{Result, VoxscapeError};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Default engine sample rate (44.1kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Lowest sample rate the engine accepts
pub const MIN_SAMPLE_RATE: u32 = 8000;

/// Highest sample rate the engine accepts
pub const MAX_SAMPLE_RATE: u32 = 192000;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `f32::NEG_INFINITY` for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Calculate the RMS level of an audio buffer in dB
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.num_channels() * buffer.num_samples();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak level of an audio buffer in dB
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    linear_to_db(buffer.peak())
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar 32-bit float audio buffer
///
/// Serialized on the wire as `{"sampleRate": 44100, "channels": [[...], [...]]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    #[serde(rename = "channels")]
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer at the default sample rate
    pub fn new(num_samples: usize, layout: ChannelLayout) -> Self {
        Self::with_sample_rate(num_samples, layout, DEFAULT_SAMPLE_RATE)
    }

    /// Create a silent buffer at the given sample rate
    pub fn with_sample_rate(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; layout.num_channels()],
            sample_rate,
        }
    }

    /// Create a mono buffer that takes ownership of `samples`
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: vec![samples],
            sample_rate,
        }
    }

    /// Create an audio buffer from interleaved sample data
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(VoxscapeError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Get the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_samples() as f64 / self.sample_rate as f64
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Set a sample; returns false if indices are out of bounds
    #[inline]
    pub fn set_sample(&mut self, channel: usize, index: usize, value: f32) -> bool {
        if let Some(ch) = self.samples.get_mut(channel) {
            if let Some(sample) = ch.get_mut(index) {
                *sample = value;
                return true;
            }
        }
        false
    }

    /// Validate a buffer received from a collaborator
    ///
    /// Checks that it has samples, a usable sample rate, equal channel
    /// lengths and only finite values.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(VoxscapeError::EmptyBuffer);
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(VoxscapeError::InvalidAudio {
                reason: format!("unsupported sample rate {} Hz", self.sample_rate),
            });
        }
        let len = self.num_samples();
        if self.samples.iter().any(|ch| ch.len() != len) {
            return Err(VoxscapeError::InvalidAudio {
                reason: "channels have different lengths".to_string(),
            });
        }
        if !self.is_finite() {
            return Err(VoxscapeError::InvalidAudio {
                reason: "buffer contains NaN or infinite samples".to_string(),
            });
        }
        Ok(())
    }

    /// Check that every sample is finite
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }

    /// Clamp every sample to [-1.0, 1.0]
    pub fn clamp(&mut self) {
        for sample in self.samples.iter_mut().flat_map(|ch| ch.iter_mut()) {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    /// Absolute peak across all channels (linear)
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Resample by a playback-rate factor using linear interpolation
    ///
    /// A rate above 1.0 raises pitch and shortens the buffer, the way a
    /// faster playback rate would. The sample rate is unchanged.
    pub fn resampled(&self, rate: f32) -> AudioBuffer {
        if (rate - 1.0).abs() < f32::EPSILON || rate <= 0.0 || self.is_empty() {
            return self.clone();
        }

        let in_len = self.num_samples();
        let out_len = ((in_len as f64) / rate as f64).floor().max(1.0) as usize;
        let samples = self
            .samples
            .iter()
            .map(|channel| {
                (0..out_len)
                    .map(|i| {
                        let pos = i as f64 * rate as f64;
                        let idx = pos.floor() as usize;
                        let frac = (pos - idx as f64) as f32;
                        let a = channel.get(idx).copied().unwrap_or(0.0);
                        let b = channel.get(idx + 1).copied().unwrap_or(a);
                        a + (b - a) * frac
                    })
                    .collect()
            })
            .collect();

        AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_buffer_is_silent() {
        let buffer = AudioBuffer::new(128, ChannelLayout::Stereo);
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.num_samples(), 128);
        assert_eq!(buffer.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_from_interleaved() {
        let buffer =
            AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4], ChannelLayout::Stereo, 48000)
                .unwrap();
        assert_eq!(buffer.channel(0), &[0.1, 0.3]);
        assert_eq!(buffer.channel(1), &[0.2, 0.4]);

        let bad = AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3], ChannelLayout::Stereo, 48000);
        assert!(bad.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_buffers() {
        let empty = AudioBuffer::new(0, ChannelLayout::Mono);
        assert!(matches!(empty.validate(), Err(VoxscapeError::EmptyBuffer)));

        let mut nan = AudioBuffer::new(4, ChannelLayout::Mono);
        nan.set_sample(0, 2, f32::NAN);
        assert!(nan.validate().is_err());

        let ragged = AudioBuffer {
            samples: vec![vec![0.0; 4], vec![0.0; 3]],
            sample_rate: 44100,
        };
        assert!(ragged.validate().is_err());

        let slow = AudioBuffer::with_sample_rate(4, ChannelLayout::Mono, 100);
        assert!(slow.validate().is_err());
    }

    #[test]
    fn test_resampled_changes_length() {
        let buffer = AudioBuffer::from_mono((0..100).map(|i| i as f32 / 100.0).collect(), 44100);
        let fast = buffer.resampled(2.0);
        assert_eq!(fast.num_samples(), 50);
        assert_relative_eq!(fast.channel(0)[10], 0.2, epsilon = 1e-6);

        let slow = buffer.resampled(0.5);
        assert_eq!(slow.num_samples(), 200);
        assert_relative_eq!(slow.channel(0)[1], 0.005, epsilon = 1e-6);

        let same = buffer.resampled(1.0);
        assert_eq!(same, buffer);
    }

    #[test]
    fn test_wire_format() {
        let buffer = AudioBuffer::from_mono(vec![0.5, -0.5], 22050);
        let json = serde_json::to_value(&buffer).unwrap();
        assert_eq!(json["sampleRate"], 22050);
        assert_eq!(json["channels"][0][1], -0.5);

        let back: AudioBuffer = serde_json::from_value(json).unwrap();
        assert_eq!(back, buffer);
    }

    #[test]
    fn test_db_conversions() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
        assert_relative_eq!(db_to_linear(-20.0), 0.1, epsilon = 1e-6);
        assert_relative_eq!(linear_to_db(0.1), -20.0, epsilon = 1e-4);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }
}
