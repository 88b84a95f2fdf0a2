//! WAV import
//!
//! Reads mono or stereo WAV files into an [`AudioBuffer`] at the file's own
//! sample rate. Conversion to the engine rate happens during voice
//! processing.

use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::engine::{AudioBuffer, ChannelLayout};
use crate::error::{Result, VoxscapeError};

/// Load a WAV file
///
/// # Errors
/// * `AudioRead` - the file is missing or not a readable WAV
/// * `InvalidAudio` - more than two channels or an unsupported bit depth
/// * `EmptyBuffer` - the file holds no samples
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let read_error = |source: hound::Error| VoxscapeError::AudioRead {
        path: path.display().to_string(),
        source,
    };

    let mut reader = WavReader::open(path).map_err(read_error)?;
    let spec = reader.spec();

    let layout = match spec.channels {
        1 => ChannelLayout::Mono,
        2 => ChannelLayout::Stereo,
        n => {
            return Err(VoxscapeError::InvalidAudio {
                reason: format!("{}-channel audio (only mono/stereo supported)", n),
            })
        }
    };

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(read_error)?,
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = (1_i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(read_error)?
        }
        (SampleFormat::Int, bits) => {
            return Err(VoxscapeError::InvalidAudio {
                reason: format!("{}-bit integer audio", bits),
            })
        }
    };

    if interleaved.is_empty() {
        return Err(VoxscapeError::EmptyBuffer);
    }
    AudioBuffer::from_interleaved(&interleaved, layout, spec.sample_rate)
}
