//! Synthetic impulse responses
//!
//! Each channel is an independent burst of noise under a cubic decay, after a
//! short random pre-delay of silence. The result is a plausible diffuse tail
//! without any recorded room.

use crate::engine::AudioBuffer;
use crate::synth::noise::white_sample;
use rand::Rng;
use rand_pcg::Pcg32;

/// Upper bound (exclusive) on the per-channel pre-delay in samples
pub const MAX_PREDELAY_SAMPLES: usize = 1000;

/// Generate a decaying noise impulse response
///
/// Sample `i` of a channel of length `n` is `u * (1 - i/n)^3` with `u`
/// uniform in [-1, 1], or zero while inside that channel's pre-delay.
pub fn impulse_response(
    rng: &mut Pcg32,
    sample_rate: u32,
    seconds: f32,
    channels: usize,
) -> AudioBuffer {
    let len = ((sample_rate as f32 * seconds.max(0.0)).round() as usize).max(1);
    let samples = (0..channels.max(1))
        .map(|_| {
            let predelay = rng.gen_range(0..MAX_PREDELAY_SAMPLES).min(len - 1);
            let mut channel = vec![0.0_f32; len];
            for (i, sample) in channel.iter_mut().enumerate().skip(predelay) {
                let decay = 1.0 - i as f32 / len as f32;
                *sample = white_sample(rng) * decay * decay * decay;
            }
            channel
        })
        .collect();

    AudioBuffer {
        samples,
        sample_rate,
    }
}
