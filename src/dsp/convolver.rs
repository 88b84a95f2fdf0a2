//! Convolution reverb
//!
//! Uniformly partitioned overlap-add convolution. The impulse response is
//! cut into `block_size` partitions whose spectra are computed once; each
//! input block is transformed, pushed onto a frequency-domain delay line and
//! multiplied against every partition. Latency is one block.

use crate::dsp::effect::{Effect, EffectParams};
use crate::engine::AudioBuffer;
use crate::error::{Result, VoxscapeError};
use crate::impl_effect_common;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Default partition length in samples
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Calibration applied to normalized responses (-58 dB)
const GAIN_CALIBRATION: f32 = 0.00125;

/// Sample rate the calibration is defined at
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;

/// Floor for the measured response power
const MIN_POWER: f32 = 0.000125;

/// Loudness normalization scale for an impulse response
///
/// Measures the RMS power over all channels and returns the factor that
/// brings a normalized response to a consistent perceived level.
pub fn normalization_scale(ir: &AudioBuffer) -> f32 {
    let count = ir.num_channels() * ir.num_samples();
    if count == 0 {
        return 1.0;
    }
    let sum: f32 = ir
        .samples
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|s| s * s)
        .sum();
    let mut power = (sum / count as f32).sqrt();
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    let mut scale = GAIN_CALIBRATION / power;
    if ir.sample_rate > 0 {
        scale *= GAIN_CALIBRATION_SAMPLE_RATE / ir.sample_rate as f32;
    }
    scale
}

/// Per-channel streaming state
#[derive(Clone)]
struct ChannelState {
    ir_channel: usize,
    input_block: Vec<f32>,
    output_block: Vec<f32>,
    overlap: Vec<f32>,
    /// Spectra of past input blocks, newest at `head`
    history: Vec<Vec<Complex<f32>>>,
    head: usize,
    fill: usize,
}

impl ChannelState {
    fn new(ir_channel: usize, block_size: usize, partitions: usize) -> Self {
        let fft_size = block_size * 2;
        Self {
            ir_channel,
            input_block: vec![0.0; block_size],
            output_block: vec![0.0; block_size],
            overlap: vec![0.0; block_size],
            history: vec![vec![Complex::new(0.0, 0.0); fft_size]; partitions],
            head: 0,
            fill: 0,
        }
    }

    fn clear(&mut self) {
        self.input_block.iter_mut().for_each(|s| *s = 0.0);
        self.output_block.iter_mut().for_each(|s| *s = 0.0);
        self.overlap.iter_mut().for_each(|s| *s = 0.0);
        for spectrum in &mut self.history {
            spectrum.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
        }
        self.head = 0;
        self.fill = 0;
    }
}

/// Partitioned FFT convolver
#[derive(Clone)]
pub struct Convolver {
    params: EffectParams,
    block_size: usize,
    /// Partition spectra per impulse-response channel
    partitions: Vec<Vec<Vec<Complex<f32>>>>,
    ir_length: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    accumulator: Vec<Complex<f32>>,
    channels: Vec<ChannelState>,
    mix: f32,
    normalized: bool,
}

impl fmt::Debug for Convolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Convolver")
            .field("block_size", &self.block_size)
            .field("ir_length", &self.ir_length)
            .field("ir_channels", &self.partitions.len())
            .field("mix", &self.mix)
            .field("normalized", &self.normalized)
            .finish()
    }
}

impl Convolver {
    /// Create a convolver over `ir` with the default partition length
    pub fn new(ir: &AudioBuffer, normalize: bool) -> Result<Self> {
        Self::with_block_size(ir, normalize, DEFAULT_BLOCK_SIZE)
    }

    /// Create a convolver with an explicit partition length
    pub fn with_block_size(ir: &AudioBuffer, normalize: bool, block_size: usize) -> Result<Self> {
        if ir.is_empty() || ir.num_channels() == 0 {
            return Err(VoxscapeError::EmptyBuffer);
        }
        if block_size == 0 {
            return Err(VoxscapeError::InvalidParameter {
                param: "block_size".to_string(),
                value: "0".to_string(),
                expected: "at least 1 sample".to_string(),
            });
        }

        let fft_size = block_size * 2;
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let scale = if normalize {
            normalization_scale(ir)
        } else {
            1.0
        };

        let ir_length = ir.num_samples();
        let num_partitions = ir_length.div_ceil(block_size);
        let partitions = ir
            .samples
            .iter()
            .map(|channel| {
                channel
                    .chunks(block_size)
                    .map(|chunk| {
                        let mut spectrum = vec![Complex::new(0.0, 0.0); fft_size];
                        for (slot, &s) in spectrum.iter_mut().zip(chunk.iter()) {
                            *slot = Complex::new(s * scale, 0.0);
                        }
                        forward.process(&mut spectrum);
                        spectrum
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        debug_assert!(partitions.iter().all(|p| p.len() == num_partitions));

        let mut convolver = Self {
            params: EffectParams::default(),
            block_size,
            partitions,
            ir_length,
            forward,
            inverse,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            accumulator: vec![Complex::new(0.0, 0.0); fft_size],
            channels: Vec::new(),
            mix: 1.0,
            normalized: normalize,
        };
        convolver.ensure_channels(2);
        Ok(convolver)
    }

    /// Set the wet/dry mix (clamped to 0..=1)
    pub fn with_mix(mut self, mix: f32) -> Self {
        self.set_mix(mix);
        self
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Processing latency of the wet path in samples
    pub fn latency(&self) -> usize {
        self.block_size
    }

    /// Length of the loaded impulse response in samples
    pub fn ir_length(&self) -> usize {
        self.ir_length
    }

    fn ensure_channels(&mut self, count: usize) {
        let ir_channels = self.partitions.len();
        let num_partitions = self.partitions.first().map(|p| p.len()).unwrap_or(0);
        while self.channels.len() < count {
            let ch = self.channels.len();
            self.channels.push(ChannelState::new(
                ch % ir_channels,
                self.block_size,
                num_partitions,
            ));
        }
    }

    /// Run one block through the frequency-domain delay line
    fn convolve_block(&mut self, ch: usize) {
        let block_size = self.block_size;
        let fft_size = block_size * 2;
        let state = &mut self.channels[ch];
        let partitions = &self.partitions[state.ir_channel];
        let count = partitions.len();

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let s = if i < block_size { state.input_block[i] } else { 0.0 };
            *slot = Complex::new(s, 0.0);
        }
        self.forward.process(&mut self.scratch);
        state.history[state.head].copy_from_slice(&self.scratch);

        self.accumulator
            .iter_mut()
            .for_each(|c| *c = Complex::new(0.0, 0.0));
        for (p, partition) in partitions.iter().enumerate() {
            let spectrum = &state.history[(state.head + count - p) % count];
            for ((acc, x), h) in self
                .accumulator
                .iter_mut()
                .zip(spectrum.iter())
                .zip(partition.iter())
            {
                *acc += x * h;
            }
        }
        self.inverse.process(&mut self.accumulator);

        let norm = 1.0 / fft_size as f32;
        for i in 0..block_size {
            state.output_block[i] = self.accumulator[i].re * norm + state.overlap[i];
            state.overlap[i] = self.accumulator[i + block_size].re * norm;
        }
        state.head = (state.head + 1) % count;
    }
}

impl Effect for Convolver {
    impl_effect_common!(Convolver, "convolver", "Convolution Reverb");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        self.ensure_channels(buffer.num_channels());

        let wet = self.mix;
        let dry = 1.0 - self.mix;
        for ch in 0..buffer.num_channels() {
            for i in 0..buffer.num_samples() {
                let x = buffer.samples[ch][i];
                let state = &mut self.channels[ch];
                let y = state.output_block[state.fill];
                state.input_block[state.fill] = x;
                state.fill += 1;
                if state.fill == self.block_size {
                    state.fill = 0;
                    self.convolve_block(ch);
                }
                buffer.samples[ch][i] = dry * x + wet * y;
            }
        }
    }

    fn prepare(&mut self, _sample_rate: u32) {
        // The response is fixed at its own rate
    }

    fn reset(&mut self) {
        for state in &mut self.channels {
            state.clear();
        }
    }

    fn get_params(&self) -> Value {
        json!({
            "mix": self.mix,
            "block_size": self.block_size,
            "ir_length": self.ir_length,
            "ir_channels": self.partitions.len(),
            "normalized": self.normalized,
            "enabled": self.params.enabled
        })
    }
}
