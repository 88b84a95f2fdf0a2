//! Radio chain
//!
//! Telephone-band voice: highpass, lowpass, waveshaping distortion and a
//! hard, fast compressor, with a looping pink-noise static bed added in
//! parallel.

use super::{ChainProcessor, Control};
use crate::dsp::{
    BiquadFilter, Compressor, CompressorParams, Effect, EffectParams, WaveShaper,
    DEFAULT_SATURATION,
};
use crate::engine::AudioBuffer;
use crate::impl_effect_common;
use serde_json::{json, Value};

const HIGHPASS_HZ: f32 = 300.0;
const LOWPASS_HZ: f32 = 3000.0;
const FILTER_Q: f32 = 0.707;

/// Static bed level (linear)
pub const STATIC_GAIN: f32 = 0.05;

const CONTROLS: &[Control] = &[
    Control::HighpassCutoff,
    Control::LowpassCutoff,
    Control::Drive,
    Control::NoiseGain,
];

pub struct RadioChain {
    params: EffectParams,
    highpass: BiquadFilter,
    lowpass: BiquadFilter,
    shaper: WaveShaper,
    compressor: Compressor,
    static_bed: AudioBuffer,
    static_pos: usize,
    static_gain: f32,
}

impl RadioChain {
    /// Build the chain around a pre-generated static bed
    pub fn new(sample_rate: u32, static_bed: AudioBuffer) -> Self {
        Self {
            params: EffectParams::default(),
            highpass: BiquadFilter::high_pass(HIGHPASS_HZ, FILTER_Q, sample_rate),
            lowpass: BiquadFilter::low_pass(LOWPASS_HZ, FILTER_Q, sample_rate),
            shaper: WaveShaper::new(DEFAULT_SATURATION),
            compressor: Compressor::new(CompressorParams::radio(), sample_rate),
            static_bed,
            static_pos: 0,
            static_gain: STATIC_GAIN,
        }
    }

    fn add_static(&mut self, buffer: &mut AudioBuffer) {
        let len = self.static_bed.num_samples();
        if len == 0 || self.static_gain <= 0.0 {
            return;
        }
        let bed = self.static_bed.channel(0);
        for frame in 0..buffer.num_samples() {
            let noise = bed[self.static_pos] * self.static_gain;
            for channel in &mut buffer.samples {
                channel[frame] += noise;
            }
            self.static_pos = (self.static_pos + 1) % len;
        }
    }
}

impl Effect for RadioChain {
    impl_effect_common!(RadioChain, "radio_chain", "Radio");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        self.highpass.process(buffer);
        self.lowpass.process(buffer);
        self.shaper.process(buffer);
        self.compressor.process(buffer);
        self.add_static(buffer);
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.highpass.prepare(sample_rate);
        self.lowpass.prepare(sample_rate);
        self.compressor.prepare(sample_rate);
    }

    fn reset(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
        self.compressor.reset();
        // The static bed keeps looping across lines
    }

    fn get_params(&self) -> Value {
        json!({
            "highpass": self.highpass.get_params(),
            "lowpass": self.lowpass.get_params(),
            "shaper": self.shaper.get_params(),
            "compressor": self.compressor.get_params(),
            "static_gain": self.static_gain,
            "enabled": self.params.enabled
        })
    }
}

impl ChainProcessor for RadioChain {
    fn controls(&self) -> &'static [Control] {
        CONTROLS
    }

    fn control(&self, control: Control) -> Option<f32> {
        match control {
            Control::HighpassCutoff => Some(self.highpass.frequency()),
            Control::LowpassCutoff => Some(self.lowpass.frequency()),
            Control::Drive => Some(self.shaper.saturation()),
            Control::NoiseGain => Some(self.static_gain),
            _ => None,
        }
    }

    fn apply_control(&mut self, control: Control, value: f32) -> bool {
        match control {
            Control::HighpassCutoff => self.highpass.set_frequency(value.clamp(20.0, 2000.0)),
            Control::LowpassCutoff => self.lowpass.set_frequency(value.clamp(500.0, 12000.0)),
            Control::Drive => self.shaper.set_saturation(value),
            Control::NoiseGain => self.static_gain = value.clamp(0.0, 1.0),
            _ => return false,
        }
        true
    }

    fn stages(&self) -> Vec<&'static str> {
        vec![
            self.highpass.effect_type(),
            self.lowpass.effect_type(),
            self.shaper.effect_type(),
            self.compressor.effect_type(),
        ]
    }
}
