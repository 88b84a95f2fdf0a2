//! Underwater chain
//!
//! Resonant lowpass whose cutoff drifts with a slow LFO, then chorus, then
//! convolution against a synthetic impulse response.

use super::{ChainProcessor, Control};
use crate::dsp::{BiquadFilter, Chorus, ChorusParams, Convolver, Effect, EffectParams, Lfo};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;
use serde_json::{json, Value};

const CUTOFF_HZ: f32 = 800.0;
const RESONANCE_Q: f32 = 4.0;
const LFO_RATE_HZ: f32 = 0.3;
const LFO_DEPTH_HZ: f32 = 300.0;
const REVERB_MIX: f32 = 0.4;

/// Samples between cutoff coefficient updates
const MODULATION_INTERVAL: usize = 32;

const CONTROLS: &[Control] = &[
    Control::LowpassCutoff,
    Control::LfoRate,
    Control::LfoDepth,
    Control::ChorusMix,
    Control::ReverbMix,
];

pub struct UnderwaterChain {
    params: EffectParams,
    lowpass: BiquadFilter,
    cutoff_hz: f32,
    lfo: Lfo,
    chorus: Chorus,
    convolver: Convolver,
}

impl UnderwaterChain {
    pub fn new(sample_rate: u32, impulse: &AudioBuffer) -> Result<Self> {
        Ok(Self {
            params: EffectParams::default(),
            lowpass: BiquadFilter::low_pass(CUTOFF_HZ, RESONANCE_Q, sample_rate),
            cutoff_hz: CUTOFF_HZ,
            lfo: Lfo::new(LFO_RATE_HZ, LFO_DEPTH_HZ, sample_rate),
            chorus: Chorus::new(ChorusParams::default(), sample_rate),
            convolver: Convolver::new(impulse, true)?.with_mix(REVERB_MIX),
        })
    }

    /// Modulated cutoff at the current LFO phase
    fn modulated_cutoff(&self) -> f32 {
        (self.cutoff_hz + self.lfo.value()).max(40.0)
    }

    fn sweep_lowpass(&mut self, buffer: &mut AudioBuffer) {
        let len = buffer.num_samples();
        let mut start = 0;
        while start < len {
            let end = (start + MODULATION_INTERVAL).min(len);
            let cutoff = self.modulated_cutoff();
            self.lowpass.set_frequency(cutoff);
            for (ch, channel) in buffer.samples.iter_mut().enumerate() {
                for sample in &mut channel[start..end] {
                    *sample = self.lowpass.process_sample(*sample, ch);
                }
            }
            self.lfo.advance(end - start);
            start = end;
        }
    }
}

impl Effect for UnderwaterChain {
    impl_effect_common!(UnderwaterChain, "underwater_chain", "Underwater");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        self.sweep_lowpass(buffer);
        self.chorus.process(buffer);
        self.convolver.process(buffer);
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.lowpass.prepare(sample_rate);
        self.lfo.set_sample_rate(sample_rate);
        self.chorus.prepare(sample_rate);
    }

    fn reset(&mut self) {
        self.lowpass.reset();
        self.lfo.reset();
        self.chorus.reset();
        self.convolver.reset();
    }

    fn get_params(&self) -> Value {
        json!({
            "cutoff_hz": self.cutoff_hz,
            "q": RESONANCE_Q,
            "lfo_rate_hz": self.lfo.rate_hz(),
            "lfo_depth_hz": self.lfo.depth(),
            "chorus": self.chorus.get_params(),
            "convolver": self.convolver.get_params(),
            "enabled": self.params.enabled
        })
    }
}

impl ChainProcessor for UnderwaterChain {
    fn controls(&self) -> &'static [Control] {
        CONTROLS
    }

    fn control(&self, control: Control) -> Option<f32> {
        match control {
            Control::LowpassCutoff => Some(self.cutoff_hz),
            Control::LfoRate => Some(self.lfo.rate_hz()),
            Control::LfoDepth => Some(self.lfo.depth()),
            Control::ChorusMix => Some(self.chorus.settings().mix),
            Control::ReverbMix => Some(self.convolver.mix()),
            _ => None,
        }
    }

    fn apply_control(&mut self, control: Control, value: f32) -> bool {
        match control {
            Control::LowpassCutoff => self.cutoff_hz = value.clamp(100.0, 8000.0),
            Control::LfoRate => self.lfo.set_rate_hz(value.clamp(0.0, 20.0)),
            Control::LfoDepth => self.lfo.set_depth(value.clamp(0.0, 4000.0)),
            Control::ChorusMix => self.chorus.set_mix(value),
            Control::ReverbMix => self.convolver.set_mix(value),
            _ => return false,
        }
        true
    }

    fn stages(&self) -> Vec<&'static str> {
        vec![
            self.lowpass.effect_type(),
            self.chorus.effect_type(),
            self.convolver.effect_type(),
        ]
    }

    fn tail_frames(&self) -> usize {
        self.convolver.latency() + self.convolver.ir_length()
    }
}
