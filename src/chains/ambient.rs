//! Ambient chain
//!
//! Bus every ambience layer feeds: three-band EQ, downward expander, then a
//! convolution reverb that places the layers in one shared space.

use super::{ChainProcessor, Control};
use crate::dsp::{Band, Convolver, Effect, EffectParams, Expander, ExpanderParams, ThreeBandEq};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;
use serde_json::{json, Value};

const LOW_GAIN_DB: f32 = 2.0;
const MID_GAIN_DB: f32 = 0.0;
const HIGH_GAIN_DB: f32 = -3.0;
const REVERB_MIX: f32 = 0.35;

const CONTROLS: &[Control] = &[
    Control::LowGain,
    Control::MidGain,
    Control::HighGain,
    Control::ReverbMix,
];

pub struct AmbientChain {
    params: EffectParams,
    eq: ThreeBandEq,
    expander: Expander,
    convolver: Convolver,
}

impl AmbientChain {
    pub fn new(sample_rate: u32, impulse: &AudioBuffer) -> Result<Self> {
        Ok(Self {
            params: EffectParams::default(),
            eq: ThreeBandEq::new(LOW_GAIN_DB, MID_GAIN_DB, HIGH_GAIN_DB, sample_rate),
            expander: Expander::new(ExpanderParams::default(), sample_rate),
            convolver: Convolver::new(impulse, true)?.with_mix(REVERB_MIX),
        })
    }
}

impl Effect for AmbientChain {
    impl_effect_common!(AmbientChain, "ambient_chain", "Ambient");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        self.eq.process(buffer);
        self.expander.process(buffer);
        self.convolver.process(buffer);
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.eq.prepare(sample_rate);
        self.expander.prepare(sample_rate);
    }

    fn reset(&mut self) {
        self.eq.reset();
        self.expander.reset();
        self.convolver.reset();
    }

    fn get_params(&self) -> Value {
        json!({
            "eq": self.eq.get_params(),
            "expander": self.expander.get_params(),
            "convolver": self.convolver.get_params(),
            "enabled": self.params.enabled
        })
    }
}

impl ChainProcessor for AmbientChain {
    fn controls(&self) -> &'static [Control] {
        CONTROLS
    }

    fn control(&self, control: Control) -> Option<f32> {
        match control {
            Control::LowGain => Some(self.eq.gain_db(Band::Low)),
            Control::MidGain => Some(self.eq.gain_db(Band::Mid)),
            Control::HighGain => Some(self.eq.gain_db(Band::High)),
            Control::ReverbMix => Some(self.convolver.mix()),
            _ => None,
        }
    }

    fn apply_control(&mut self, control: Control, value: f32) -> bool {
        match control {
            Control::LowGain => self.eq.set_gain_db(Band::Low, value),
            Control::MidGain => self.eq.set_gain_db(Band::Mid, value),
            Control::HighGain => self.eq.set_gain_db(Band::High, value),
            Control::ReverbMix => self.convolver.set_mix(value),
            _ => return false,
        }
        true
    }

    fn stages(&self) -> Vec<&'static str> {
        vec![
            self.eq.effect_type(),
            self.expander.effect_type(),
            self.convolver.effect_type(),
        ]
    }

    fn tail_frames(&self) -> usize {
        self.convolver.latency() + self.convolver.ir_length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::SignalGenerator;

    #[test]
    fn test_reverb_extends_signal() {
        let ir = SignalGenerator::new(9, 22050).impulse_response("ir", 0.3);
        let mut chain = AmbientChain::new(22050, &ir).unwrap();
        chain.apply_control(Control::ReverbMix, 1.0);

        // A short burst followed by silence still rings afterwards
        let mut samples = vec![0.0; 8192];
        for (i, s) in samples.iter_mut().take(512).enumerate() {
            *s = (i as f32 * 0.2).sin() * 0.8;
        }
        let mut buffer = AudioBuffer::from_mono(samples, 22050);
        chain.process(&mut buffer);

        let tail: f32 = buffer.channel(0)[2048..4096].iter().map(|s| s.abs()).sum();
        assert!(tail > 0.0);
        assert!(buffer.is_finite());
    }

    #[test]
    fn test_eq_controls() {
        let ir = SignalGenerator::new(9, 22050).impulse_response("ir", 0.1);
        let mut chain = AmbientChain::new(22050, &ir).unwrap();
        assert_eq!(chain.control(Control::HighGain), Some(HIGH_GAIN_DB));
        assert!(chain.apply_control(Control::LowGain, 40.0));
        assert_eq!(chain.control(Control::LowGain), Some(24.0));
        assert!(!chain.apply_control(Control::Drive, 10.0));
    }
}
