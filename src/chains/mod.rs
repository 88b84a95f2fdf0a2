//! Effect chain factory
//!
//! The three named chains (radio, underwater, ambient) plus the shared chorus
//! insert. Each is built exactly once per engine; asking the factory for a
//! chain again hands back the same instance. A chain exposes one input port,
//! processes buffers in place and offers a fixed set of named controls.

mod ambient;
mod radio;
mod underwater;

pub use ambient::AmbientChain;
pub use radio::RadioChain;
pub use underwater::UnderwaterChain;

use crate::dsp::{Chorus, ChorusParams, ConnectionId, Effect, InputPort};
use crate::engine::AudioBuffer;
use crate::error::{Result, VoxscapeError};
use crate::synth::SignalGenerator;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Which named chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainKind {
    Radio,
    Underwater,
    Ambient,
}

impl ChainKind {
    pub const ALL: [ChainKind; 3] = [ChainKind::Radio, ChainKind::Underwater, ChainKind::Ambient];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainKind::Radio => "radio",
            ChainKind::Underwater => "underwater",
            ChainKind::Ambient => "ambient",
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named tunable parameter of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Highpass corner in Hz
    HighpassCutoff,
    /// Lowpass corner (or modulation center) in Hz
    LowpassCutoff,
    /// Waveshaper saturation constant
    Drive,
    /// Static bed level (linear)
    NoiseGain,
    /// Cutoff modulation rate in Hz
    LfoRate,
    /// Cutoff modulation depth in Hz
    LfoDepth,
    /// Chorus wet/dry mix
    ChorusMix,
    /// Convolution wet/dry mix
    ReverbMix,
    /// Low shelf gain in dB
    LowGain,
    /// Mid peak gain in dB
    MidGain,
    /// High shelf gain in dB
    HighGain,
}

impl Control {
    pub fn as_str(&self) -> &'static str {
        match self {
            Control::HighpassCutoff => "highpass_cutoff",
            Control::LowpassCutoff => "lowpass_cutoff",
            Control::Drive => "drive",
            Control::NoiseGain => "noise_gain",
            Control::LfoRate => "lfo_rate",
            Control::LfoDepth => "lfo_depth",
            Control::ChorusMix => "chorus_mix",
            Control::ReverbMix => "reverb_mix",
            Control::LowGain => "low_gain",
            Control::MidGain => "mid_gain",
            Control::HighGain => "high_gain",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Internal processing graph behind a chain's single input
pub trait ChainProcessor: Effect {
    /// Controls this chain accepts, in display order
    fn controls(&self) -> &'static [Control];

    /// Current value of a control, or None if unsupported
    fn control(&self, control: Control) -> Option<f32>;

    /// Apply a (finite) control value; returns false if unsupported
    fn apply_control(&mut self, control: Control, value: f32) -> bool;

    /// Effect types of the internal stages, in signal order
    fn stages(&self) -> Vec<&'static str>;

    /// Frames of trailing silence needed to flush delayed output after input ends
    fn tail_frames(&self) -> usize {
        0
    }
}

/// A built chain: one input, one output, named controls
pub struct EffectChain {
    kind: ChainKind,
    input: InputPort,
    processor: Box<dyn ChainProcessor>,
    frames_processed: u64,
}

impl fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectChain")
            .field("kind", &self.kind)
            .field("input", &self.input)
            .field("stages", &self.processor.stages())
            .field("frames_processed", &self.frames_processed)
            .finish()
    }
}

impl EffectChain {
    fn new(kind: ChainKind, processor: Box<dyn ChainProcessor>) -> Self {
        Self {
            kind,
            input: InputPort::new(),
            processor,
            frames_processed: 0,
        }
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    /// The chain's only input
    pub fn input(&self) -> &InputPort {
        &self.input
    }

    /// Connect an upstream source to the input
    pub fn connect(&mut self) -> ConnectionId {
        self.input.connect()
    }

    /// Disconnect an upstream source; false if it was not connected
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.input.disconnect(id)
    }

    /// Run a buffer through the chain in place
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        self.processor.process(buffer);
        self.frames_processed += buffer.num_samples() as u64;
    }

    /// Frames the chain keeps ringing once its input goes silent
    pub fn tail_frames(&self) -> usize {
        self.processor.tail_frames()
    }

    /// Clear delay lines, envelopes and reverb tails
    pub fn reset(&mut self) {
        self.processor.reset();
    }

    /// Total frames pushed through the chain
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn controls(&self) -> &'static [Control] {
        self.processor.controls()
    }

    /// Current value of a control
    pub fn control(&self, control: Control) -> Result<f32> {
        self.processor
            .control(control)
            .ok_or_else(|| self.unsupported(control))
    }

    /// Set a control; values are clamped to the control's range
    pub fn set_control(&mut self, control: Control, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(VoxscapeError::InvalidParameter {
                param: control.to_string(),
                value: value.to_string(),
                expected: "a finite number".to_string(),
            });
        }
        if !self.processor.apply_control(control, value) {
            return Err(self.unsupported(control));
        }
        debug!("[CHAIN] {} {} = {}", self.kind, control, value);
        Ok(())
    }

    /// Effect types of the internal stages, in signal order
    pub fn stages(&self) -> Vec<&'static str> {
        self.processor.stages()
    }

    fn unsupported(&self, control: Control) -> VoxscapeError {
        VoxscapeError::UnsupportedControl {
            chain: self.kind.to_string(),
            control: control.to_string(),
        }
    }
}

/// Standalone chorus insert for voices that want chorus alone
#[derive(Debug)]
pub struct ChorusInsert {
    input: InputPort,
    chorus: Chorus,
}

impl ChorusInsert {
    fn new(sample_rate: u32) -> Self {
        Self {
            input: InputPort::new(),
            chorus: Chorus::new(
                ChorusParams {
                    base_delay_ms: 12.0,
                    depth_ms: 5.0,
                    rate_hz: 2.0,
                    feedback: 0.3,
                    mix: 0.5,
                },
                sample_rate,
            ),
        }
    }

    pub fn input(&self) -> &InputPort {
        &self.input
    }

    pub fn connect(&mut self) -> ConnectionId {
        self.input.connect()
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.input.disconnect(id)
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        self.chorus.process(buffer);
    }

    pub fn reset(&mut self) {
        self.chorus.reset();
    }

    pub fn mix(&self) -> f32 {
        self.chorus.settings().mix
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.chorus.set_mix(mix);
    }
}

/// Generator key of the radio static bed
pub const RADIO_STATIC_KEY: &str = "radio.static";
/// Generator key of the underwater impulse response
pub const UNDERWATER_IMPULSE_KEY: &str = "impulse.underwater";
/// Generator key of the ambient impulse response
pub const AMBIENT_IMPULSE_KEY: &str = "impulse.ambient";

/// Settings every chain is constructed from
#[derive(Debug, Clone, Copy)]
pub struct ChainSettings {
    pub sample_rate: u32,
    pub noise_seconds: f32,
    pub impulse_seconds: f32,
    pub generator: SignalGenerator,
}

/// Builds each chain once and owns it afterwards
#[derive(Debug)]
pub struct ChainFactory {
    settings: ChainSettings,
    chains: HashMap<ChainKind, EffectChain>,
    builds: HashMap<ChainKind, u32>,
    chorus: Option<ChorusInsert>,
    chorus_builds: u32,
}

impl ChainFactory {
    pub fn new(settings: ChainSettings) -> Self {
        Self {
            settings,
            chains: HashMap::new(),
            builds: HashMap::new(),
            chorus: None,
            chorus_builds: 0,
        }
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    /// Build `kind` on first call; later calls return the same chain
    pub fn build_chain(&mut self, kind: ChainKind) -> Result<&mut EffectChain> {
        match self.chains.entry(kind) {
            Entry::Occupied(entry) => {
                debug!("[FACTORY] {} chain already built", kind);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let chain = construct(kind, &self.settings)?;
                *self.builds.entry(kind).or_insert(0) += 1;
                info!("[FACTORY] Built {} chain: {:?}", kind, chain.stages());
                Ok(entry.insert(chain))
            }
        }
    }

    /// Build the chorus insert on first call; later calls return the same one
    pub fn build_chorus_insert(&mut self) -> &mut ChorusInsert {
        let sample_rate = self.settings.sample_rate;
        let builds = &mut self.chorus_builds;
        self.chorus.get_or_insert_with(|| {
            *builds += 1;
            info!("[FACTORY] Built chorus insert");
            ChorusInsert::new(sample_rate)
        })
    }

    /// Build every chain and the chorus insert
    pub fn build_all(&mut self) -> Result<()> {
        for kind in ChainKind::ALL {
            self.build_chain(kind)?;
        }
        self.build_chorus_insert();
        Ok(())
    }

    /// A built chain, if any
    pub fn chain(&self, kind: ChainKind) -> Option<&EffectChain> {
        self.chains.get(&kind)
    }

    pub fn chain_mut(&mut self, kind: ChainKind) -> Option<&mut EffectChain> {
        self.chains.get_mut(&kind)
    }

    pub fn chorus_insert(&self) -> Option<&ChorusInsert> {
        self.chorus.as_ref()
    }

    pub fn chorus_insert_mut(&mut self) -> Option<&mut ChorusInsert> {
        self.chorus.as_mut()
    }

    /// How many times `kind` has been constructed (0 or 1)
    pub fn build_count(&self, kind: ChainKind) -> u32 {
        self.builds.get(&kind).copied().unwrap_or(0)
    }

    pub fn chorus_build_count(&self) -> u32 {
        self.chorus_builds
    }
}

fn construct(kind: ChainKind, settings: &ChainSettings) -> Result<EffectChain> {
    let generator = &settings.generator;
    let processor: Box<dyn ChainProcessor> = match kind {
        ChainKind::Radio => {
            let bed = generator.pink_noise(RADIO_STATIC_KEY, settings.noise_seconds);
            Box::new(RadioChain::new(settings.sample_rate, bed))
        }
        ChainKind::Underwater => {
            let ir = generator.impulse_response(UNDERWATER_IMPULSE_KEY, settings.impulse_seconds);
            Box::new(UnderwaterChain::new(settings.sample_rate, &ir)?)
        }
        ChainKind::Ambient => {
            let ir = generator.impulse_response(AMBIENT_IMPULSE_KEY, settings.impulse_seconds);
            Box::new(AmbientChain::new(settings.sample_rate, &ir)?)
        }
    };
    Ok(EffectChain::new(kind, processor))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_settings() -> ChainSettings {
        ChainSettings {
            sample_rate: 22050,
            noise_seconds: 0.5,
            impulse_seconds: 0.25,
            generator: SignalGenerator::new(7, 22050),
        }
    }

    #[test]
    fn test_build_chain_is_idempotent() {
        let mut factory = ChainFactory::new(test_settings());
        let id = factory.build_chain(ChainKind::Radio).unwrap().connect();
        assert_eq!(factory.build_count(ChainKind::Radio), 1);

        let again = factory.build_chain(ChainKind::Radio).unwrap();
        // Same instance: the connection made on the first handle is visible
        assert!(again.input().is_connected(id));
        assert_eq!(factory.build_count(ChainKind::Radio), 1);
    }

    #[test]
    fn test_build_all() {
        let mut factory = ChainFactory::new(test_settings());
        factory.build_all().unwrap();
        factory.build_all().unwrap();
        for kind in ChainKind::ALL {
            assert_eq!(factory.build_count(kind), 1);
            assert_eq!(factory.chain(kind).unwrap().kind(), kind);
        }
        assert_eq!(factory.chorus_build_count(), 1);
    }

    #[test]
    fn test_stage_order() {
        let mut factory = ChainFactory::new(test_settings());
        factory.build_all().unwrap();
        assert_eq!(
            factory.chain(ChainKind::Radio).unwrap().stages(),
            vec!["biquad", "biquad", "waveshaper", "compressor"]
        );
        assert_eq!(
            factory.chain(ChainKind::Underwater).unwrap().stages(),
            vec!["biquad", "chorus", "convolver"]
        );
        assert_eq!(
            factory.chain(ChainKind::Ambient).unwrap().stages(),
            vec!["three_band_eq", "expander", "convolver"]
        );
    }

    #[test]
    fn test_unsupported_control() {
        let mut factory = ChainFactory::new(test_settings());
        let radio = factory.build_chain(ChainKind::Radio).unwrap();
        let err = radio.set_control(Control::ReverbMix, 0.5).unwrap_err();
        assert!(matches!(err, VoxscapeError::UnsupportedControl { .. }));
        assert!(radio.control(Control::LowGain).is_err());
        assert!(radio.set_control(Control::Drive, f32::NAN).is_err());
    }

    #[test]
    fn test_every_listed_control_round_trips() {
        let mut factory = ChainFactory::new(test_settings());
        factory.build_all().unwrap();
        for kind in ChainKind::ALL {
            let chain = factory.chain_mut(kind).unwrap();
            for &control in chain.controls() {
                let current = chain.control(control).unwrap();
                chain.set_control(control, current).unwrap();
                assert!((chain.control(control).unwrap() - current).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_chains_keep_output_finite() {
        let mut factory = ChainFactory::new(test_settings());
        factory.build_all().unwrap();
        for kind in ChainKind::ALL {
            let chain = factory.chain_mut(kind).unwrap();
            let mut buffer = AudioBuffer::from_mono(
                (0..4410).map(|i| (i as f32 * 0.07).sin() * 0.8).collect(),
                22050,
            );
            chain.process(&mut buffer);
            assert!(buffer.is_finite(), "{}", kind);
            assert!(buffer.peak() > 0.0, "{}", kind);
            assert_eq!(chain.frames_processed(), 4410);
        }
    }
}
