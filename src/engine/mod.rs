//! Audio engine
//!
//! [`AudioEngine`] owns the whole processing graph: the chain factory, the
//! voice registry, the ambience manager, queued one-shots and the master
//! sink. It is an ordinary value; the host constructs it and calls `init`
//! before anything else.

pub mod buffer;
pub mod io;
pub mod lifecycle;
pub mod master;

pub use buffer::{AudioBuffer, ChannelLayout};
pub use io::read_wav;
pub use lifecycle::{EngineState, Lifecycle};
pub use master::MasterBus;

use crate::ambience::{AmbienceManager, LayerBank};
use crate::chains::{ChainFactory, ChainKind, ChainSettings, ChorusInsert, EffectChain};
use crate::config::EngineConfig;
use crate::dsp::BufferSource;
use crate::error::{Result, VoxscapeError};
use crate::synth::{entropy_seed, OneShot, SignalGenerator};
use crate::voices::{ProfileRegistry, VoiceCategory, VoiceEffect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Overrides accepted by `init`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitOptions {
    pub sample_rate: Option<u32>,
    pub seed: Option<u64>,
}

/// Per-utterance routing options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeechOptions {
    /// Also route through the underwater chain
    pub underwater: bool,
}

/// Speech after voice processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSpeech {
    pub character_id: String,
    pub voice_category: VoiceCategory,
    pub pitch: f32,
    /// Speaking-rate multiplier for synthesis timing
    pub rate: f32,
    /// Effects the audio passed through, in order
    pub chains_applied: Vec<VoiceEffect>,
    pub audio: AudioBuffer,
}

/// Everything built by a successful `init`
struct EngineCore {
    sample_rate: u32,
    seed: u64,
    factory: ChainFactory,
    profiles: ProfileRegistry,
    ambience: AmbienceManager,
    master: MasterBus,
    one_shots: HashMap<OneShot, Arc<AudioBuffer>>,
    queued: Vec<BufferSource>,
}

/// Character-voice and ambience engine
pub struct AudioEngine {
    config: EngineConfig,
    lifecycle: Lifecycle,
    core: Option<EngineCore>,
}

impl AudioEngine {
    /// Create an uninitialized engine
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::new(),
            core: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.lifecycle.state()
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    /// Sample rate of the built graph
    pub fn sample_rate(&self) -> Option<u32> {
        self.core.as_ref().map(|core| core.sample_rate)
    }

    /// Seed every generator was derived from
    pub fn seed(&self) -> Option<u64> {
        self.core.as_ref().map(|core| core.seed)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Build the graph; returns the engine sample rate
    ///
    /// Calling `init` again once ready re-acknowledges without rebuilding.
    /// On failure the engine returns to `Uninitialized` and may be retried.
    pub fn init(&mut self, options: InitOptions) -> Result<u32> {
        if !self.lifecycle.begin_init() {
            if let Some(core) = &self.core {
                return Ok(core.sample_rate);
            }
        }

        match self.build(&options) {
            Ok(core) => {
                let sample_rate = core.sample_rate;
                info!(
                    "[ENGINE] Initialized at {} Hz (seed {})",
                    sample_rate, core.seed
                );
                self.core = Some(core);
                self.lifecycle.complete();
                Ok(sample_rate)
            }
            Err(e) => {
                warn!("[ENGINE] Initialization failed: {}", e);
                self.core = None;
                self.lifecycle.fail();
                Err(VoxscapeError::InitializationFailure {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn build(&self, options: &InitOptions) -> Result<EngineCore> {
        let mut config = self.config.clone();
        if let Some(sample_rate) = options.sample_rate {
            config.sample_rate = sample_rate;
        }
        if options.seed.is_some() {
            config.seed = options.seed;
        }
        config.validate()?;

        let seed = match config.seed {
            Some(seed) => seed,
            None => {
                let seed = entropy_seed();
                info!("[ENGINE] No seed supplied, drew {} from entropy", seed);
                seed
            }
        };
        let generator = SignalGenerator::new(seed, config.sample_rate);

        let mut factory = ChainFactory::new(ChainSettings {
            sample_rate: config.sample_rate,
            noise_seconds: config.noise_seconds,
            impulse_seconds: config.impulse_seconds,
            generator,
        });
        factory.build_all()?;

        let bank = LayerBank::generate(&generator, config.layer_seconds);
        let one_shots = OneShot::ALL
            .into_iter()
            .map(|shot| (shot, Arc::new(generator.one_shot(shot))))
            .collect();

        Ok(EngineCore {
            sample_rate: config.sample_rate,
            seed,
            factory,
            profiles: ProfileRegistry::with_defaults(),
            ambience: AmbienceManager::new(bank),
            master: MasterBus::new(config.master_volume, config.volume_ramp_ms, config.sample_rate),
            one_shots,
            queued: Vec::new(),
        })
    }

    fn core_mut(&mut self) -> Result<&mut EngineCore> {
        let state = self.lifecycle.state();
        match self.core.as_mut() {
            Some(core) if state == EngineState::Ready => Ok(core),
            _ => Err(VoxscapeError::NotReady {
                state: state.to_string(),
            }),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Run speech through the character's voice effects and the master sink
    pub fn process_character_speech(
        &mut self,
        audio: AudioBuffer,
        character_id: &str,
        options: &SpeechOptions,
    ) -> Result<ProcessedSpeech> {
        let core = self.core_mut()?;
        audio.validate()?;

        let profile = core.profiles.lookup(character_id).clone();
        let mut route = profile.effects.clone();
        if options.underwater && !route.contains(&VoiceEffect::Underwater) {
            route.push(VoiceEffect::Underwater);
        }

        // Pitch as playback rate, converting to the engine rate in one pass
        let step = profile.pitch * audio.sample_rate as f32 / core.sample_rate as f32;
        let mut buffer = audio.resampled(step);
        buffer.sample_rate = core.sample_rate;

        for effect in &route {
            match effect {
                VoiceEffect::Radio => run_chain(&mut core.factory, ChainKind::Radio, &mut buffer)?,
                VoiceEffect::Underwater => {
                    run_chain(&mut core.factory, ChainKind::Underwater, &mut buffer)?
                }
                VoiceEffect::Chorus => run_insert(core.factory.build_chorus_insert(), &mut buffer),
            }
        }

        // A copy of the sink keeps the live stream's state untouched
        let mut sink = core.master.clone();
        sink.process(&mut buffer);

        debug!(
            "[ENGINE] Speech for '{}' ({}) through {:?}",
            character_id, profile.category, route
        );
        Ok(ProcessedSpeech {
            character_id: character_id.to_string(),
            voice_category: profile.category,
            pitch: profile.pitch,
            rate: profile.rate,
            chains_applied: route,
            audio: buffer,
        })
    }

    /// Replace the running ambience with `theme`'s layers
    pub fn start_environmental_audio(&mut self, theme: &str) -> Result<usize> {
        let core = self.core_mut()?;
        let chain = core.factory.build_chain(ChainKind::Ambient)?;
        Ok(core.ambience.start_theme(theme, chain))
    }

    /// Stop every ambience layer
    pub fn stop_environmental_audio(&mut self) -> Result<()> {
        let core = self.core_mut()?;
        let chain = core.factory.build_chain(ChainKind::Ambient)?;
        core.ambience.stop_all(chain);
        Ok(())
    }

    /// Ramp master volume to `volume` clamped to [0, 1]
    pub fn adjust_master_volume(&mut self, volume: f32) -> Result<f32> {
        if !volume.is_finite() {
            return Err(VoxscapeError::InvalidParameter {
                param: "volume".to_string(),
                value: volume.to_string(),
                expected: "a number between 0 and 1".to_string(),
            });
        }
        let core = self.core_mut()?;
        let target = core.master.set_volume(volume);
        debug!("[ENGINE] Master volume ramping to {}", target);
        Ok(target)
    }

    /// Queue a one-shot effect; unknown effects are a no-op
    ///
    /// Returns whether anything was queued.
    pub fn trigger_sound_effect(&mut self, effect: &str, volume: Option<f32>) -> Result<bool> {
        let core = self.core_mut()?;
        let Some(buffer) = OneShot::from_name(effect).and_then(|shot| core.one_shots.get(&shot))
        else {
            debug!("[ENGINE] Sound effect '{}' not implemented, ignored", effect);
            return Ok(false);
        };

        let gain = volume.unwrap_or(1.0).clamp(0.0, 1.0);
        let mut source = BufferSource::new(effect, Arc::clone(buffer), false).with_gain(gain);
        source.start();
        core.queued.push(source);
        Ok(true)
    }

    /// Pull `frames` of stereo output
    ///
    /// Ambience runs through the ambient chain, one-shots are added on top,
    /// and the sum goes through the master sink.
    pub fn render(&mut self, frames: usize) -> Result<AudioBuffer> {
        let core = self.core_mut()?;
        let mut out = AudioBuffer::with_sample_rate(frames, ChannelLayout::Stereo, core.sample_rate);

        core.ambience.render_into(&mut out);
        if let Some(chain) = core.factory.chain_mut(ChainKind::Ambient) {
            chain.process(&mut out);
        }

        for source in &mut core.queued {
            source.render_into(&mut out);
        }
        core.queued.retain(|source| source.is_playing());

        core.master.process(&mut out);
        Ok(out)
    }

    /// Stop ambience and drop queued one-shots
    pub fn shutdown(&mut self) {
        if let Some(core) = self.core.as_mut() {
            if let Some(chain) = core.factory.chain_mut(ChainKind::Ambient) {
                core.ambience.stop_all(chain);
            }
            core.queued.clear();
            info!("[ENGINE] Shut down");
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn chain(&self, kind: ChainKind) -> Option<&EffectChain> {
        self.core.as_ref().and_then(|core| core.factory.chain(kind))
    }

    pub fn chain_mut(&mut self, kind: ChainKind) -> Option<&mut EffectChain> {
        self.core
            .as_mut()
            .and_then(|core| core.factory.chain_mut(kind))
    }

    pub fn chorus_insert(&self) -> Option<&ChorusInsert> {
        self.core
            .as_ref()
            .and_then(|core| core.factory.chorus_insert())
    }

    /// How many times `kind` has been constructed
    pub fn chain_build_count(&self, kind: ChainKind) -> u32 {
        self.core
            .as_ref()
            .map(|core| core.factory.build_count(kind))
            .unwrap_or(0)
    }

    pub fn profiles(&self) -> Option<&ProfileRegistry> {
        self.core.as_ref().map(|core| &core.profiles)
    }

    pub fn ambience(&self) -> Option<&AmbienceManager> {
        self.core.as_ref().map(|core| &core.ambience)
    }

    pub fn master(&self) -> Option<&MasterBus> {
        self.core.as_ref().map(|core| &core.master)
    }

    /// One-shots still playing
    pub fn queued_effects(&self) -> usize {
        self.core
            .as_ref()
            .map(|core| core.queued.len())
            .unwrap_or(0)
    }
}

fn run_chain(factory: &mut ChainFactory, kind: ChainKind, buffer: &mut AudioBuffer) -> Result<()> {
    let chain = factory.build_chain(kind)?;
    let connection = chain.connect();
    chain.reset();
    // Offline speech has no following block, so pad with silence to let reverb ring out
    let tail = chain.tail_frames();
    if tail > 0 {
        for channel in &mut buffer.samples {
            channel.resize(channel.len() + tail, 0.0);
        }
    }
    chain.process(buffer);
    chain.disconnect(connection);
    Ok(())
}

fn run_insert(insert: &mut ChorusInsert, buffer: &mut AudioBuffer) {
    let connection = insert.connect();
    insert.reset();
    insert.process(buffer);
    insert.disconnect(connection);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::Control;

    fn test_config() -> EngineConfig {
        EngineConfig {
            sample_rate: 22050,
            noise_seconds: 0.5,
            impulse_seconds: 0.25,
            layer_seconds: 0.5,
            ..EngineConfig::default()
        }
        .with_seed(1234)
    }

    fn ready_engine() -> AudioEngine {
        let mut engine = AudioEngine::new(test_config());
        engine.init(InitOptions::default()).unwrap();
        engine
    }

    fn speech(len: usize) -> AudioBuffer {
        AudioBuffer::from_mono(
            (0..len).map(|i| (i as f32 * 0.05).sin() * 0.5).collect(),
            22050,
        )
    }

    #[test]
    fn test_init_transitions_to_ready() {
        let mut engine = AudioEngine::new(test_config());
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.init(InitOptions::default()).unwrap(), 22050);
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.seed(), Some(1234));
        for kind in ChainKind::ALL {
            assert_eq!(engine.chain_build_count(kind), 1);
        }
    }

    #[test]
    fn test_repeated_init_does_not_rebuild() {
        let mut engine = ready_engine();
        engine.init(InitOptions::default()).unwrap();
        engine
            .process_character_speech(speech(1000), "muldoon", &SpeechOptions::default())
            .unwrap();
        engine.init(InitOptions::default()).unwrap();
        assert_eq!(engine.chain_build_count(ChainKind::Radio), 1);
        assert_eq!(
            engine.chain(ChainKind::Radio).unwrap().input().total_connections(),
            1
        );
    }

    #[test]
    fn test_failed_init_can_be_retried() {
        let mut engine = AudioEngine::new(test_config());
        let err = engine
            .init(InitOptions {
                sample_rate: Some(100),
                seed: None,
            })
            .unwrap_err();
        assert!(matches!(err, VoxscapeError::InitializationFailure { .. }));
        assert_eq!(engine.state(), EngineState::Uninitialized);

        assert!(engine.init(InitOptions::default()).is_ok());
        assert!(engine.is_ready());
    }

    #[test]
    fn test_commands_before_init_are_rejected() {
        let mut engine = AudioEngine::new(test_config());
        assert!(matches!(
            engine.start_environmental_audio("jaws"),
            Err(VoxscapeError::NotReady { .. })
        ));
        assert!(engine.render(64).is_err());
        assert!(engine.adjust_master_volume(0.5).is_err());
    }

    #[test]
    fn test_pitch_resamples_speech() {
        let mut engine = ready_engine();
        let out = engine
            .process_character_speech(speech(16000), "mr_dna", &SpeechOptions::default())
            .unwrap();
        // 1.6x playback rate shortens the utterance
        assert!((9999..=10000).contains(&out.audio.num_samples()));
        assert_eq!(out.chains_applied, vec![VoiceEffect::Chorus]);
        assert_eq!(out.rate, 1.15);
        assert_eq!(engine.chorus_insert().unwrap().input().total_connections(), 1);
    }

    #[test]
    fn test_speech_is_converted_to_engine_rate() {
        let mut engine = ready_engine();
        let input = AudioBuffer::from_mono(vec![0.1; 44100], 44100);
        let out = engine
            .process_character_speech(input, "unknown", &SpeechOptions::default())
            .unwrap();
        assert_eq!(out.audio.sample_rate, 22050);
        assert_eq!(out.audio.num_samples(), 22050);
        assert!(out.chains_applied.is_empty());
    }

    #[test]
    fn test_underwater_option_appends_chain() {
        let mut engine = ready_engine();
        let out = engine
            .process_character_speech(
                speech(2048),
                "muldoon",
                &SpeechOptions { underwater: true },
            )
            .unwrap();
        assert_eq!(
            out.chains_applied,
            vec![VoiceEffect::Radio, VoiceEffect::Underwater]
        );
        assert!(out.audio.is_finite());
        assert!(out.audio.peak() <= 1.0);
    }

    fn underwater_line(engine: &mut AudioEngine, reverb_mix: f32) -> AudioBuffer {
        let chain = engine.chain_mut(ChainKind::Underwater).unwrap();
        chain.set_control(Control::ChorusMix, 0.0).unwrap();
        chain.set_control(Control::ReverbMix, reverb_mix).unwrap();
        engine
            .process_character_speech(speech(800), "ghost", &SpeechOptions { underwater: true })
            .unwrap()
            .audio
    }

    #[test]
    fn test_short_underwater_line_keeps_reverb_tail() {
        let mut engine = ready_engine();
        let wet = underwater_line(&mut engine, 0.4);
        let tail = engine.chain(ChainKind::Underwater).unwrap().tail_frames();
        assert!(tail > 1024);
        assert_eq!(wet.num_samples(), 800 + tail);

        let dry = underwater_line(&mut engine, 0.0);
        assert_eq!(dry.num_samples(), wet.num_samples());

        // Past the block delay only the reverb is still sounding
        let after = 800 + 1024;
        let peak = |s: &[f32]| s.iter().fold(0.0_f32, |m, x| m.max(x.abs()));
        let wet_tail = peak(&wet.channel(0)[after..]);
        let dry_tail = peak(&dry.channel(0)[after..]);
        assert!(wet_tail > 1e-3, "wet tail peak {}", wet_tail);
        assert!(dry_tail < 1e-5, "dry tail peak {}", dry_tail);
        assert!(wet.is_finite());
        assert!(wet.peak() <= 1.0);
    }

    #[test]
    fn test_reverb_tail_does_not_leak_into_next_line() {
        let mut engine = ready_engine();
        let first = underwater_line(&mut engine, 0.4);
        let second = underwater_line(&mut engine, 0.4);
        assert_eq!(first.num_samples(), second.num_samples());
        assert!(first
            .channel(0)
            .iter()
            .zip(second.channel(0))
            .all(|(a, b)| (a - b).abs() < 1e-4));
    }

    #[test]
    fn test_invalid_speech_buffer_rejected() {
        let mut engine = ready_engine();
        let empty = AudioBuffer::from_mono(Vec::new(), 22050);
        assert!(engine
            .process_character_speech(empty, "quint", &SpeechOptions::default())
            .is_err());
    }

    #[test]
    fn test_render_with_ambience_and_one_shot() {
        let mut engine = ready_engine();
        let silent = engine.render(512).unwrap();
        assert_eq!(silent.num_channels(), 2);

        engine.start_environmental_audio("jaws").unwrap();
        assert!(engine.trigger_sound_effect("impact", None).unwrap());
        assert!(!engine.trigger_sound_effect("laser_blast", None).unwrap());
        assert_eq!(engine.queued_effects(), 1);

        let out = engine.render(4096).unwrap();
        assert!(out.peak() > 0.0);
        assert!(out.peak() <= 1.0);

        // The impact is one second long
        engine.render(22050).unwrap();
        assert_eq!(engine.queued_effects(), 0);
    }

    #[test]
    fn test_shutdown_stops_ambience() {
        let mut engine = ready_engine();
        engine.start_environmental_audio("jurassic").unwrap();
        assert_eq!(engine.ambience().unwrap().active_count(), 4);
        engine.shutdown();
        assert_eq!(engine.ambience().unwrap().active_count(), 0);
        assert_eq!(
            engine.chain(ChainKind::Ambient).unwrap().input().active_connections(),
            0
        );
    }
}
