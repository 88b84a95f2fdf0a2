//! Integration Tests
//!
//! End-to-end tests for the Voxscape engine: profiles, ambience, master
//! volume and voice routing through the public API.

use pretty_assertions::assert_eq;
use test_case::test_case;
use voxscape::chains::{ChainKind, Control};
use voxscape::engine::{AudioBuffer, AudioEngine, EngineState, InitOptions, SpeechOptions};
use voxscape::synth::SignalGenerator;
use voxscape::voices::{ProfileRegistry, VoiceCategory, VoiceEffect, PASSTHROUGH_ID};
use voxscape::{EngineConfig, VoxscapeError};

const SAMPLE_RATE: u32 = 22050;

fn test_config() -> EngineConfig {
    EngineConfig {
        sample_rate: SAMPLE_RATE,
        noise_seconds: 0.5,
        impulse_seconds: 0.25,
        layer_seconds: 0.5,
        ..EngineConfig::default()
    }
    .with_seed(2024)
}

fn ready_engine() -> AudioEngine {
    let mut engine = AudioEngine::new(test_config());
    engine.init(InitOptions::default()).unwrap();
    engine
}

/// Helper to create a test sine wave buffer
fn create_sine_buffer(frequency: f32, duration_secs: f32) -> AudioBuffer {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    let samples = (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            (std::f32::consts::TAU * frequency * t).sin() * 0.5
        })
        .collect();
    AudioBuffer::from_mono(samples, SAMPLE_RATE)
}

// === Profile Registry ===

#[test_case("quint", 0.85, 0.92, VoiceCategory::Gruff, &[] ; "quint")]
#[test_case("nedry", 1.08, 1.25, VoiceCategory::Nervous, &[] ; "nedry")]
#[test_case("hammond", 1.05, 1.05, VoiceCategory::Enthusiastic, &[] ; "hammond")]
#[test_case("muldoon", 0.95, 0.95, VoiceCategory::Military, &[VoiceEffect::Radio] ; "muldoon")]
#[test_case("mr_dna", 1.6, 1.15, VoiceCategory::Cartoon, &[VoiceEffect::Chorus] ; "mr_dna")]
fn test_known_profiles(
    id: &str,
    pitch: f32,
    rate: f32,
    category: VoiceCategory,
    effects: &[VoiceEffect],
) {
    let registry = ProfileRegistry::with_defaults();
    let profile = registry.lookup(id);
    assert_eq!(profile.id, id);
    assert_eq!(profile.pitch, pitch);
    assert_eq!(profile.rate, rate);
    assert_eq!(profile.category, category);
    assert_eq!(profile.effects, effects);
}

#[test]
fn test_unknown_profile_is_identity() {
    let registry = ProfileRegistry::with_defaults();
    let profile = registry.lookup("dennis_nedry_jr");
    assert_eq!(profile.id, PASSTHROUGH_ID);
    assert_eq!(profile.pitch, 1.0);
    assert_eq!(profile.rate, 1.0);
    assert!(profile.effects.is_empty());
}

// === Generators ===

#[test]
fn test_pink_noise_length_and_range() {
    let generator = SignalGenerator::new(99, 44100);
    let noise = generator.pink_noise("bed", 2.0);
    assert_eq!(noise.num_samples(), 44100 * 2);
    assert!(noise.channel(0).iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn test_generators_reproducible_with_seed() {
    let a = SignalGenerator::new(5, SAMPLE_RATE).impulse_response("ir", 0.2);
    let b = SignalGenerator::new(5, SAMPLE_RATE).impulse_response("ir", 0.2);
    assert_eq!(a, b);
}

// === Lifecycle ===

#[test]
fn test_init_reports_sample_rate() {
    let mut engine = AudioEngine::new(test_config());
    let sample_rate = engine
        .init(InitOptions {
            sample_rate: Some(48000),
            seed: None,
        })
        .unwrap();
    assert_eq!(sample_rate, 48000);
    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(engine.seed(), Some(2024));
}

#[test]
fn test_speech_before_init_not_ready() {
    let mut engine = AudioEngine::new(test_config());
    let err = engine
        .process_character_speech(create_sine_buffer(220.0, 0.1), "quint", &SpeechOptions::default())
        .unwrap_err();
    assert!(matches!(err, VoxscapeError::NotReady { .. }));
    assert!(err.is_recoverable());
}

// === Ambience ===

#[test]
fn test_theme_switch_leaves_only_new_layers() {
    let mut engine = ready_engine();
    assert_eq!(engine.start_environmental_audio("jaws").unwrap(), 4);
    assert_eq!(engine.start_environmental_audio("jurassic").unwrap(), 4);

    let ambience = engine.ambience().unwrap();
    assert_eq!(
        ambience.active_keys(),
        vec![
            "jurassic_birds",
            "jurassic_distant_roar",
            "jurassic_insects",
            "jurassic_rain"
        ]
    );
    assert_eq!(ambience.current_theme(), Some("jurassic"));
    assert_eq!(
        engine
            .chain(ChainKind::Ambient)
            .unwrap()
            .input()
            .active_connections(),
        4
    );
}

#[test]
fn test_stop_on_empty_registry() {
    let mut engine = ready_engine();
    engine.stop_environmental_audio().unwrap();
    engine.stop_environmental_audio().unwrap();
    assert_eq!(engine.ambience().unwrap().active_count(), 0);
}

#[test]
fn test_ambience_reaches_output() {
    let mut engine = ready_engine();
    engine.start_environmental_audio("jaws").unwrap();
    let block = engine.render(SAMPLE_RATE as usize / 2).unwrap();
    assert!(block.peak() > 0.0);
    assert!(block.peak() <= 1.0);

    engine.stop_environmental_audio().unwrap();
    // The reverb tail decays but the sources contribute nothing more
    for _ in 0..4 {
        engine.render(SAMPLE_RATE as usize / 2).unwrap();
    }
    let silent = engine.render(1024).unwrap();
    assert!(silent.peak() < 1e-3);
}

// === Master Volume ===

#[test]
fn test_master_volume_ramps_monotonically() {
    let mut engine = ready_engine();
    assert_eq!(engine.adjust_master_volume(0.5).unwrap(), 0.5);

    // Walk a copy of the master bus through the ramp window
    let mut master = engine.master().unwrap().clone();
    let ramp = master.ramp_samples();
    assert_eq!(ramp, 2205);

    let mut previous = master.current_gain();
    assert!((previous - 0.8).abs() < 1e-6);
    for _ in 0..ramp {
        let gain = master.next_gain();
        assert!(gain < previous);
        previous = gain;
    }
    assert_eq!(master.current_gain(), 0.5);
}

#[test]
fn test_master_volume_clamped_and_nan_rejected() {
    let mut engine = ready_engine();
    assert_eq!(engine.adjust_master_volume(7.0).unwrap(), 1.0);
    assert_eq!(engine.adjust_master_volume(-0.5).unwrap(), 0.0);
    assert!(matches!(
        engine.adjust_master_volume(f32::NAN),
        Err(VoxscapeError::InvalidParameter { .. })
    ));
}

// === Voice Routing ===

#[test]
fn test_muldoon_feeds_radio_chain() {
    let mut engine = ready_engine();
    let processed = engine
        .process_character_speech(create_sine_buffer(440.0, 0.25), "muldoon", &SpeechOptions::default())
        .unwrap();

    assert_eq!(processed.chains_applied, vec![VoiceEffect::Radio]);
    let radio = engine.chain(ChainKind::Radio).unwrap();
    assert_eq!(radio.input().total_connections(), 1);
    assert_eq!(radio.input().active_connections(), 0);
    assert_eq!(
        engine
            .chain(ChainKind::Underwater)
            .unwrap()
            .input()
            .total_connections(),
        0
    );
}

#[test]
fn test_chains_are_not_rebuilt_per_utterance() {
    let mut engine = ready_engine();
    for _ in 0..3 {
        engine
            .process_character_speech(
                create_sine_buffer(300.0, 0.1),
                "muldoon",
                &SpeechOptions { underwater: true },
            )
            .unwrap();
    }
    assert_eq!(engine.chain_build_count(ChainKind::Radio), 1);
    assert_eq!(engine.chain_build_count(ChainKind::Underwater), 1);
    assert_eq!(
        engine
            .chain(ChainKind::Radio)
            .unwrap()
            .input()
            .total_connections(),
        3
    );
}

#[test]
fn test_unknown_character_passes_through() {
    let mut engine = ready_engine();
    let input = create_sine_buffer(440.0, 0.1);
    let processed = engine
        .process_character_speech(input.clone(), "ghost", &SpeechOptions::default())
        .unwrap();
    assert_eq!(processed.voice_category, VoiceCategory::Neutral);
    assert_eq!(processed.audio.num_samples(), input.num_samples());
    assert!(processed.chains_applied.is_empty());
}

#[test]
fn test_chain_controls_through_engine() {
    let mut engine = ready_engine();
    let radio = engine.chain_mut(ChainKind::Radio).unwrap();
    radio.set_control(Control::HighpassCutoff, 500.0).unwrap();
    assert_eq!(radio.control(Control::HighpassCutoff).unwrap(), 500.0);
    assert!(matches!(
        radio.set_control(Control::ReverbMix, 0.5),
        Err(VoxscapeError::UnsupportedControl { .. })
    ));
}
