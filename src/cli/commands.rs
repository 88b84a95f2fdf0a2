//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::ambience::{LayerBank, THEMES};
use crate::chains::{AMBIENT_IMPULSE_KEY, RADIO_STATIC_KEY, UNDERWATER_IMPULSE_KEY};
use crate::config::EngineConfig;
use crate::engine::buffer::{calculate_peak, calculate_rms, linear_to_db};
use crate::engine::{read_wav, AudioBuffer, AudioEngine, InitOptions, SpeechOptions};
use crate::error::Result;
use crate::synth::{entropy_seed, OneShot, SignalGenerator};
use crate::voices::ProfileRegistry;
use crate::worker::{spawn_worker, Reply};

/// Print every character profile.
pub fn list_profiles() -> Result<()> {
    let registry = ProfileRegistry::with_defaults();

    println!(
        "{:<10} {:>6} {:>6}  {:<13} {}",
        "ID", "PITCH", "RATE", "CATEGORY", "EFFECTS"
    );
    println!("{:-<60}", "");
    for profile in registry.list() {
        let effects: Vec<&str> = profile.effects.iter().map(|e| e.as_str()).collect();
        println!(
            "{:<10} {:>6.2} {:>6.2}  {:<13} {}",
            profile.id,
            profile.pitch,
            profile.rate,
            profile.category.as_str(),
            if effects.is_empty() {
                "-".to_string()
            } else {
                effects.join(" > ")
            }
        );
    }

    Ok(())
}

/// Run a WAV file through a character voice and print before/after levels.
pub fn speak(config: EngineConfig, input: &Path, character: &str, underwater: bool) -> Result<()> {
    info!("Processing {} as '{}'", input.display(), character);

    let audio = read_wav(input)?;
    print_levels("input", &audio);

    let mut engine = AudioEngine::new(config);
    engine.init(InitOptions::default())?;
    let processed =
        engine.process_character_speech(audio, character, &SpeechOptions { underwater })?;

    let chains: Vec<&str> = processed.chains_applied.iter().map(|e| e.as_str()).collect();
    println!(
        "Voice: {} ({}), pitch {:.2}, rate {:.2}",
        processed.character_id, processed.voice_category, processed.pitch, processed.rate
    );
    println!("Chains: {}", if chains.is_empty() { "none".to_string() } else { chains.join(" > ") });
    print_levels("output", &processed.audio);

    Ok(())
}

/// Render a theme and print per-second levels.
pub fn render_ambience(config: EngineConfig, theme: &str, seconds: u32) -> Result<()> {
    let mut engine = AudioEngine::new(config);
    let sample_rate = engine.init(InitOptions::default())?;

    let layers = engine.start_environmental_audio(theme)?;
    if layers == 0 {
        warn!("Theme '{}' has no layers; rendering silence", theme);
    }
    println!("Theme '{}': {} layers at {} Hz", theme, layers, sample_rate);

    for second in 0..seconds {
        let block = engine.render(sample_rate as usize)?;
        println!(
            "{:>4}s  peak {:>7.1} dB  rms {:>7.1} dB",
            second + 1,
            linear_to_db(calculate_peak(&block)),
            linear_to_db(calculate_rms(&block))
        );
    }

    engine.stop_environmental_audio()?;
    Ok(())
}

/// Print a SHA-256 digest of every generated buffer.
///
/// The same seed and sample rate always print the same digests.
pub fn fingerprint(config: EngineConfig) -> Result<()> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(entropy_seed);
    let generator = SignalGenerator::new(seed, config.sample_rate);
    println!("Seed {} at {} Hz", seed, config.sample_rate);

    let mut buffers = vec![
        (
            RADIO_STATIC_KEY.to_string(),
            generator.pink_noise(RADIO_STATIC_KEY, config.noise_seconds),
        ),
        (
            UNDERWATER_IMPULSE_KEY.to_string(),
            generator.impulse_response(UNDERWATER_IMPULSE_KEY, config.impulse_seconds),
        ),
        (
            AMBIENT_IMPULSE_KEY.to_string(),
            generator.impulse_response(AMBIENT_IMPULSE_KEY, config.impulse_seconds),
        ),
    ];

    let bank = LayerBank::generate(&generator, config.layer_seconds);
    for theme in THEMES {
        for key in theme.layer_keys() {
            if let Some(buffer) = bank.get(&key) {
                buffers.push((key, buffer.as_ref().clone()));
            }
        }
    }
    for shot in OneShot::ALL {
        buffers.push((shot.as_str().to_string(), generator.one_shot(shot)));
    }

    for (key, buffer) in &buffers {
        println!("{:<24} {}", key, digest(buffer));
    }
    Ok(())
}

/// JSON-lines session against a worker: commands on stdin, replies on stdout.
pub async fn session(config: EngineConfig) -> Result<()> {
    let mut worker = spawn_worker(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if let Err(e) = worker.send_json(&line) {
                        warn!("Skipped command: {}", e);
                    }
                }
                None => break,
            },
            Some(reply) = worker.recv() => print_reply(&reply)?,
        }
    }

    worker.shutdown();
    while let Some(reply) = worker.try_recv() {
        print_reply(&reply)?;
    }
    Ok(())
}

fn print_reply(reply: &Reply) -> Result<()> {
    println!("{}", reply.to_json()?);
    Ok(())
}

fn print_levels(label: &str, buffer: &AudioBuffer) {
    println!(
        "{:<6} {:.2}s, {} ch @ {} Hz, peak {:.1} dB, rms {:.1} dB",
        label,
        buffer.duration_secs(),
        buffer.num_channels(),
        buffer.sample_rate,
        linear_to_db(calculate_peak(buffer)),
        linear_to_db(calculate_rms(buffer))
    );
}

/// Hex SHA-256 of the little-endian sample bytes, channel by channel
pub fn digest(buffer: &AudioBuffer) -> String {
    let mut hasher = Sha256::new();
    for channel in &buffer.samples {
        for sample in channel {
            hasher.update(sample.to_le_bytes());
        }
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
