//! Voxscape - Real-Time Character Voice and Ambience Engine
//!
//! Voxscape processes synthesized speech through per-character voice chains
//! and plays themed environmental ambience behind it.
//!
//! # Architecture
//!
//! - `dsp`: effect units (biquad, compressor, convolver, chorus, ...)
//! - `synth`: seeded procedural generators (pink noise, impulse responses,
//!   ambience textures)
//! - `chains`: the Radio, Underwater and Ambient effect chains, built once
//! - `voices`: the character profile registry
//! - `ambience`: themed layer sets feeding the Ambient chain
//! - `engine`: lifecycle, master sink and the command surface
//! - `worker`: wire protocol and the threaded command dispatcher

pub mod ambience;
pub mod chains;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod synth;
pub mod voices;
pub mod worker;

pub use config::EngineConfig;
pub use engine::{AudioBuffer, AudioEngine, EngineState, InitOptions, ProcessedSpeech, SpeechOptions};
pub use error::{Result, VoxscapeError};
pub use worker::{spawn_worker, Envelope, Reply, WorkerHandle};
