//! CLI Module
//!
//! Command-line interface for the Voxscape engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Voxscape - character voice and ambience engine
#[derive(Parser, Debug)]
#[command(name = "voxscape")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed for the procedural generators
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Engine sample rate in Hz
    #[arg(long, global = true)]
    pub sample_rate: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the character voice profiles
    #[command(name = "profiles")]
    Profiles,

    /// Run a WAV file through a character's voice and print level stats
    #[command(name = "speak")]
    Speak {
        /// Input WAV file
        input: PathBuf,

        /// Character id
        #[arg(short = 'C', long)]
        character: String,

        /// Also route through the underwater chain
        #[arg(short, long)]
        underwater: bool,
    },

    /// Render an ambience theme and print per-second levels
    #[command(name = "ambience")]
    Ambience {
        /// Theme name (jaws, jurassic)
        theme: String,

        /// Seconds to render
        #[arg(short, long, default_value_t = 5)]
        seconds: u32,
    },

    /// Print SHA-256 digests of the generated buffers
    #[command(name = "fingerprint")]
    Fingerprint,

    /// Read JSON commands from stdin and print replies as JSON lines
    #[command(name = "session")]
    Session,
}
