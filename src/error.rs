//! Error handling for Voxscape
//!
//! Every fallible operation returns [`VoxscapeError`]. Errors carry an error
//! code for the wire protocol and a recovery hint for the caller.

use thiserror::Error;

/// Result type alias for Voxscape operations
pub type Result<T> = std::result::Result<T, VoxscapeError>;

/// Main error type for Voxscape operations
#[derive(Error, Debug)]
pub enum VoxscapeError {
    // Lifecycle Errors
    #[error("Audio initialization failed: {reason}")]
    InitializationFailure { reason: String },

    #[error("Engine is not ready (state: {state})")]
    NotReady { state: String },

    // Command Errors
    #[error("Malformed command '{command}': {reason}")]
    MalformedCommand { command: String, reason: String },

    // Parameter Errors
    #[error("Invalid parameter: {param} = {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Control {control} is not available on the {chain} chain")]
    UnsupportedControl { chain: String, control: String },

    // Source Errors
    #[error("Source already stopped: {key}")]
    SourceAlreadyStopped { key: String },

    // Audio Errors
    #[error("Audio buffer is empty")]
    EmptyBuffer,

    #[error("Invalid audio: {reason}")]
    InvalidAudio { reason: String },

    #[error("Failed to read audio file: {path}")]
    AudioRead {
        path: String,
        #[source]
        source: hound::Error,
    },

    // Worker Errors
    #[error("Audio worker channel closed")]
    WorkerClosed,

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VoxscapeError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            VoxscapeError::InitializationFailure { .. } => "INITIALIZATION_FAILURE",
            VoxscapeError::NotReady { .. } => "NOT_READY",
            VoxscapeError::MalformedCommand { .. } => "MALFORMED_COMMAND",
            VoxscapeError::InvalidParameter { .. } => "INVALID_PARAMETER",
            VoxscapeError::UnsupportedControl { .. } => "UNSUPPORTED_CONTROL",
            VoxscapeError::SourceAlreadyStopped { .. } => "SOURCE_ALREADY_STOPPED",
            VoxscapeError::EmptyBuffer => "EMPTY_BUFFER",
            VoxscapeError::InvalidAudio { .. } => "INVALID_AUDIO",
            VoxscapeError::AudioRead { .. } => "AUDIO_READ_ERROR",
            VoxscapeError::WorkerClosed => "WORKER_CLOSED",
            VoxscapeError::Io(_) => "IO_ERROR",
            VoxscapeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can recover by resending the command
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VoxscapeError::InitializationFailure { .. }
                | VoxscapeError::NotReady { .. }
                | VoxscapeError::MalformedCommand { .. }
                | VoxscapeError::InvalidParameter { .. }
                | VoxscapeError::SourceAlreadyStopped { .. }
        )
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::InitializationFailure { .. } => "Resend the init command",
            Self::NotReady { .. } => "Send init before any other command",
            Self::MalformedCommand { .. } => "Check the command payload shape",
            Self::InvalidParameter { .. } => "Adjust the parameter to be within valid range",
            Self::UnsupportedControl { .. } => "List the chain's controls before setting one",
            Self::SourceAlreadyStopped { .. } => "Nothing to do, the source is already silent",
            Self::EmptyBuffer => "Supply at least one sample of audio",
            Self::AudioRead { .. } => "Check that the file exists and is a valid WAV file",
            Self::WorkerClosed => "Spawn a new audio worker",
            _ => "Check the error details and try again",
        }
    }
}
