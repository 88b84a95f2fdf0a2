//! Wire protocol
//!
//! Commands arrive as `{ type, data, id? }` envelopes; replies are tagged by
//! `type`. Field names on the wire are camelCase.

use crate::engine::{AudioBuffer, InitOptions, ProcessedSpeech, SpeechOptions};
use crate::error::{Result, VoxscapeError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const INIT: &str = "init";
pub const PROCESS_CHARACTER_SPEECH: &str = "process_character_speech";
pub const START_ENVIRONMENTAL_AUDIO: &str = "start_environmental_audio";
pub const STOP_ENVIRONMENTAL_AUDIO: &str = "stop_environmental_audio";
pub const ADJUST_MASTER_VOLUME: &str = "adjust_master_volume";
pub const TRIGGER_SOUND_EFFECT: &str = "trigger_sound_effect";

/// Raw command as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Decode `data` for the command named by `type`
    ///
    /// An unrecognized type is not an error; it decodes to
    /// [`Command::Unknown`].
    pub fn decode(&self) -> Result<Command> {
        let command = match self.kind.as_str() {
            INIT => Command::Init(self.payload()?),
            PROCESS_CHARACTER_SPEECH => Command::ProcessCharacterSpeech(self.payload()?),
            START_ENVIRONMENTAL_AUDIO => {
                let ThemePayload { theme } = self.payload()?;
                Command::StartEnvironmentalAudio { theme }
            }
            STOP_ENVIRONMENTAL_AUDIO => Command::StopEnvironmentalAudio,
            ADJUST_MASTER_VOLUME => {
                let VolumePayload { volume } = self.payload()?;
                Command::AdjustMasterVolume { volume }
            }
            TRIGGER_SOUND_EFFECT => Command::TriggerSoundEffect(self.payload()?),
            other => Command::Unknown(other.to_string()),
        };
        Ok(command)
    }

    fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        // A missing payload reads as an empty object
        let data = match &self.data {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        serde_json::from_value(data).map_err(|e| VoxscapeError::MalformedCommand {
            command: self.kind.clone(),
            reason: e.to_string(),
        })
    }
}

/// `process_character_speech` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub audio_buffer: AudioBuffer,
    pub character_id: String,
    #[serde(default)]
    pub options: SpeechOptions,
}

/// `trigger_sound_effect` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEffectRequest {
    pub effect: String,
    #[serde(default)]
    pub options: SoundEffectOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundEffectOptions {
    pub volume: Option<f32>,
}

#[derive(Deserialize)]
struct ThemePayload {
    theme: String,
}

#[derive(Deserialize)]
struct VolumePayload {
    volume: f32,
}

/// Decoded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init(InitOptions),
    ProcessCharacterSpeech(SpeechRequest),
    StartEnvironmentalAudio { theme: String },
    StopEnvironmentalAudio,
    AdjustMasterVolume { volume: f32 },
    TriggerSoundEffect(SoundEffectRequest),
    Unknown(String),
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &str {
        match self {
            Command::Init(_) => INIT,
            Command::ProcessCharacterSpeech(_) => PROCESS_CHARACTER_SPEECH,
            Command::StartEnvironmentalAudio { .. } => START_ENVIRONMENTAL_AUDIO,
            Command::StopEnvironmentalAudio => STOP_ENVIRONMENTAL_AUDIO,
            Command::AdjustMasterVolume { .. } => ADJUST_MASTER_VOLUME,
            Command::TriggerSoundEffect(_) => TRIGGER_SOUND_EFFECT,
            Command::Unknown(name) => name,
        }
    }
}

/// Messages sent back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Emitted once when the worker starts, before any `init`
    AudioWorkerReady,
    AudioInitialized {
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
    },
    AudioError {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
    ProcessedSpeech {
        data: ProcessedSpeech,
        #[serde(default)]
        id: Option<Value>,
    },
    Ack {
        command: String,
        id: Value,
    },
    UnhandledCommand {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
}

impl Reply {
    /// Wire `type` of the reply
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::AudioWorkerReady => "audio_worker_ready",
            Reply::AudioInitialized { .. } => "audio_initialized",
            Reply::AudioError { .. } => "audio_error",
            Reply::ProcessedSpeech { .. } => "processed_speech",
            Reply::Ack { .. } => "ack",
            Reply::UnhandledCommand { .. } => "unhandled_command",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
