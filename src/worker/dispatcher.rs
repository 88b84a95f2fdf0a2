//! Command dispatcher
//!
//! Decodes one envelope at a time, routes it to the engine and produces at
//! most one reply.

use super::protocol::{Command, Envelope, Reply};
use crate::config::EngineConfig;
use crate::engine::AudioEngine;
use crate::error::{Result, VoxscapeError};
use serde_json::Value;
use tracing::{debug, warn};

pub struct Dispatcher {
    engine: AudioEngine,
    reply_unhandled: bool,
    handled: u64,
}

impl Dispatcher {
    pub fn new(config: EngineConfig) -> Self {
        let reply_unhandled = config.reply_unhandled;
        Self {
            engine: AudioEngine::new(config),
            reply_unhandled,
            handled: 0,
        }
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }

    /// Envelopes handled so far, including dropped ones
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Parse and handle a JSON command
    pub fn handle_json(&mut self, text: &str) -> Option<Reply> {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => self.handle(envelope),
            Err(e) => {
                warn!("[DISPATCH] Unreadable command: {}", e);
                Some(Reply::AudioError {
                    error: VoxscapeError::from(e).to_string(),
                    id: None,
                })
            }
        }
    }

    /// Handle one command to completion
    pub fn handle(&mut self, envelope: Envelope) -> Option<Reply> {
        self.handled += 1;
        let Envelope { kind, id, .. } = &envelope;

        let command = match envelope.decode() {
            Ok(command) => command,
            Err(e) => {
                warn!("[DISPATCH] {}", e);
                return Some(error_reply(e, id.clone()));
            }
        };

        debug!("[DISPATCH] Handling {}", kind);
        match command {
            Command::Init(options) => Some(match self.engine.init(options) {
                Ok(sample_rate) => Reply::AudioInitialized { sample_rate },
                Err(e) => error_reply(e, id.clone()),
            }),
            Command::ProcessCharacterSpeech(request) => Some(
                match self.engine.process_character_speech(
                    request.audio_buffer,
                    &request.character_id,
                    &request.options,
                ) {
                    Ok(data) => Reply::ProcessedSpeech {
                        data,
                        id: id.clone(),
                    },
                    Err(e) => error_reply(e, id.clone()),
                },
            ),
            Command::StartEnvironmentalAudio { theme } => {
                let result = self.engine.start_environmental_audio(&theme).map(drop);
                acknowledge(kind, id, result)
            }
            Command::StopEnvironmentalAudio => {
                let result = self.engine.stop_environmental_audio();
                acknowledge(kind, id, result)
            }
            Command::AdjustMasterVolume { volume } => {
                let result = self.engine.adjust_master_volume(volume).map(drop);
                acknowledge(kind, id, result)
            }
            Command::TriggerSoundEffect(request) => {
                let result = self
                    .engine
                    .trigger_sound_effect(&request.effect, request.options.volume)
                    .map(drop);
                acknowledge(kind, id, result)
            }
            Command::Unknown(name) => {
                debug!("[DISPATCH] Dropped unknown command '{}'", name);
                self.reply_unhandled.then(|| Reply::UnhandledCommand {
                    command: name,
                    id: id.clone(),
                })
            }
        }
    }

    /// Stop ambience and queued effects
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }
}

fn error_reply(error: VoxscapeError, id: Option<Value>) -> Reply {
    Reply::AudioError {
        error: error.to_string(),
        id,
    }
}

/// `ack` when the caller supplied an id, `audio_error` on failure
fn acknowledge(command: &str, id: &Option<Value>, result: Result<()>) -> Option<Reply> {
    match result {
        Ok(()) => id.as_ref().map(|id| Reply::Ack {
            command: command.to_string(),
            id: id.clone(),
        }),
        Err(e) => {
            warn!("[DISPATCH] {} failed: {}", command, e);
            Some(error_reply(e, id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainKind;
    use crate::engine::EngineState;
    use serde_json::json;

    fn config() -> EngineConfig {
        EngineConfig {
            sample_rate: 22050,
            noise_seconds: 0.5,
            impulse_seconds: 0.2,
            layer_seconds: 0.5,
            ..EngineConfig::default()
        }
        .with_seed(5)
    }

    fn envelope(kind: &str, data: Value) -> Envelope {
        Envelope::new(kind, data)
    }

    fn ready() -> Dispatcher {
        let mut dispatcher = Dispatcher::new(config());
        dispatcher.handle(envelope("init", Value::Null));
        dispatcher
    }

    #[test]
    fn test_init_replies_with_sample_rate() {
        let mut dispatcher = Dispatcher::new(config());
        let reply = dispatcher.handle(envelope("init", json!({ "sampleRate": 32000 })));
        assert_eq!(reply, Some(Reply::AudioInitialized { sample_rate: 32000 }));
        assert_eq!(dispatcher.engine().state(), EngineState::Ready);
    }

    #[test]
    fn test_failed_init_reports_error() {
        let mut dispatcher = Dispatcher::new(config());
        let reply = dispatcher.handle(envelope("init", json!({ "sampleRate": 10 })));
        assert!(matches!(reply, Some(Reply::AudioError { .. })));
        assert_eq!(dispatcher.engine().state(), EngineState::Uninitialized);
    }

    #[test]
    fn test_ack_only_with_id() {
        let mut dispatcher = ready();
        let quiet = dispatcher.handle(envelope("start_environmental_audio", json!({ "theme": "jaws" })));
        assert_eq!(quiet, None);

        let acked = dispatcher.handle(envelope("stop_environmental_audio", Value::Null).with_id("s1"));
        assert_eq!(
            acked,
            Some(Reply::Ack {
                command: "stop_environmental_audio".to_string(),
                id: json!("s1"),
            })
        );
    }

    #[test]
    fn test_commands_before_init_report_error() {
        let mut dispatcher = Dispatcher::new(config());
        let reply = dispatcher.handle(envelope("adjust_master_volume", json!({ "volume": 0.5 })));
        match reply {
            Some(Reply::AudioError { error, .. }) => assert!(error.contains("not ready")),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_dropped() {
        let mut dispatcher = ready();
        assert_eq!(dispatcher.handle(envelope("self_destruct", Value::Null)), None);
        assert_eq!(dispatcher.handled(), 2);
    }

    #[test]
    fn test_unknown_command_reply_when_enabled() {
        let mut config = config();
        config.reply_unhandled = true;
        let mut dispatcher = Dispatcher::new(config);
        let reply = dispatcher.handle(envelope("self_destruct", Value::Null).with_id(3));
        assert_eq!(
            reply,
            Some(Reply::UnhandledCommand {
                command: "self_destruct".to_string(),
                id: Some(json!(3)),
            })
        );
    }

    #[test]
    fn test_speech_routes_through_radio() {
        let mut dispatcher = ready();
        let reply = dispatcher.handle_json(
            &json!({
                "type": "process_character_speech",
                "data": {
                    "audioBuffer": { "sampleRate": 22050, "channels": [vec![0.25_f32; 2048]] },
                    "characterId": "muldoon"
                },
                "id": "utt-1"
            })
            .to_string(),
        );

        match reply {
            Some(Reply::ProcessedSpeech { data, id }) => {
                assert_eq!(data.character_id, "muldoon");
                assert_eq!(id, Some(json!("utt-1")));
            }
            other => panic!("unexpected reply {:?}", other),
        }
        let radio = dispatcher.engine().chain(ChainKind::Radio).unwrap();
        assert_eq!(radio.input().total_connections(), 1);
    }

    #[test]
    fn test_unreadable_json_reports_error() {
        let mut dispatcher = ready();
        let reply = dispatcher.handle_json("{ not json");
        assert!(matches!(reply, Some(Reply::AudioError { id: None, .. })));
    }

    #[test]
    fn test_unknown_sound_effect_is_noop() {
        let mut dispatcher = ready();
        let reply = dispatcher.handle(
            envelope("trigger_sound_effect", json!({ "effect": "laser" })).with_id(1),
        );
        assert!(matches!(reply, Some(Reply::Ack { .. })));
        assert_eq!(dispatcher.engine().queued_effects(), 0);
    }
}
