//! Worker Tests
//!
//! Drive a spawned audio worker over its channels the way a host would.

use serde_json::{json, Value};
use voxscape::worker::{spawn_worker, Envelope, Reply, WorkerHandle};
use voxscape::EngineConfig;

fn test_config() -> EngineConfig {
    EngineConfig {
        sample_rate: 22050,
        noise_seconds: 0.3,
        impulse_seconds: 0.2,
        layer_seconds: 0.3,
        ..EngineConfig::default()
    }
    .with_seed(77)
}

async fn started(config: EngineConfig) -> WorkerHandle {
    let mut worker = spawn_worker(config).unwrap();
    assert_eq!(worker.recv().await, Some(Reply::AudioWorkerReady));
    worker
}

async fn initialized() -> WorkerHandle {
    let mut worker = started(test_config()).await;
    worker.send(Envelope::new("init", Value::Null)).unwrap();
    assert_eq!(
        worker.recv().await,
        Some(Reply::AudioInitialized { sample_rate: 22050 })
    );
    worker
}

#[tokio::test]
async fn test_ready_then_initialized() {
    let mut worker = started(test_config()).await;
    worker
        .send_json(r#"{"type":"init","data":{"sampleRate":44100}}"#)
        .unwrap();
    assert_eq!(
        worker.recv().await,
        Some(Reply::AudioInitialized { sample_rate: 44100 })
    );

    // A second init re-acknowledges at the original rate
    worker
        .send_json(r#"{"type":"init","data":{"sampleRate":48000}}"#)
        .unwrap();
    assert_eq!(
        worker.recv().await,
        Some(Reply::AudioInitialized { sample_rate: 44100 })
    );
}

#[tokio::test]
async fn test_failed_init_can_be_resent() {
    let mut worker = started(test_config()).await;
    worker
        .send(Envelope::new("init", json!({ "sampleRate": 1 })))
        .unwrap();
    assert!(matches!(
        worker.recv().await,
        Some(Reply::AudioError { .. })
    ));

    worker.send(Envelope::new("init", Value::Null)).unwrap();
    assert_eq!(
        worker.recv().await,
        Some(Reply::AudioInitialized { sample_rate: 22050 })
    );
}

#[tokio::test]
async fn test_commands_processed_in_order() {
    let mut worker = initialized().await;

    worker
        .send(Envelope::new("start_environmental_audio", json!({ "theme": "jaws" })).with_id(1))
        .unwrap();
    worker
        .send(Envelope::new("mystery", Value::Null).with_id(2))
        .unwrap();
    worker
        .send(Envelope::new("adjust_master_volume", json!({ "volume": 0.5 })).with_id(3))
        .unwrap();
    worker
        .send(Envelope::new("stop_environmental_audio", Value::Null).with_id(4))
        .unwrap();

    // The unknown command is dropped without a reply
    for (id, command) in [
        (1, "start_environmental_audio"),
        (3, "adjust_master_volume"),
        (4, "stop_environmental_audio"),
    ] {
        assert_eq!(
            worker.recv().await,
            Some(Reply::Ack {
                command: command.to_string(),
                id: json!(id),
            })
        );
    }
}

#[tokio::test]
async fn test_processed_speech_reply() {
    let mut worker = initialized().await;
    let samples: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.03).sin() * 0.4).collect();
    worker
        .send_json(
            &json!({
                "type": "process_character_speech",
                "data": {
                    "audioBuffer": { "sampleRate": 22050, "channels": [samples] },
                    "characterId": "muldoon",
                    "options": { "underwater": true }
                },
                "id": "line-7"
            })
            .to_string(),
        )
        .unwrap();

    match worker.recv().await {
        Some(Reply::ProcessedSpeech { data, id }) => {
            assert_eq!(id, Some(json!("line-7")));
            assert_eq!(data.character_id, "muldoon");
            assert_eq!(data.rate, 0.95);
            assert!(data.audio.is_finite());

            let wire = serde_json::to_value(&data).unwrap();
            assert_eq!(wire["chainsApplied"], json!(["radio", "underwater"]));
            assert_eq!(wire["voiceCategory"], json!("military"));
            assert_eq!(wire["audio"]["sampleRate"], json!(22050));
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

#[tokio::test]
async fn test_unhandled_reply_when_enabled() {
    let mut config = test_config();
    config.reply_unhandled = true;
    let mut worker = started(config).await;

    worker
        .send(Envelope::new("warp_drive", Value::Null))
        .unwrap();
    assert_eq!(
        worker.recv().await,
        Some(Reply::UnhandledCommand {
            command: "warp_drive".to_string(),
            id: None,
        })
    );
}

#[tokio::test]
async fn test_shutdown_closes_replies() {
    let mut worker = initialized().await;
    worker
        .send(Envelope::new("start_environmental_audio", json!({ "theme": "jurassic" })))
        .unwrap();
    worker.shutdown();

    assert!(worker.send(Envelope::new("init", Value::Null)).is_err());
    assert_eq!(worker.recv().await, None);
}

#[test]
fn test_malformed_json_rejected_at_send() {
    let worker = spawn_worker(test_config()).unwrap();
    assert!(worker.send_json("{\"data\": 1}").is_err());
}
