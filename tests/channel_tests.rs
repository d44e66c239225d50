// Tests for the realtime channel wire format
//
// Setup and input frames must serialize the way the service expects, and
// inbound frames must flatten into events in a fixed order: transcriptions,
// audio, interruption, turn completion.

use aether_voice::channel::{ChannelConfig, Modality, RealtimeInputMessage, ServerEvent, ServerMessage};
use aether_voice::{EncodedChunk, VoiceError};
use base64::Engine;

fn test_config() -> ChannelConfig {
    ChannelConfig {
        endpoint: "wss://example.invalid/realtime".to_string(),
        model: "models/studio-live".to_string(),
        voice: "Aoede".to_string(),
        system_instruction: Some("Answer briefly.".to_string()),
        response_modality: Modality::Audio,
        transcribe_input: true,
        transcribe_output: true,
    }
}

#[test]
fn setup_message_carries_the_connect_config() {
    let json = serde_json::to_value(test_config().setup_message()).unwrap();

    assert_eq!(json["setup"]["model"], "models/studio-live");
    assert_eq!(
        json["setup"]["generationConfig"]["responseModalities"][0],
        "AUDIO"
    );
    assert_eq!(
        json["setup"]["generationConfig"]["speechConfig"]["voiceName"],
        "Aoede"
    );
    assert_eq!(
        json["setup"]["systemInstruction"]["parts"][0]["text"],
        "Answer briefly."
    );
    // Presence of the transcription objects requests transcription
    assert!(json["setup"]["inputAudioTranscription"].is_object());
    assert!(json["setup"]["outputAudioTranscription"].is_object());
}

#[test]
fn setup_message_omits_unrequested_fields() {
    let mut config = test_config();
    config.system_instruction = None;
    config.transcribe_input = false;
    config.transcribe_output = false;
    config.response_modality = Modality::Text;

    let json = serde_json::to_value(config.setup_message()).unwrap();

    assert_eq!(
        json["setup"]["generationConfig"]["responseModalities"][0],
        "TEXT"
    );
    assert!(json["setup"].get("systemInstruction").is_none());
    assert!(json["setup"].get("inputAudioTranscription").is_none());
    assert!(json["setup"].get("outputAudioTranscription").is_none());
    assert!(json["setup"]["generationConfig"].get("speechConfig").is_none());
}

#[test]
fn input_message_carries_base64_pcm_and_mime_tag() {
    let chunk = EncodedChunk {
        data: vec![1, 2, 3, 4],
        mime_type: "audio/pcm;rate=16000".to_string(),
    };

    let json = serde_json::to_value(RealtimeInputMessage::for_chunk(&chunk)).unwrap();
    let media = &json["realtimeInput"]["mediaChunks"][0];

    assert_eq!(media["mimeType"], "audio/pcm;rate=16000");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(media["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, vec![1, 2, 3, 4]);
}

#[test]
fn setup_complete_yields_session_opened() {
    let message: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
    assert_eq!(message.into_events(), vec![ServerEvent::SessionOpened]);
}

#[test]
fn server_content_flattens_in_dispatch_order() {
    let pcm = base64::engine::general_purpose::STANDARD.encode([0u8, 1, 2, 3]);
    let raw = format!(
        r#"{{
            "serverContent": {{
                "inputTranscription": {{"text": "turn up"}},
                "outputTranscription": {{"text": "done"}},
                "modelTurn": {{"parts": [{{"inlineData": {{"mimeType": "audio/pcm;rate=24000", "data": "{}"}}}}]}},
                "interrupted": true,
                "turnComplete": true
            }}
        }}"#,
        pcm
    );

    let message: ServerMessage = serde_json::from_str(&raw).unwrap();
    let events = message.into_events();

    assert_eq!(
        events,
        vec![
            ServerEvent::PartialInputTranscript("turn up".to_string()),
            ServerEvent::PartialOutputTranscript("done".to_string()),
            ServerEvent::AudioChunk(vec![0, 1, 2, 3]),
            ServerEvent::Interrupted,
            ServerEvent::TurnComplete,
        ]
    );
}

#[test]
fn undecodable_audio_payload_is_dropped_from_the_frame() {
    let raw = r#"{
        "serverContent": {
            "modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "!!not-base64!!"}}]},
            "turnComplete": true
        }
    }"#;

    let message: ServerMessage = serde_json::from_str(raw).unwrap();
    assert_eq!(message.into_events(), vec![ServerEvent::TurnComplete]);
}

#[test]
fn remote_error_yields_session_error() {
    let message: ServerMessage =
        serde_json::from_str(r#"{"error": {"message": "quota exceeded", "code": 429}}"#).unwrap();
    assert_eq!(
        message.into_events(),
        vec![ServerEvent::SessionError("quota exceeded".to_string())]
    );
}

#[test]
fn unknown_fields_are_tolerated() {
    let message: ServerMessage = serde_json::from_str(
        r#"{"usageMetadata": {"tokens": 12}, "serverContent": {"turnComplete": true}}"#,
    )
    .unwrap();
    assert_eq!(message.into_events(), vec![ServerEvent::TurnComplete]);
}

#[test]
fn credential_failures_are_classified_as_authorization() {
    assert!(VoiceError::from_remote_reason("API key not valid").is_authorization());
    assert!(VoiceError::from_remote_reason("401 Unauthorized").is_authorization());
    assert!(VoiceError::from_remote_reason("request forbidden (403)").is_authorization());
    assert!(!VoiceError::from_remote_reason("connection reset by peer").is_authorization());

    match VoiceError::from_remote_reason("connection reset by peer") {
        VoiceError::Connection(reason) => assert_eq!(reason, "connection reset by peer"),
        other => panic!("expected Connection, got {:?}", other),
    }
}
