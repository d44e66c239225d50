//! Wire messages for the realtime conversational service
//!
//! The client sends a setup frame when the socket opens, then raw PCM input
//! chunks; the service streams back transcriptions, synthesized audio and
//! turn boundaries. All payload audio crosses the wire base64-encoded inside
//! JSON frames.

use crate::audio::EncodedChunk;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A decoded event from the realtime service, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// The service acknowledged the setup frame; the conversation is live.
    SessionOpened,
    PartialInputTranscript(String),
    PartialOutputTranscript(String),
    /// Synthesized 16-bit PCM at the service's output rate.
    AudioChunk(Vec<u8>),
    /// The user started speaking over the agent; flush playback.
    Interrupted,
    TurnComplete,
    SessionError(String),
    SessionClosed(String),
}

// ============================================================================
// Client -> service
// ============================================================================

/// Session setup, sent as the first frame after the socket opens.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub setup: SetupPayload,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPayload {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    /// Presence requests transcription of the corresponding stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<TranscriptionConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TranscriptionConfig {}

/// Streaming microphone audio.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    /// Base64-encoded payload
    pub data: String,
}

impl RealtimeInputMessage {
    pub fn for_chunk(chunk: &EncodedChunk) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: chunk.mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&chunk.data),
                }],
            },
        }
    }
}

// ============================================================================
// Service -> client
// ============================================================================

/// Everything the service can push down the socket.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<ServerContent>,
    pub error: Option<RemoteError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetupComplete {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub model_turn: Option<ModelTurn>,
    pub interrupted: Option<bool>,
    pub turn_complete: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Transcription {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelTurn {
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentPart {
    pub inline_data: Option<InlineData>,
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteError {
    pub message: String,
    pub code: Option<u32>,
}

impl ServerMessage {
    /// Flatten one wire frame into ordered events.
    ///
    /// Within a frame: transcriptions, then audio, then interruption, then
    /// turn completion. An interruption therefore supersedes audio carried in
    /// the same frame. Audio payloads that fail base64 decoding are dropped
    /// here; the rest of the frame still dispatches.
    pub fn into_events(self) -> Vec<ServerEvent> {
        let mut events = Vec::new();

        if self.setup_complete.is_some() {
            events.push(ServerEvent::SessionOpened);
        }

        if let Some(content) = self.server_content {
            if let Some(transcription) = content.input_transcription {
                if !transcription.text.is_empty() {
                    events.push(ServerEvent::PartialInputTranscript(transcription.text));
                }
            }
            if let Some(transcription) = content.output_transcription {
                if !transcription.text.is_empty() {
                    events.push(ServerEvent::PartialOutputTranscript(transcription.text));
                }
            }
            if let Some(turn) = content.model_turn {
                for part in turn.parts {
                    if let Some(inline) = part.inline_data {
                        match base64::engine::general_purpose::STANDARD.decode(&inline.data) {
                            Ok(bytes) => events.push(ServerEvent::AudioChunk(bytes)),
                            Err(e) => warn!("dropping undecodable audio payload: {}", e),
                        }
                    }
                }
            }
            if content.interrupted.unwrap_or(false) {
                events.push(ServerEvent::Interrupted);
            }
            if content.turn_complete.unwrap_or(false) {
                events.push(ServerEvent::TurnComplete);
            }
        }

        if let Some(error) = self.error {
            events.push(ServerEvent::SessionError(error.message));
        }

        events
    }
}
