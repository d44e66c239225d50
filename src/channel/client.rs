//! WebSocket client for the realtime conversational service
//!
//! One `connect` call opens one bidirectional conversation: the returned
//! handle carries a bounded sender for encoded input chunks and an ordered
//! receiver of decoded server events. Dropping the sender closes the socket.

use super::messages::{RealtimeInputMessage, ServerEvent, ServerMessage, SetupMessage};
use crate::audio::EncodedChunk;
use crate::error::{Result, VoiceError};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tracing::{debug, info, warn};

/// Roughly 8 seconds of input audio; beyond that the capture side drops
/// chunks rather than backing up against a live microphone.
const INPUT_QUEUE_CHUNKS: usize = 32;
const EVENT_QUEUE_DEPTH: usize = 256;

/// What the agent answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Audio,
    Text,
}

/// Connect-time configuration for one conversation.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// wss:// endpoint of the service
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: Option<String>,
    pub response_modality: Modality,
    pub transcribe_input: bool,
    pub transcribe_output: bool,
}

impl ChannelConfig {
    pub fn setup_message(&self) -> SetupMessage {
        use super::messages::*;
        SetupMessage {
            setup: SetupPayload {
                model: self.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec![match self.response_modality {
                        Modality::Audio => "AUDIO".to_string(),
                        Modality::Text => "TEXT".to_string(),
                    }],
                    speech_config: (self.response_modality == Modality::Audio).then(|| {
                        SpeechConfig {
                            voice_name: self.voice.clone(),
                        }
                    }),
                },
                system_instruction: self.system_instruction.as_ref().map(|text| {
                    SystemInstruction {
                        parts: vec![TextPart { text: text.clone() }],
                    }
                }),
                input_audio_transcription: self.transcribe_input.then(TranscriptionConfig::default),
                output_audio_transcription: self
                    .transcribe_output
                    .then(TranscriptionConfig::default),
            },
        }
    }
}

/// One live conversation: input chunk sender plus ordered event receiver.
pub struct ChannelHandle {
    pub input: mpsc::Sender<EncodedChunk>,
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Realtime channel collaborator boundary.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Open the channel. Resolves once the socket is up and setup is sent;
    /// the first event on the handle is the remote acknowledgement.
    async fn connect(&self, config: &ChannelConfig, credential: &str) -> Result<ChannelHandle>;
}

/// WebSocket implementation of the realtime channel.
pub struct WsChannel;

#[async_trait]
impl RealtimeChannel for WsChannel {
    async fn connect(&self, config: &ChannelConfig, credential: &str) -> Result<ChannelHandle> {
        let url = format!("{}?key={}", config.endpoint, credential);
        info!("connecting to realtime service at {}", config.endpoint);

        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(classify_handshake_error)?;

        let (mut ws_tx, mut ws_rx) = socket.split();

        let setup = serde_json::to_string(&config.setup_message())
            .map_err(|e| VoiceError::Connection(format!("failed to encode setup: {}", e)))?;
        ws_tx
            .send(WsMessage::Text(setup.into()))
            .await
            .map_err(|e| VoiceError::Connection(format!("failed to send setup: {}", e)))?;

        let (input_tx, mut input_rx) = mpsc::channel::<EncodedChunk>(INPUT_QUEUE_CHUNKS);
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(EVENT_QUEUE_DEPTH);

        // Writer: forward encoded chunks until the session drops the sender,
        // then close the socket.
        tokio::spawn(async move {
            while let Some(chunk) = input_rx.recv().await {
                let message = RealtimeInputMessage::for_chunk(&chunk);
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("failed to encode input chunk: {}", e);
                        continue;
                    }
                };
                if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_tx.send(WsMessage::Close(None)).await;
            debug!("channel writer finished");
        });

        // Reader: decode frames into events, in arrival order.
        tokio::spawn(async move {
            let mut close_reported = false;
            while let Some(frame) = ws_rx.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        if forward_frame(text.as_str(), &event_tx).await.is_err() {
                            return;
                        }
                    }
                    Ok(WsMessage::Binary(bytes)) => {
                        let Ok(text) = std::str::from_utf8(&bytes) else {
                            let _ = event_tx
                                .send(ServerEvent::SessionError(
                                    "non-UTF-8 server frame".to_string(),
                                ))
                                .await;
                            return;
                        };
                        if forward_frame(text, &event_tx).await.is_err() {
                            return;
                        }
                    }
                    Ok(WsMessage::Close(frame)) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by remote".to_string());
                        let _ = event_tx.send(ServerEvent::SessionClosed(reason)).await;
                        close_reported = true;
                        break;
                    }
                    Ok(_) => {} // ping/pong handled by tungstenite
                    Err(e) => {
                        let _ = event_tx.send(ServerEvent::SessionError(e.to_string())).await;
                        return;
                    }
                }
            }
            if !close_reported {
                let _ = event_tx
                    .send(ServerEvent::SessionClosed("connection ended".to_string()))
                    .await;
            }
            debug!("channel reader finished");
        });

        Ok(ChannelHandle {
            input: input_tx,
            events: event_rx,
        })
    }
}

/// Parse one text frame and forward its events. Err means the receiver is
/// gone or the frame was malformed enough to end the session.
async fn forward_frame(text: &str, event_tx: &mpsc::Sender<ServerEvent>) -> std::result::Result<(), ()> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(message) => {
            for event in message.into_events() {
                if event_tx.send(event).await.is_err() {
                    return Err(());
                }
            }
            Ok(())
        }
        Err(e) => {
            // A frame we cannot parse at all is a protocol failure.
            let _ = event_tx
                .send(ServerEvent::SessionError(format!(
                    "malformed server message: {}",
                    e
                )))
                .await;
            Err(())
        }
    }
}

fn classify_handshake_error(err: tungstenite::Error) -> VoiceError {
    match err {
        tungstenite::Error::Http(response) => {
            let status = response.status();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                VoiceError::Authorization(format!("handshake rejected with {}", status))
            } else {
                VoiceError::Connection(format!("handshake failed with {}", status))
            }
        }
        other => VoiceError::Connection(other.to_string()),
    }
}
