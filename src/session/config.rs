use crate::audio::CaptureConfig;
use crate::channel::{ChannelConfig, Modality};
use serde::{Deserialize, Serialize};

/// Configuration for one realtime voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// wss:// endpoint of the conversational service
    pub endpoint: String,

    /// Model identifier sent in the setup frame
    pub model: String,

    /// Voice used for synthesized replies
    pub voice: String,

    /// Optional system instruction text
    pub system_instruction: Option<String>,

    /// Request transcription of the user's speech
    pub transcribe_input: bool,

    /// Request transcription of the agent's speech
    pub transcribe_output: bool,

    /// Microphone sample rate (the service expects 16kHz input)
    pub capture_sample_rate: u32,

    /// Sample rate of synthesized audio from the service (typically 24kHz)
    pub playback_sample_rate: u32,

    /// Samples per capture frame (bounds capture latency)
    pub frame_samples: usize,

    /// Capture channel count (1 = mono)
    pub channels: u16,

    /// Capture device name; None picks the system default microphone
    pub capture_device: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            endpoint: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
            model: "models/gemini-2.0-flash-live-001".to_string(),
            voice: "Aoede".to_string(),
            system_instruction: None,
            transcribe_input: true,
            transcribe_output: true,
            capture_sample_rate: 16000,  // 16kHz mono input
            playback_sample_rate: 24000, // Synthesized output arrives at 24kHz
            frame_samples: 4096,
            channels: 1,
            capture_device: None,
        }
    }
}

impl SessionConfig {
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            voice: self.voice.clone(),
            system_instruction: self.system_instruction.clone(),
            response_modality: Modality::Audio,
            transcribe_input: self.transcribe_input,
            transcribe_output: self.transcribe_output,
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.capture_sample_rate,
            channels: self.channels,
            frame_samples: self.frame_samples,
            device: self.capture_device.clone(),
        }
    }
}
