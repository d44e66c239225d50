pub mod audio;
pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod session;
pub mod status;
pub mod transcript;

pub use audio::{
    AudioClock, AudioFrame, CaptureBackend, CaptureConfig, CaptureFactory, EncodedChunk,
    FrameEncoder, PlaybackFactory, PlaybackScheduler, PlaybackSink, ScheduledSource, SystemClock,
};
pub use auth::{CredentialStore, EnvCredentialStore};
pub use channel::{ChannelConfig, ChannelHandle, Modality, RealtimeChannel, ServerEvent, WsChannel};
pub use config::Config;
pub use error::VoiceError;
pub use session::{SessionConfig, SessionIo, SessionState, SessionStats, VoiceSession};
pub use status::{LogStatus, StatusSink};
pub use transcript::{Message, Speaker, TranscriptAggregator};

#[cfg(feature = "audio-io")]
pub use audio::{HostPlaybackFactory, MicrophoneFactory};
