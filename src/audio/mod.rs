pub mod backend;
pub mod encoder;
pub mod playback;

#[cfg(feature = "audio-io")]
pub mod microphone;
#[cfg(feature = "audio-io")]
pub mod output;

pub use backend::{AudioFrame, CaptureBackend, CaptureConfig, CaptureFactory};
pub use encoder::{EncodedChunk, FrameEncoder};
pub use playback::{
    AudioClock, PlaybackFactory, PlaybackScheduler, PlaybackSink, ScheduledSource, SystemClock,
};

#[cfg(feature = "audio-io")]
pub use microphone::MicrophoneFactory;
#[cfg(feature = "audio-io")]
pub use output::HostPlaybackFactory;
