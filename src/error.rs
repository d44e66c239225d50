use thiserror::Error;

/// Failure classes for a realtime voice session.
///
/// Device and connection failures are fatal for the session; a single
/// undecodable audio chunk is not (the chunk is dropped and playback
/// continues). Authorization failures additionally signal the credential
/// store to re-authorize before the caller retries.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no usable capture device: {0}")]
    DeviceUnavailable(String),

    #[error("realtime channel failure: {0}")]
    Connection(String),

    #[error("credential rejected: {0}")]
    Authorization(String),

    #[error("undecodable audio chunk: {0}")]
    Decode(String),

    #[error("playback output failure: {0}")]
    Playback(String),
}

pub type Result<T> = std::result::Result<T, VoiceError>;

/// Failure reasons the remote service flags as credential problems.
const AUTH_MARKERS: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "forbidden",
    "api key",
    "credential",
    "401",
    "403",
];

impl VoiceError {
    /// Classify a failure reason reported by the remote service or transport.
    pub fn from_remote_reason(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let lower = reason.to_ascii_lowercase();
        if AUTH_MARKERS.iter().any(|marker| lower.contains(marker)) {
            VoiceError::Authorization(reason)
        } else {
            VoiceError::Connection(reason)
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, VoiceError::Authorization(_))
    }

    /// Whether this failure ends the session (everything except a dropped chunk).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VoiceError::Decode(_))
    }
}
