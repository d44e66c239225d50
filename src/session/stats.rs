use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics about a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether the session is currently connecting or active
    pub is_live: bool,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Capture frames received from the microphone
    pub frames_captured: usize,

    /// Encoded chunks handed to the channel
    pub chunks_sent: usize,

    /// Encoded chunks dropped because the channel was not ready
    pub chunks_dropped: usize,

    /// Synthesized audio chunks scheduled for playback
    pub audio_chunks_scheduled: usize,

    /// Completed conversation turns
    pub turns_completed: usize,

    /// Messages in the transcript log
    pub messages_count: usize,
}

/// Shared counters the event loop bumps while the session runs.
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub frames_captured: AtomicUsize,
    pub chunks_sent: AtomicUsize,
    pub chunks_dropped: AtomicUsize,
    pub audio_chunks_scheduled: AtomicUsize,
    pub turns_completed: AtomicUsize,
}

impl SessionCounters {
    pub fn reset(&self) {
        self.frames_captured.store(0, Ordering::SeqCst);
        self.chunks_sent.store(0, Ordering::SeqCst);
        self.chunks_dropped.store(0, Ordering::SeqCst);
        self.audio_chunks_scheduled.store(0, Ordering::SeqCst);
        self.turns_completed.store(0, Ordering::SeqCst);
    }
}
