//! Realtime voice session management
//!
//! This module provides the `VoiceSession` abstraction that manages:
//! - Microphone capture and PCM encoding
//! - The realtime channel to the conversational service
//! - Server event dispatch (transcripts, audio, interruptions)
//! - Gapless playback of synthesized replies
//! - Session state and statistics

mod config;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use session::{SessionIo, VoiceSession};
pub use state::SessionState;
pub use stats::SessionStats;
