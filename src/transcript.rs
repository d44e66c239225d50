//! Turn transcript assembly
//!
//! The service streams partial transcriptions for both sides of the
//! conversation in arbitrary interleaving. This module accumulates them and
//! turns them into completed messages when the service signals the end of a
//! turn. The accumulators are the single source of truth at flush time; no
//! other component state is consulted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the conversation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Agent,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Agent => write!(f, "agent"),
        }
    }
}

/// One completed utterance, created only when a turn completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Assembles streamed partial transcriptions into completed turn messages.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    input: String,
    output: String,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a partial transcription of the user's speech.
    pub fn append_input(&mut self, text: &str) {
        self.input.push_str(text);
    }

    /// Append a partial transcription of the agent's speech.
    pub fn append_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Flush both accumulators into messages, user side first.
    ///
    /// Whitespace-only accumulators emit nothing. Both are empty afterwards,
    /// regardless of how the partials arrived interleaved.
    pub fn complete_turn(&mut self) -> Vec<Message> {
        let input = std::mem::take(&mut self.input);
        let output = std::mem::take(&mut self.output);

        let mut messages = Vec::new();
        let user_text = input.trim();
        if !user_text.is_empty() {
            messages.push(Message {
                speaker: Speaker::User,
                text: user_text.to_string(),
                timestamp: Utc::now(),
            });
        }
        let agent_text = output.trim();
        if !agent_text.is_empty() {
            messages.push(Message {
                speaker: Speaker::Agent,
                text: agent_text.to_string(),
                timestamp: Utc::now(),
            });
        }
        messages
    }

    /// Discard any partial transcription without emitting messages.
    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }

    /// The user-side text accumulated so far in the current turn.
    pub fn pending_input(&self) -> &str {
        &self.input
    }

    /// The agent-side text accumulated so far in the current turn.
    pub fn pending_output(&self) -> &str {
        &self.output
    }
}
