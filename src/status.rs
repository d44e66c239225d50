//! Pipeline status reporting
//!
//! The session publishes human-readable state transitions and completed
//! messages to a write-only sink. The UI owns whatever happens after that;
//! the core never reads back.

use crate::transcript::Message;
use tracing::info;

/// Write-only sink for pipeline status strings and the ordered message log.
pub trait StatusSink: Send + Sync {
    /// Report a human-readable pipeline state ("Listening", "Speaking", ...).
    fn report(&self, status: &str);

    /// Append one completed message to the conversation log.
    fn push_message(&self, message: Message);
}

/// Status sink that logs through `tracing` (used by the CLI).
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn report(&self, status: &str) {
        info!("pipeline status: {}", status);
    }

    fn push_message(&self, message: Message) {
        info!("[{}] {}", message.speaker, message.text);
    }
}
