//! Gapless playback scheduling for streamed audio chunks
//!
//! Synthesized audio arrives as an arrival-ordered stream of PCM chunks at
//! the service's output rate. The scheduler decodes each chunk and queues it
//! so that playback is contiguous: a chunk starts at `max(cursor, now)`,
//! where the cursor is the end of the previously scheduled chunk. A
//! voice-activity interruption halts and discards everything synchronously,
//! including sources that have not started yet.

use crate::error::{Result, VoiceError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Monotonic host playback clock, in seconds.
pub trait AudioClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock anchored at construction time.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Output device handle the scheduler drives.
///
/// The scheduler only ever hands a sink starts that are contiguous with its
/// queue tail, so sinks that can merely append (e.g. rodio) satisfy the
/// contract; `start` is informational for sinks that schedule on an absolute
/// clock.
pub trait PlaybackSink: Send {
    /// Queue decoded samples to begin at `start` seconds on the session clock.
    fn schedule(&mut self, id: u64, samples: Vec<i16>, sample_rate: u32, start: f64) -> Result<()>;

    /// Halt and discard everything queued, including sources not yet started.
    fn clear(&mut self);
}

/// Opens a fresh playback sink for each session start.
pub trait PlaybackFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn PlaybackSink>>;
}

/// One queued chunk: where it starts and ends on the session clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSource {
    pub id: u64,
    pub start: f64,
    pub end: f64,
}

pub struct PlaybackScheduler {
    sink: Box<dyn PlaybackSink>,
    clock: Arc<dyn AudioClock>,
    sample_rate: u32,
    /// Where the next chunk must begin to avoid a gap. None means "now".
    cursor: Option<f64>,
    sources: BTreeMap<u64, ScheduledSource>,
    next_id: u64,
}

impl PlaybackScheduler {
    pub fn new(sink: Box<dyn PlaybackSink>, clock: Arc<dyn AudioClock>, sample_rate: u32) -> Self {
        Self {
            sink,
            clock,
            sample_rate,
            cursor: None,
            sources: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Decode one received chunk and queue it back-to-back with prior audio.
    ///
    /// An undecodable chunk returns `Decode` and leaves the cursor and the
    /// source set untouched; the session drops the chunk and stays alive.
    pub fn schedule_chunk(&mut self, pcm: &[u8]) -> Result<ScheduledSource> {
        let samples = decode_pcm16(pcm)?;
        self.prune_completed();

        let duration = samples.len() as f64 / self.sample_rate as f64;
        let now = self.clock.now();
        let start = self.cursor.unwrap_or(now).max(now);
        let id = self.next_id;
        self.next_id += 1;

        self.sink.schedule(id, samples, self.sample_rate, start)?;

        let source = ScheduledSource {
            id,
            start,
            end: start + duration,
        };
        self.sources.insert(id, source);
        self.cursor = Some(source.end);
        debug!(
            "scheduled chunk {} at {:.3}s ({:.3}s long, {} pending)",
            id,
            start,
            duration,
            self.sources.len()
        );
        Ok(source)
    }

    /// Voice-activity interruption: silence everything immediately.
    ///
    /// The cursor is unset so the next chunk is scheduled relative to the
    /// current clock instant rather than a stale future time.
    pub fn interrupt(&mut self) {
        self.sink.clear();
        self.sources.clear();
        self.cursor = None;
    }

    /// A new turn's audio starts relative to "now", not the previous turn's tail.
    pub fn rebase(&mut self) {
        self.cursor = None;
    }

    /// Drop sources whose playback has finished on its own.
    pub fn prune_completed(&mut self) {
        let now = self.clock.now();
        self.sources.retain(|_, source| source.end > now);
    }

    pub fn cursor(&self) -> Option<f64> {
        self.cursor
    }

    /// Currently playing or pending sources, in schedule order.
    pub fn scheduled(&self) -> Vec<ScheduledSource> {
        self.sources.values().copied().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.sources.len()
    }
}

/// Interpret bytes as 16-bit little-endian PCM.
fn decode_pcm16(bytes: &[u8]) -> Result<Vec<i16>> {
    if bytes.is_empty() {
        return Err(VoiceError::Decode("empty audio payload".to_string()));
    }
    if bytes.len() % 2 != 0 {
        return Err(VoiceError::Decode(format!(
            "odd payload length {} for 16-bit samples",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}
