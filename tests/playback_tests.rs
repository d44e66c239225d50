// Tests for the playback scheduler
//
// These drive the scheduler with a manual clock and a recording sink, so the
// cursor arithmetic and the scheduled-source set can be checked exactly:
// start times never decrease, intervals never overlap, and an interruption
// empties everything synchronously.

use aether_voice::{AudioClock, PlaybackScheduler, PlaybackSink, VoiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const OUTPUT_RATE: u32 = 24000;

struct ManualClock {
    time: Mutex<f64>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            time: Mutex::new(0.0),
        })
    }

    fn set(&self, time: f64) {
        *self.time.lock().unwrap() = time;
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        *self.time.lock().unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SinkCall {
    id: u64,
    samples: usize,
    start: f64,
}

#[derive(Default)]
struct SinkState {
    calls: Mutex<Vec<SinkCall>>,
    clears: AtomicUsize,
}

struct RecordingSink {
    state: Arc<SinkState>,
}

impl RecordingSink {
    fn new() -> (Box<dyn PlaybackSink>, Arc<SinkState>) {
        let state = Arc::new(SinkState::default());
        (
            Box::new(Self {
                state: Arc::clone(&state),
            }),
            state,
        )
    }
}

impl PlaybackSink for RecordingSink {
    fn schedule(
        &mut self,
        id: u64,
        samples: Vec<i16>,
        _sample_rate: u32,
        start: f64,
    ) -> Result<(), VoiceError> {
        self.state.calls.lock().unwrap().push(SinkCall {
            id,
            samples: samples.len(),
            start,
        });
        Ok(())
    }

    fn clear(&mut self) {
        self.state.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// PCM bytes for `seconds` of silence at the output rate.
fn chunk(seconds: f64) -> Vec<u8> {
    let samples = (seconds * OUTPUT_RATE as f64) as usize;
    vec![0u8; samples * 2]
}

#[test]
fn back_to_back_chunks_schedule_gaplessly() {
    let clock = ManualClock::new();
    let (sink, state) = RecordingSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, clock.clone(), OUTPUT_RATE);

    let first = scheduler.schedule_chunk(&chunk(0.5)).unwrap();
    let second = scheduler.schedule_chunk(&chunk(0.5)).unwrap();

    assert_eq!(first.start, 0.0);
    assert!((second.start - 0.5).abs() < 1e-9);
    assert!((scheduler.cursor().unwrap() - 1.0).abs() < 1e-9);

    let calls = state.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].samples, 12000);
    assert_eq!(calls[0].start, 0.0);
    assert!((calls[1].start - 0.5).abs() < 1e-9);
    assert!(calls[1].id > calls[0].id);
}

#[test]
fn start_times_never_decrease_and_never_overlap() {
    let clock = ManualClock::new();
    let (sink, _state) = RecordingSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, clock.clone(), OUTPUT_RATE);

    let durations = [0.1, 0.25, 0.05, 0.4, 0.2];
    let mut sources = Vec::new();
    for (i, &duration) in durations.iter().enumerate() {
        // Nudge the clock forward unevenly, as a real host clock would move
        clock.set(i as f64 * 0.03);
        sources.push(scheduler.schedule_chunk(&chunk(duration)).unwrap());
    }

    for pair in sources.windows(2) {
        assert!(pair[1].start >= pair[0].start, "start times must not decrease");
        assert!(
            pair[1].start >= pair[0].end - 1e-9,
            "scheduled intervals must not overlap"
        );
    }
}

#[test]
fn lagging_pipeline_schedules_at_now() {
    let clock = ManualClock::new();
    let (sink, _state) = RecordingSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, clock.clone(), OUTPUT_RATE);

    scheduler.schedule_chunk(&chunk(0.5)).unwrap();

    // The stream stalled; the clock has moved well past the queued audio
    clock.set(2.0);
    let late = scheduler.schedule_chunk(&chunk(0.5)).unwrap();

    assert_eq!(late.start, 2.0);
    assert!((scheduler.cursor().unwrap() - 2.5).abs() < 1e-9);
}

#[test]
fn interrupt_empties_the_set_and_resets_the_cursor() {
    let clock = ManualClock::new();
    let (sink, state) = RecordingSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, clock.clone(), OUTPUT_RATE);

    for _ in 0..3 {
        scheduler.schedule_chunk(&chunk(0.5)).unwrap();
    }
    assert_eq!(scheduler.pending_count(), 3);

    scheduler.interrupt();

    assert_eq!(scheduler.pending_count(), 0);
    assert_eq!(scheduler.cursor(), None);
    assert_eq!(state.clears.load(Ordering::SeqCst), 1);
}

#[test]
fn future_chunk_does_not_survive_interrupt() {
    let clock = ManualClock::new();
    let (sink, state) = RecordingSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, clock.clone(), OUTPUT_RATE);

    // First chunk plays [0.0, 0.5), second is queued for the future at 0.5
    scheduler.schedule_chunk(&chunk(0.5)).unwrap();
    let queued = scheduler.schedule_chunk(&chunk(0.5)).unwrap();
    assert!((queued.start - 0.5).abs() < 1e-9);

    // The user speaks over the agent at 0.2
    clock.set(0.2);
    scheduler.interrupt();
    assert_eq!(scheduler.pending_count(), 0);
    assert_eq!(state.clears.load(Ordering::SeqCst), 1);

    // The next chunk is scheduled relative to the clock instant, not the
    // stale future time
    let next = scheduler.schedule_chunk(&chunk(0.1)).unwrap();
    assert!((next.start - 0.2).abs() < 1e-9);
}

#[test]
fn rebase_starts_the_next_turn_from_now() {
    let clock = ManualClock::new();
    let (sink, _state) = RecordingSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, clock.clone(), OUTPUT_RATE);

    scheduler.schedule_chunk(&chunk(1.0)).unwrap();
    assert!((scheduler.cursor().unwrap() - 1.0).abs() < 1e-9);

    scheduler.rebase();
    assert_eq!(scheduler.cursor(), None);

    clock.set(3.0);
    let next = scheduler.schedule_chunk(&chunk(0.2)).unwrap();
    assert_eq!(next.start, 3.0);
}

#[test]
fn completed_sources_are_pruned() {
    let clock = ManualClock::new();
    let (sink, _state) = RecordingSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, clock.clone(), OUTPUT_RATE);

    scheduler.schedule_chunk(&chunk(0.5)).unwrap();
    scheduler.schedule_chunk(&chunk(0.5)).unwrap();
    assert_eq!(scheduler.pending_count(), 2);

    // First chunk has finished playing on its own
    clock.set(0.7);
    scheduler.prune_completed();
    assert_eq!(scheduler.pending_count(), 1);

    // Everything done
    clock.set(2.0);
    scheduler.prune_completed();
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn undecodable_chunk_is_rejected_without_side_effects() {
    let clock = ManualClock::new();
    let (sink, state) = RecordingSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, clock.clone(), OUTPUT_RATE);

    scheduler.schedule_chunk(&chunk(0.5)).unwrap();

    // Odd byte count cannot be 16-bit PCM
    let err = scheduler.schedule_chunk(&[0u8, 1, 2]).unwrap_err();
    assert!(matches!(err, VoiceError::Decode(_)));

    // Empty payloads are rejected too
    let err = scheduler.schedule_chunk(&[]).unwrap_err();
    assert!(matches!(err, VoiceError::Decode(_)));

    // Cursor and set are untouched by the failures
    assert!((scheduler.cursor().unwrap() - 0.5).abs() < 1e-9);
    assert_eq!(scheduler.pending_count(), 1);
    assert_eq!(state.calls.lock().unwrap().len(), 1);
}
