//! Speaker output via rodio
//!
//! The scheduler guarantees contiguous start times, so appending to a rodio
//! sink yields gapless playback; `Sink::clear` gives the immediate halt an
//! interruption needs.

use super::playback::{PlaybackFactory, PlaybackSink};
use crate::error::{Result, VoiceError};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};
use std::time::Duration;

/// Opens rodio-backed playback sinks.
pub struct HostPlaybackFactory;

impl PlaybackFactory for HostPlaybackFactory {
    fn open(&self) -> Result<Box<dyn PlaybackSink>> {
        Ok(Box::new(RodioSink::new()?))
    }
}

pub struct RodioSink {
    _stream: OutputStream,
    sink: Sink,
}

impl RodioSink {
    pub fn new() -> Result<Self> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| VoiceError::Playback(format!("failed to open audio output: {}", e)))?;
        let sink = Sink::connect_new(stream.mixer());
        Ok(Self {
            _stream: stream,
            sink,
        })
    }
}

impl PlaybackSink for RodioSink {
    fn schedule(&mut self, _id: u64, samples: Vec<i16>, sample_rate: u32, _start: f64) -> Result<()> {
        self.sink.append(PcmSource::new(samples, sample_rate, 1));
        // clear() pauses the sink; make sure appended audio actually plays.
        self.sink.play();
        Ok(())
    }

    fn clear(&mut self) {
        self.sink.clear();
    }
}

/// Rodio source over a block of decoded 16-bit samples.
struct PcmSource {
    data: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    position: usize,
}

impl PcmSource {
    fn new(data: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            data,
            sample_rate,
            channels,
            position: 0,
        }
    }
}

impl Iterator for PcmSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position < self.data.len() {
            let sample = self.data[self.position];
            self.position += 1;
            Some(sample as f32 / 32768.0)
        } else {
            None
        }
    }
}

impl Source for PcmSource {
    fn current_span_len(&self) -> Option<usize> {
        Some(self.data.len() - self.position)
    }

    fn channels(&self) -> rodio::ChannelCount {
        self.channels
    }

    fn sample_rate(&self) -> rodio::SampleRate {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let per_second = self.sample_rate as u64 * self.channels as u64;
        let samples = self.data.len() as u64;
        Some(Duration::new(
            samples / per_second,
            ((samples % per_second) * 1_000_000_000 / per_second) as u32,
        ))
    }
}
