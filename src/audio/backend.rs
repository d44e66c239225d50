use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One block of raw microphone samples (f32 linear, mono).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw samples in -1.0..1.0
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration of this frame in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Configuration for the capture pipeline
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture sample rate (the service expects 16kHz input)
    pub sample_rate: u32,
    /// Channel count (1 = mono)
    pub channels: u16,
    /// Samples per emitted frame (bounds capture latency)
    pub frame_samples: usize,
    /// Device name; None picks the system default microphone
    pub device: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz mono input
            channels: 1,
            frame_samples: 4096, // ~256ms of audio per frame
            device: None,
        }
    }
}

/// Microphone capture backend
///
/// `start` requests device access and begins emitting frames at a steady
/// cadence on the returned channel. The frame path must never block on
/// network I/O; downstream consumers drop chunks when they cannot keep up.
#[async_trait]
pub trait CaptureBackend: Send {
    /// Request device access and begin emitting frames.
    ///
    /// Fails with `PermissionDenied` when access is refused and
    /// `DeviceUnavailable` when no usable device exists.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device handle. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Opens a fresh capture backend for each session start.
pub trait CaptureFactory: Send + Sync {
    fn open(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureBackend>>;
}
