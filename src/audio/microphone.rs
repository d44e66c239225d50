//! Microphone capture via cpal
//!
//! Captures f32 mono at the configured rate and emits fixed-size frames on a
//! bounded channel. The cpal data callback only moves samples into the
//! channel; encoding and transmission happen downstream so the callback never
//! waits on the network.

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig, CaptureFactory};
use crate::error::{Result, VoiceError};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Opens cpal microphone backends.
pub struct MicrophoneFactory;

impl CaptureFactory for MicrophoneFactory {
    fn open(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureBackend>> {
        Ok(Box::new(MicrophoneBackend::new(config.clone())?))
    }
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched from the backend that owns it, one
/// call at a time; it never crosses threads while in use.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

pub struct MicrophoneBackend {
    config: CaptureConfig,
    device: cpal::Device,
    stream: Option<SendableStream>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        let host = cpal::default_host();

        let device = match &config.device {
            Some(name) => {
                let mut found = None;
                let devices = host.input_devices().map_err(|e| {
                    VoiceError::DeviceUnavailable(format!("failed to enumerate devices: {}", e))
                })?;
                for device in devices {
                    if device.name().map(|n| n == *name).unwrap_or(false) {
                        found = Some(device);
                        break;
                    }
                }
                found.ok_or_else(|| VoiceError::DeviceUnavailable(name.clone()))?
            }
            None => host
                .default_input_device()
                .ok_or_else(|| VoiceError::DeviceUnavailable("no default input device".into()))?,
        };

        Ok(Self {
            config,
            device,
            stream: None,
        })
    }

    fn build_stream(&self, tx: mpsc::Sender<AudioFrame>) -> Result<cpal::Stream> {
        let stream_config = cpal::StreamConfig {
            channels: self.config.channels,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            error!("capture stream error: {}", err);
        };

        let frame_samples = self.config.frame_samples;
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;

        // Preferred path: f32 at the target rate. PipeWire/PulseAudio convert
        // transparently on most setups.
        let mut pending: Vec<f32> = Vec::with_capacity(frame_samples * 2);
        let mut emitted: u64 = 0;
        let frame_tx = tx.clone();
        let f32_stream = self.device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                pending.extend_from_slice(data);
                while pending.len() >= frame_samples {
                    let samples: Vec<f32> = pending.drain(..frame_samples).collect();
                    let frame = AudioFrame {
                        samples,
                        sample_rate,
                        channels,
                        timestamp_ms: emitted * 1000 / sample_rate as u64,
                    };
                    emitted += frame_samples as u64;
                    // Consumer lagging: drop rather than back up a live microphone
                    let _ = frame_tx.try_send(frame);
                }
            },
            err_callback,
            None,
        );
        if let Ok(stream) = f32_stream {
            return Ok(stream);
        }

        // Fallback: i16 input converted in software.
        let mut pending: Vec<f32> = Vec::with_capacity(frame_samples * 2);
        let mut emitted: u64 = 0;
        self.device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    pending.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                    while pending.len() >= frame_samples {
                        let samples: Vec<f32> = pending.drain(..frame_samples).collect();
                        let frame = AudioFrame {
                            samples,
                            sample_rate,
                            channels,
                            timestamp_ms: emitted * 1000 / sample_rate as u64,
                        };
                        emitted += frame_samples as u64;
                        let _ = tx.try_send(frame);
                    }
                },
                err_callback,
                None,
            )
            .map_err(map_build_error)
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> VoiceError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            VoiceError::DeviceUnavailable("device disappeared".into())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            VoiceError::DeviceUnavailable("requested capture format not supported".into())
        }
        cpal::BuildStreamError::BackendSpecific { err } => {
            let description = err.to_string();
            if description.to_ascii_lowercase().contains("denied") {
                VoiceError::PermissionDenied
            } else {
                VoiceError::DeviceUnavailable(description)
            }
        }
        other => VoiceError::DeviceUnavailable(other.to_string()),
    }
}

#[async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.stream.is_some() {
            return Err(VoiceError::DeviceUnavailable(
                "capture already running".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(16);
        let stream = self.build_stream(tx)?;
        stream
            .play()
            .map_err(|e| VoiceError::DeviceUnavailable(format!("failed to start stream: {}", e)))?;
        self.stream = Some(SendableStream(stream));
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.0.pause() {
                warn!("failed to pause capture stream on stop: {}", e);
            }
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}
