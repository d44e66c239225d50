use super::backend::AudioFrame;

/// A wire-ready block of encoded audio plus its format tag.
///
/// Owned by whoever currently holds it; the encoder hands each chunk to the
/// session transport exactly once.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Converts raw capture frames into 16-bit little-endian PCM chunks.
pub struct FrameEncoder {
    sample_rate: u32,
    mime_type: String,
}

impl FrameEncoder {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            mime_type: format!("audio/pcm;rate={}", sample_rate),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Encode one frame. The frame is consumed by this call in the sense that
    /// nothing retains it afterwards.
    pub fn encode(&self, frame: &AudioFrame) -> EncodedChunk {
        let mut data = Vec::with_capacity(frame.samples.len() * 2);
        for &sample in &frame.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            data.extend_from_slice(&value.to_le_bytes());
        }
        EncodedChunk {
            data,
            mime_type: self.mime_type.clone(),
        }
    }
}
