use crate::session::SessionConfig;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub channel: ChannelSettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSettings {
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub transcribe_input: bool,
    pub transcribe_output: bool,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub capture_sample_rate: u32,
    pub playback_sample_rate: u32,
    pub frame_samples: usize,
    pub channels: u16,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: self.channel.endpoint.clone(),
            model: self.channel.model.clone(),
            voice: self.channel.voice.clone(),
            system_instruction: self.channel.system_instruction.clone(),
            transcribe_input: self.channel.transcribe_input,
            transcribe_output: self.channel.transcribe_output,
            capture_sample_rate: self.audio.capture_sample_rate,
            playback_sample_rate: self.audio.playback_sample_rate,
            frame_samples: self.audio.frame_samples,
            channels: self.audio.channels,
            ..SessionConfig::default()
        }
    }
}
