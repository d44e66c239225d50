pub mod client;
pub mod messages;

pub use client::{ChannelConfig, ChannelHandle, Modality, RealtimeChannel, WsChannel};
pub use messages::{RealtimeInputMessage, ServerEvent, ServerMessage, SetupMessage};
