//! Credential handling for the realtime service
//!
//! The session consults the store before connecting and again after an
//! authorization-class failure, so an expired key can be replaced before the
//! caller retries.

use crate::error::{Result, VoiceError};
use async_trait::async_trait;
use std::sync::Mutex;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether a credential is currently on hand.
    fn has_valid_credential(&self) -> bool;

    /// The credential itself, if any.
    fn credential(&self) -> Option<String>;

    /// Obtain a (new) credential. `Err(Authorization)` means the request was
    /// cancelled or nothing could be obtained.
    async fn request_credential(&self) -> Result<String>;
}

/// API key sourced from an environment variable.
pub struct EnvCredentialStore {
    var: String,
    cached: Mutex<Option<String>>,
}

impl EnvCredentialStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            cached: Mutex::new(None),
        }
    }

    fn read_env(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|key| !key.is_empty())
    }
}

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    fn has_valid_credential(&self) -> bool {
        self.credential().is_some()
    }

    fn credential(&self) -> Option<String> {
        if let Ok(cached) = self.cached.lock() {
            if cached.is_some() {
                return cached.clone();
            }
        }
        self.read_env()
    }

    async fn request_credential(&self) -> Result<String> {
        // Re-read the environment so a rotated key is picked up.
        match self.read_env() {
            Some(key) => {
                if let Ok(mut cached) = self.cached.lock() {
                    *cached = Some(key.clone());
                }
                Ok(key)
            }
            None => Err(VoiceError::Authorization(format!(
                "no credential available in ${}",
                self.var
            ))),
        }
    }
}
