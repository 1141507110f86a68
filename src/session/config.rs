use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::audio::{AudioEncoding, DeviceConfig};
use crate::config::Config;
use crate::error::ConfigError;

/// What the model answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Text,
    Audio,
}

impl fmt::Display for ResponseModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseModality::Text => write!(f, "TEXT"),
            ResponseModality::Audio => write!(f, "AUDIO"),
        }
    }
}

impl FromStr for ResponseModality {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Ok(ResponseModality::Text),
            "AUDIO" => Ok(ResponseModality::Audio),
            other => Err(ConfigError::Invalid {
                field: "response_modality",
                reason: format!("expected TEXT or AUDIO, got {:?}", other),
            }),
        }
    }
}

/// Configuration for one live session
///
/// Built once before connecting and never changed while the session runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier, used in log spans
    pub session_id: String,

    /// Model to connect to (e.g. "gemini-live-2.5-flash-native-audio")
    pub model_id: String,

    /// Modalities the model should respond with
    pub response_modalities: Vec<ResponseModality>,

    /// System instruction sent with the session setup
    pub system_instruction: Option<String>,

    /// Prebuilt voice for audio responses
    pub voice: Option<String>,

    /// Capture sample rate (the Live API expects 16kHz)
    pub sample_rate: u32,

    /// Samples per captured frame
    pub frame_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            model_id: "gemini-live-2.5-flash-native-audio".to_string(),
            response_modalities: vec![ResponseModality::Audio],
            system_instruction: None,
            voice: Some("Puck".to_string()),
            sample_rate: 16000,
            frame_size: 1024,
        }
    }
}

impl SessionConfig {
    /// Build the session config from validated application settings
    pub fn from_settings(cfg: &Config) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let system_instruction = Some(cfg.system_instruction.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let voice = Some(cfg.voice.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            model_id: cfg.model_id.clone(),
            response_modalities: vec![cfg.response_modality.parse()?],
            system_instruction,
            voice,
            sample_rate: cfg.sample_rate,
            frame_size: cfg.chunk_size,
            ..Self::default()
        })
    }

    pub fn encoding(&self) -> AudioEncoding {
        AudioEncoding::mono(self.sample_rate)
    }

    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            sample_rate: self.sample_rate,
            channels: 1,
            frame_size: self.frame_size,
        }
    }
}

/// How the controller supervises the session
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Frames buffered between capture and send
    pub queue_capacity: usize,

    /// How long running activities get to stop once the session is closing
    pub shutdown_grace: Duration,

    /// Fail the receive loop when the server is silent this long (None = wait forever)
    pub stall_timeout: Option<Duration>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 5,
            shutdown_grace: Duration::from_secs(2),
            stall_timeout: None,
        }
    }
}

impl ControllerOptions {
    pub fn from_settings(cfg: &Config) -> Self {
        Self {
            queue_capacity: cfg.queue_capacity,
            shutdown_grace: Duration::from_millis(cfg.shutdown_grace_ms),
            stall_timeout: (cfg.stall_timeout_secs > 0)
                .then(|| Duration::from_secs(cfg.stall_timeout_secs)),
        }
    }
}
