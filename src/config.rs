use serde::Deserialize;

use crate::error::ConfigError;
use crate::session::ResponseModality;

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a Principal Cloud Platform Engineer and tasked \
with helping your fellow Lead Engineer to grow and learn.";

/// Environment variables read for each setting, first match wins
const ENV_KEYS: &[(&str, &[&str])] = &[
    ("project_id", &["LIVE_PROJECT_ID", "GOOGLE_CLOUD_PROJECT"]),
    ("region", &["LIVE_REGION", "GOOGLE_CLOUD_REGION"]),
    ("model_id", &["LIVE_MODEL_ID", "MODEL_ID"]),
    ("chunk_size", &["LIVE_CHUNK_SIZE", "CHUNK_SIZE"]),
    ("sample_rate", &["LIVE_SAMPLE_RATE", "SAMPLE_RATE"]),
    ("response_modality", &["LIVE_RESPONSE_MODALITY", "RESPONSE_MODALITY"]),
    ("system_instruction", &["LIVE_SYSTEM_INSTRUCTION", "SYSTEM_INSTRUCTION"]),
    ("voice", &["LIVE_VOICE", "VOICE"]),
    ("access_token", &["LIVE_ACCESS_TOKEN", "GOOGLE_ACCESS_TOKEN"]),
    ("queue_capacity", &["LIVE_QUEUE_CAPACITY"]),
    ("output_sample_rate", &["LIVE_OUTPUT_SAMPLE_RATE"]),
    ("connect_timeout_secs", &["LIVE_CONNECT_TIMEOUT_SECS"]),
    ("stall_timeout_secs", &["LIVE_STALL_TIMEOUT_SECS"]),
    ("shutdown_grace_ms", &["LIVE_SHUTDOWN_GRACE_MS"]),
    ("log_format", &["LIVE_LOG_FORMAT"]),
];

/// Application settings
///
/// Layered as: built-in defaults, optional config file, environment.
/// Command line flags are applied on top by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Google Cloud project (required)
    pub project_id: String,
    pub region: String,
    pub model_id: String,
    /// Samples per captured frame
    pub chunk_size: usize,
    pub sample_rate: u32,
    /// TEXT or AUDIO
    pub response_modality: String,
    pub system_instruction: String,
    pub voice: String,
    /// Bearer token for the Live API endpoint
    pub access_token: Option<String>,
    pub queue_capacity: usize,
    /// Sample rate of audio returned by the model
    pub output_sample_rate: u32,
    pub connect_timeout_secs: u64,
    /// 0 disables the stall timeout
    pub stall_timeout_secs: u64,
    pub shutdown_grace_ms: u64,
    /// text or json
    pub log_format: String,
}

impl Config {
    /// Load settings from an optional file and the process environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load settings, resolving environment variables through `lookup`
    pub fn load_with<F>(path: Option<&str>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("project_id", "")?
            .set_default("region", "us-central1")?
            .set_default("model_id", "gemini-live-2.5-flash-native-audio")?
            .set_default("chunk_size", 1024)?
            .set_default("sample_rate", 16000)?
            .set_default("response_modality", "AUDIO")?
            .set_default("system_instruction", DEFAULT_SYSTEM_INSTRUCTION)?
            .set_default("voice", "Puck")?
            .set_default("queue_capacity", 5)?
            .set_default("output_sample_rate", 24000)?
            .set_default("connect_timeout_secs", 10)?
            .set_default("stall_timeout_secs", 0)?
            .set_default("shutdown_grace_ms", 2000)?
            .set_default("log_format", "text")?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        for (key, names) in ENV_KEYS {
            let value = names.iter().find_map(|name| lookup(name));
            builder = builder.set_override_option(*key, value)?;
        }

        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Reject settings the session cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::MissingProjectId);
        }
        if self.region.trim().is_empty() {
            return Err(invalid("region", "must not be empty"));
        }
        if self.model_id.trim().is_empty() {
            return Err(invalid("model_id", "must not be empty"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be greater than zero"));
        }
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be greater than zero"));
        }
        if self.output_sample_rate == 0 {
            return Err(invalid("output_sample_rate", "must be greater than zero"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be greater than zero"));
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(invalid("log_format", "expected text or json"));
        }
        self.response_modality.parse::<ResponseModality>()?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
