// Integration tests for configuration loading and validation

use anyhow::Result;
use live_transcriber::error::ConfigError;
use live_transcriber::session::{ControllerOptions, ResponseModality, SessionConfig};
use live_transcriber::Config;
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() -> Result<()> {
    let cfg = Config::load_with(None, env(&[]))?;

    assert_eq!(cfg.region, "us-central1");
    assert_eq!(cfg.model_id, "gemini-live-2.5-flash-native-audio");
    assert_eq!(cfg.chunk_size, 1024);
    assert_eq!(cfg.sample_rate, 16000);
    assert_eq!(cfg.response_modality, "AUDIO");
    assert_eq!(cfg.voice, "Puck");
    assert_eq!(cfg.queue_capacity, 5);
    assert_eq!(cfg.stall_timeout_secs, 0);
    assert_eq!(cfg.log_format, "text");
    assert!(cfg.access_token.is_none());
    assert!(cfg.system_instruction.contains("Principal Cloud Platform Engineer"));

    Ok(())
}

#[test]
fn test_missing_project_id_is_rejected() -> Result<()> {
    let cfg = Config::load_with(None, env(&[]))?;

    assert!(matches!(cfg.validate(), Err(ConfigError::MissingProjectId)));
    assert!(matches!(
        SessionConfig::from_settings(&cfg),
        Err(ConfigError::MissingProjectId)
    ));

    Ok(())
}

#[test]
fn test_environment_overrides_defaults() -> Result<()> {
    let cfg = Config::load_with(
        None,
        env(&[
            ("GOOGLE_CLOUD_PROJECT", "demo-project"),
            ("GOOGLE_CLOUD_REGION", "europe-west4"),
            ("MODEL_ID", "gemini-2.0-flash-live-preview-04-09"),
            ("CHUNK_SIZE", "512"),
            ("RESPONSE_MODALITY", "text"),
            ("LIVE_STALL_TIMEOUT_SECS", "30"),
        ]),
    )?;

    assert_eq!(cfg.project_id, "demo-project");
    assert_eq!(cfg.region, "europe-west4");
    assert_eq!(cfg.model_id, "gemini-2.0-flash-live-preview-04-09");
    assert_eq!(cfg.chunk_size, 512);
    cfg.validate()?;

    let session = SessionConfig::from_settings(&cfg)?;
    assert_eq!(session.response_modalities, vec![ResponseModality::Text]);
    assert_eq!(session.frame_size, 512);

    let options = ControllerOptions::from_settings(&cfg);
    assert_eq!(options.stall_timeout, Some(Duration::from_secs(30)));

    Ok(())
}

#[test]
fn test_prefixed_variable_wins() -> Result<()> {
    let cfg = Config::load_with(
        None,
        env(&[
            ("LIVE_PROJECT_ID", "from-live"),
            ("GOOGLE_CLOUD_PROJECT", "from-google"),
        ]),
    )?;

    assert_eq!(cfg.project_id, "from-live");
    Ok(())
}

#[test]
fn test_config_file_is_layered_under_environment() -> Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, "project_id = \"file-project\"")?;
    writeln!(file, "region = \"asia-northeast1\"")?;
    writeln!(file, "queue_capacity = 8")?;
    file.flush()?;

    let path = file.path().to_str().expect("utf-8 temp path");
    let cfg = Config::load_with(Some(path), env(&[("GOOGLE_CLOUD_REGION", "us-east4")]))?;

    assert_eq!(cfg.project_id, "file-project");
    assert_eq!(cfg.region, "us-east4");
    assert_eq!(cfg.queue_capacity, 8);

    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() -> Result<()> {
    let base = Config::load_with(None, env(&[("GOOGLE_CLOUD_PROJECT", "p")]))?;
    base.validate()?;

    let mut cfg = base.clone();
    cfg.response_modality = "VIDEO".to_string();
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::Invalid { field: "response_modality", .. })
    ));

    let mut cfg = base.clone();
    cfg.chunk_size = 0;
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::Invalid { field: "chunk_size", .. })
    ));

    let mut cfg = base.clone();
    cfg.queue_capacity = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = base;
    cfg.log_format = "xml".to_string();
    assert!(cfg.validate().is_err());

    Ok(())
}

#[test]
fn test_blank_voice_and_instruction_are_omitted() -> Result<()> {
    let mut cfg = Config::load_with(None, env(&[("GOOGLE_CLOUD_PROJECT", "p")]))?;
    cfg.voice = "  ".to_string();
    cfg.system_instruction = String::new();

    let session = SessionConfig::from_settings(&cfg)?;
    assert!(session.voice.is_none());
    assert!(session.system_instruction.is_none());

    Ok(())
}
