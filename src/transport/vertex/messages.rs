use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::audio::AudioFrame;
use crate::error::EventDecodeError;
use crate::session::{ResponseModality, SessionConfig};
use crate::transport::{Inbound, ServerEvent};

/// First message on the socket, configures the session
#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Full model resource name
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

/// Base64 payload with its MIME type
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

impl SetupMessage {
    pub fn new(config: &SessionConfig, model_resource: String) -> Self {
        let wants_audio = config.response_modalities.contains(&ResponseModality::Audio);
        let speech_config = config
            .voice
            .as_ref()
            .filter(|_| wants_audio)
            .map(|voice| SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.clone(),
                    },
                },
            });

        let system_instruction = config.system_instruction.as_ref().map(|text| Content {
            parts: vec![Part {
                text: Some(text.clone()),
                inline_data: None,
            }],
        });

        Self {
            setup: Setup {
                model: model_resource,
                generation_config: GenerationConfig {
                    response_modalities: config.response_modalities.clone(),
                    speech_config,
                },
                system_instruction,
            },
        }
    }
}

/// Audio sent to the model as it is captured
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

impl RealtimeInputMessage {
    pub fn from_frame(frame: &AudioFrame) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![Blob {
                    mime_type: frame.encoding().mime_type(),
                    data: base64::engine::general_purpose::STANDARD.encode(frame.data()),
                }],
            },
        }
    }
}

/// Any message pushed by the server
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub go_away: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

impl ServerMessage {
    pub fn parse(payload: &[u8]) -> Result<Self, EventDecodeError> {
        serde_json::from_slice(payload).map_err(|e| EventDecodeError(e.to_string()))
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// The model turn was cut short by the server
    pub fn is_interrupted(&self) -> bool {
        self.server_content.as_ref().is_some_and(|c| c.interrupted)
    }

    /// `timeLeft` of a goAway notice, if this message is one
    pub fn go_away_time_left(&self) -> Option<&str> {
        let go_away = self.go_away.as_ref()?;
        Some(go_away.get("timeLeft").and_then(|v| v.as_str()).unwrap_or("unknown"))
    }

    /// Flatten the message into inbound items, in part order
    ///
    /// A part whose inline data cannot be decoded becomes an error item of its
    /// own; the other parts are kept. A completed turn always yields a trailing
    /// `TurnBoundary`. A message with nothing to render yields a single `Empty`.
    pub fn into_events(self) -> Vec<Inbound> {
        let mut events = Vec::new();
        let mut turn_complete = false;

        if let Some(content) = self.server_content {
            turn_complete = content.turn_complete;
            let parts = content.model_turn.map(|turn| turn.parts).unwrap_or_default();
            for part in parts {
                if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                    events.push(Ok(ServerEvent::TextPart(text)));
                }
                if let Some(blob) = part.inline_data {
                    let decoded = base64::engine::general_purpose::STANDARD
                        .decode(blob.data.as_bytes())
                        .map(ServerEvent::AudioPart)
                        .map_err(|e| EventDecodeError(format!("invalid inline data: {}", e)));
                    events.push(decoded);
                }
            }
        }

        if turn_complete {
            events.push(Ok(ServerEvent::TurnBoundary));
        } else if events.is_empty() {
            events.push(Ok(ServerEvent::Empty));
        }

        events
    }
}

/// Decode one raw server message into inbound items
///
/// A payload that is not a server message at all yields a single error item.
pub fn decode_server_message(payload: &[u8]) -> Vec<Inbound> {
    match ServerMessage::parse(payload) {
        Ok(message) => message.into_events(),
        Err(e) => vec![Err(e)],
    }
}
