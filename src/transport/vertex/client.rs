use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::messages::{RealtimeInputMessage, ServerMessage, SetupMessage};
use crate::audio::AudioFrame;
use crate::config::Config;
use crate::error::{ConnectionError, StreamError, TransmitError};
use crate::session::SessionConfig;
use crate::transport::{Inbound, LiveSession, LiveTransport, SessionReceiver, SessionSender};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where and how to reach the Live API
#[derive(Debug, Clone)]
pub struct VertexEndpoint {
    pub project_id: String,
    pub region: String,
    /// Sent as a bearer token when present
    pub access_token: Option<String>,
    /// Bound on socket connect plus setup handshake
    pub connect_timeout: Duration,
}

impl VertexEndpoint {
    pub fn from_settings(cfg: &Config) -> Self {
        Self {
            project_id: cfg.project_id.clone(),
            region: cfg.region.clone(),
            access_token: cfg.access_token.clone().filter(|t| !t.is_empty()),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
        }
    }

    pub fn url(&self) -> String {
        format!(
            "wss://{}-aiplatform.googleapis.com/ws/google.cloud.aiplatform.v1.LlmBidiService/BidiGenerateContent",
            self.region
        )
    }

    /// Full resource name for a model id (already-qualified names pass through)
    pub fn model_resource(&self, model_id: &str) -> String {
        if model_id.starts_with("projects/") {
            model_id.to_string()
        } else {
            format!(
                "projects/{}/locations/{}/publishers/google/models/{}",
                self.project_id, self.region, model_id
            )
        }
    }
}

/// Live API over a WebSocket
pub struct VertexTransport {
    endpoint: VertexEndpoint,
}

impl VertexTransport {
    pub fn new(endpoint: VertexEndpoint) -> Self {
        Self { endpoint }
    }

    async fn handshake(&self, config: &SessionConfig) -> Result<LiveSession, ConnectionError> {
        let mut request = self
            .endpoint
            .url()
            .into_client_request()
            .map_err(|e| ConnectionError(format!("invalid endpoint: {}", e)))?;

        if let Some(token) = &self.endpoint.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ConnectionError(format!("invalid access token: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws, response) = connect_async(request)
            .await
            .map_err(|e| ConnectionError(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket upgraded");

        let (mut sink, mut stream) = ws.split();

        let setup = SetupMessage::new(config, self.endpoint.model_resource(&config.model_id));
        let payload = serde_json::to_string(&setup)
            .map_err(|e| ConnectionError(format!("failed to encode setup: {}", e)))?;
        debug!(setup = %payload, "Sending session setup");

        sink.send(Message::Text(payload))
            .await
            .map_err(|e| ConnectionError(format!("failed to send setup: {}", e)))?;

        loop {
            let payload = match stream.next().await {
                Some(Ok(Message::Text(text))) => text.into_bytes(),
                Some(Ok(Message::Binary(bytes))) => bytes,
                Some(Ok(Message::Close(frame))) => {
                    return Err(ConnectionError(format!(
                        "server closed the connection during setup: {:?}",
                        frame
                    )))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ConnectionError(e.to_string())),
                None => {
                    return Err(ConnectionError(
                        "connection closed during setup".to_string(),
                    ))
                }
            };

            match ServerMessage::parse(&payload) {
                Ok(msg) if msg.is_setup_complete() => break,
                Ok(_) => debug!("Ignoring message received before setupComplete"),
                Err(e) => warn!("Undecodable message during setup: {}", e),
            }
        }

        Ok(LiveSession::new(
            Box::new(VertexSender { sink, closed: false }),
            Box::new(VertexReceiver {
                stream,
                pending: VecDeque::new(),
            }),
        ))
    }
}

#[async_trait]
impl LiveTransport for VertexTransport {
    async fn connect(&self, config: &SessionConfig) -> Result<LiveSession, ConnectionError> {
        info!(
            "Connecting to {} (project: {}, region: {})",
            config.model_id, self.endpoint.project_id, self.endpoint.region
        );

        let session = tokio::time::timeout(self.endpoint.connect_timeout, self.handshake(config))
            .await
            .map_err(|_| {
                ConnectionError(format!(
                    "no setupComplete within {:?}",
                    self.endpoint.connect_timeout
                ))
            })??;

        info!("Connected to {} via Vertex AI", config.model_id);
        Ok(session)
    }
}

/// Outbound half of a Vertex session
pub struct VertexSender {
    sink: SplitSink<WsStream, Message>,
    closed: bool,
}

#[async_trait]
impl SessionSender for VertexSender {
    async fn send_realtime_input(&mut self, frame: &AudioFrame) -> Result<(), TransmitError> {
        if self.closed {
            return Err(TransmitError::Closed);
        }

        let payload = serde_json::to_string(&RealtimeInputMessage::from_frame(frame))
            .map_err(|e| TransmitError::Send(e.to_string()))?;

        self.sink.send(Message::Text(payload)).await.map_err(|e| match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransmitError::Closed
            }
            other => TransmitError::Send(other.to_string()),
        })
    }

    async fn close(&mut self) -> Result<(), TransmitError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.sink.close().await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                info!("Live session closed");
                Ok(())
            }
            Err(e) => Err(TransmitError::Send(e.to_string())),
        }
    }
}

/// Inbound half of a Vertex session
pub struct VertexReceiver {
    stream: SplitStream<WsStream>,
    pending: VecDeque<Inbound>,
}

#[async_trait]
impl SessionReceiver for VertexReceiver {
    async fn next_event(&mut self) -> Result<Option<Inbound>, StreamError> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(Some(item));
            }

            let payload = match self.stream.next().await {
                Some(Ok(Message::Text(text))) => text.into_bytes(),
                Some(Ok(Message::Binary(bytes))) => bytes,
                Some(Ok(Message::Close(frame))) => {
                    info!("Server closed the session: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(StreamError::Transport(e.to_string())),
                None => return Ok(None),
            };

            match ServerMessage::parse(&payload) {
                Ok(message) => {
                    if let Some(time_left) = message.go_away_time_left() {
                        warn!(time_left, "Server announced it will close the session");
                    }
                    if message.is_interrupted() {
                        info!("Model turn interrupted");
                    }
                    self.pending.extend(message.into_events());
                }
                Err(e) => self.pending.push_back(Err(e)),
            }
        }
    }
}
