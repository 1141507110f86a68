//! Session transport
//!
//! The live session is split into two capabilities over one connection:
//! a `SessionSender` used only by the send loop and a `SessionReceiver` used
//! only by the receive loop. `LiveSession` owns both and hands out disjoint
//! borrows, so neither direction can touch the other's half.

pub mod vertex;

use async_trait::async_trait;

use crate::audio::AudioFrame;
use crate::error::{ConnectionError, EventDecodeError, StreamError, TransmitError};
use crate::session::SessionConfig;

pub use vertex::{VertexEndpoint, VertexTransport};

/// One payload pushed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Text generated by the model
    TextPart(String),
    /// Raw audio bytes generated by the model
    AudioPart(Vec<u8>),
    /// The model finished its turn
    TurnBoundary,
    /// A message with nothing to render
    Empty,
}

/// One inbound item: an event, or an event that failed to decode
pub type Inbound = Result<ServerEvent, EventDecodeError>;

/// Opens live sessions
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Connect and complete the session handshake (single attempt)
    async fn connect(&self, config: &SessionConfig) -> Result<LiveSession, ConnectionError>;
}

/// Outbound half of a live session
#[async_trait]
pub trait SessionSender: Send {
    /// Send one audio frame as realtime input
    async fn send_realtime_input(&mut self, frame: &AudioFrame) -> Result<(), TransmitError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), TransmitError>;
}

/// Inbound half of a live session
#[async_trait]
pub trait SessionReceiver: Send {
    /// Next inbound item; `Ok(None)` once the server has closed the stream
    async fn next_event(&mut self) -> Result<Option<Inbound>, StreamError>;
}

/// An open live session
pub struct LiveSession {
    sender: Box<dyn SessionSender>,
    receiver: Box<dyn SessionReceiver>,
}

impl LiveSession {
    pub fn new(sender: Box<dyn SessionSender>, receiver: Box<dyn SessionReceiver>) -> Self {
        Self { sender, receiver }
    }

    /// Borrow both halves at once, one per direction
    pub fn halves(&mut self) -> (&mut dyn SessionSender, &mut dyn SessionReceiver) {
        (self.sender.as_mut(), self.receiver.as_mut())
    }

    /// Close the session, consuming it
    pub async fn close(mut self) -> Result<(), TransmitError> {
        self.sender.close().await
    }
}
