//! Vertex AI Live API transport
//!
//! Speaks the BidiGenerateContent protocol over a WebSocket:
//! - one `setup` message, answered by `setupComplete`
//! - `realtimeInput` messages carrying base64 PCM chunks
//! - `serverContent` messages carrying model turn parts

pub mod client;
pub mod messages;

pub use client::{VertexEndpoint, VertexReceiver, VertexSender, VertexTransport};
pub use messages::{decode_server_message, RealtimeInputMessage, ServerMessage, SetupMessage};
