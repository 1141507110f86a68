use std::time::Duration;
use tracing::{debug, info, warn};

use super::shutdown::ShutdownListener;
use crate::error::StreamError;
use crate::output::ResponseSink;
use crate::session::SessionCounters;
use crate::transport::{Inbound, ServerEvent, SessionReceiver};

/// How a call to `receive_turn` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The server closed its turn; `content` text/audio parts were delivered
    Completed { content: usize },
    /// The inbound stream ended before the turn did
    StreamEnded { content: usize },
}

/// Receive and dispatch server events until cancelled or the stream breaks
///
/// A turn without content is logged and skipped. The loop also ends normally
/// when the server closes the stream.
pub async fn run_receive<S>(
    receiver: &mut dyn SessionReceiver,
    sink: &mut S,
    stall_timeout: Option<Duration>,
    mut shutdown: ShutdownListener,
    counters: &SessionCounters,
) -> Result<(), StreamError>
where
    S: ResponseSink + ?Sized,
{
    info!("Receive loop started");

    loop {
        let outcome = tokio::select! {
            outcome = receive_turn(receiver, sink, stall_timeout, counters) => outcome?,
            _ = shutdown.cancelled() => {
                debug!("Receive loop cancelled");
                return Ok(());
            }
        };

        match outcome {
            TurnOutcome::Completed { content: 0 } => {
                warn!("Turn completed but received 0 responses");
            }
            TurnOutcome::Completed { content } => {
                debug!(content, "Turn complete");
            }
            TurnOutcome::StreamEnded { content } => {
                info!(content, "Server closed the response stream");
                return Ok(());
            }
        }
    }
}

/// Consume events up to and including the next turn boundary
///
/// Undecodable events are skipped. Stream failures and stalls (when a stall
/// timeout is set) are returned as errors.
pub async fn receive_turn<S>(
    receiver: &mut dyn SessionReceiver,
    sink: &mut S,
    stall_timeout: Option<Duration>,
    counters: &SessionCounters,
) -> Result<TurnOutcome, StreamError>
where
    S: ResponseSink + ?Sized,
{
    let mut content = 0;

    loop {
        let next = match next_inbound(receiver, stall_timeout).await? {
            Some(next) => next,
            None => return Ok(TurnOutcome::StreamEnded { content }),
        };

        match next {
            Ok(ServerEvent::TextPart(text)) => {
                content += 1;
                counters.record_text();
                sink.on_text(&text);
            }
            Ok(ServerEvent::AudioPart(bytes)) => {
                content += 1;
                counters.record_audio(bytes.len());
                sink.on_audio(&bytes);
            }
            Ok(ServerEvent::Empty) => {
                debug!("Ignoring server message without content");
            }
            Ok(ServerEvent::TurnBoundary) => {
                counters.record_turn(content);
                sink.on_turn_complete(content);
                return Ok(TurnOutcome::Completed { content });
            }
            Err(e) => {
                counters.record_decode_error();
                warn!("Skipping server event: {}", e);
            }
        }
    }
}

async fn next_inbound(
    receiver: &mut dyn SessionReceiver,
    stall_timeout: Option<Duration>,
) -> Result<Option<Inbound>, StreamError> {
    match stall_timeout {
        Some(limit) => tokio::time::timeout(limit, receiver.next_event())
            .await
            .map_err(|_| StreamError::Stalled(limit))?,
        None => receiver.next_event().await,
    }
}
