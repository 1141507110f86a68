use tracing::{debug, error, info};

use super::queue::FrameConsumer;
use super::shutdown::ShutdownListener;
use crate::error::TransmitError;
use crate::session::SessionCounters;
use crate::transport::SessionSender;

/// Log progress every this many frames
const PROGRESS_INTERVAL: u64 = 50;

/// Pop frames in capture order and send them over the session
///
/// Cancellation is only observed while waiting for the next frame: a popped
/// frame is always sent or its failure reported. A transmit failure ends the
/// loop without retrying.
pub async fn run_send(
    mut queue: FrameConsumer,
    sender: &mut dyn SessionSender,
    mut shutdown: ShutdownListener,
    counters: &SessionCounters,
) -> Result<(), TransmitError> {
    info!("Send loop started");

    loop {
        let frame = tokio::select! {
            frame = queue.pop() => match frame {
                Some(frame) => frame,
                None => {
                    info!("Frame queue drained, send loop finished");
                    return Ok(());
                }
            },
            _ = shutdown.cancelled() => {
                debug!("Send loop cancelled");
                return Ok(());
            }
        };

        if let Err(e) = sender.send_realtime_input(&frame).await {
            error!(sequence = frame.sequence(), "Failed to transmit audio frame: {}", e);
            return Err(e);
        }

        let sent = counters.record_sent();
        if sent % PROGRESS_INTERVAL == 0 {
            info!("Sent {} audio chunks", sent);
        }
    }
}
