use tracing::{debug, error, info, warn};

use super::queue::FrameProducer;
use super::shutdown::ShutdownListener;
use crate::audio::{AudioEncoding, AudioFrame, InputDevice};
use crate::error::DeviceError;
use crate::session::SessionCounters;

/// Read frames from the device and queue them until cancelled
///
/// Each blocking read runs on the blocking pool so the async scheduler keeps
/// driving the other loops. A full queue suspends the loop. A read failure
/// ends the loop with that error; running out of input ends it normally.
/// The device is closed on every exit path.
///
/// A read that never returns keeps the device on its blocking worker; if the
/// controller gives up on this loop, the device is released when that read
/// finally returns (or when the runtime shuts down).
pub async fn run_capture(
    mut device: Box<dyn InputDevice>,
    queue: FrameProducer,
    encoding: AudioEncoding,
    mut shutdown: ShutdownListener,
    counters: &SessionCounters,
) -> Result<(), DeviceError> {
    info!(device = device.name(), "Capture started");
    let mut sequence = 0u64;

    let result = loop {
        let mut read = tokio::task::spawn_blocking(move || {
            let data = device.read_frame();
            (device, data)
        });

        let (returned, data) = tokio::select! {
            joined = &mut read => match joined {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Capture worker failed: {}", e);
                    return Err(DeviceError::Read(format!("capture worker failed: {}", e)));
                }
            },
            _ = shutdown.cancelled() => {
                // The read in flight still owns the device; wait for it to come back
                match read.await {
                    Ok((mut device, _)) => device.close(),
                    Err(e) => warn!("Capture worker failed during shutdown: {}", e),
                }
                debug!(frames = sequence, "Capture cancelled");
                return Ok(());
            }
        };
        device = returned;

        let data = match data {
            Ok(data) => data,
            Err(DeviceError::EndOfInput) => {
                info!(frames = sequence, "Input exhausted");
                break Ok(());
            }
            Err(e) => {
                error!("Error capturing audio: {}", e);
                break Err(e);
            }
        };

        let frame = AudioFrame::new(data, encoding, sequence);
        tokio::select! {
            pushed = queue.push(frame) => {
                if pushed.is_err() {
                    debug!("Frame queue closed, stopping capture");
                    break Ok(());
                }
            }
            _ = shutdown.cancelled() => {
                debug!(frames = sequence, "Capture cancelled while queue was full");
                break Ok(());
            }
        }

        counters.record_captured();
        sequence += 1;
    };

    device.close();
    result
}
