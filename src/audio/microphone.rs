//! Microphone capture via cpal
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated thread for
//! its whole life. The audio callback hands sample buffers to the reader over a
//! bounded crossbeam channel; `read_frame` blocks on that channel until a full
//! frame has been collected.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use super::backend::{DeviceConfig, DeviceInfo, DeviceProvider, InputDevice};
use crate::error::DeviceError;

/// Callback buffers held between the audio thread and the reader
const CALLBACK_BUFFERS: usize = 64;

/// Default system microphone
pub struct MicrophoneProvider;

impl DeviceProvider for MicrophoneProvider {
    fn default_input_device(&self) -> Option<DeviceInfo> {
        let host = cpal::default_host();
        host.default_input_device().map(|device| DeviceInfo {
            name: device.name().unwrap_or_else(|_| "unknown input device".to_string()),
        })
    }

    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn InputDevice>, DeviceError> {
        Ok(Box::new(Microphone::open(config)?))
    }
}

/// An open microphone stream
pub struct Microphone {
    name: String,
    frame_size: usize,
    samples_rx: Receiver<Vec<i16>>,
    errors_rx: Receiver<String>,
    pending: VecDeque<i16>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    overflows: Arc<AtomicU64>,
}

impl Microphone {
    pub fn open(config: &DeviceConfig) -> Result<Self, DeviceError> {
        let (ready_tx, ready_rx) = bounded::<Result<String, DeviceError>>(1);
        let (samples_tx, samples_rx) = bounded::<Vec<i16>>(CALLBACK_BUFFERS);
        let (errors_tx, errors_rx) = bounded::<String>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let overflows = Arc::new(AtomicU64::new(0));

        let stream_config = config.clone();
        let callback_overflows = Arc::clone(&overflows);
        let worker = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match build_stream(&stream_config, samples_tx, errors_tx, callback_overflows) {
                    Ok((stream, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Hold the stream until close() or until the handle is gone
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Microphone stream released");
            })
            .map_err(|e| DeviceError::Open(format!("failed to spawn capture thread: {}", e)))?;

        let name = match ready_rx.recv() {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(DeviceError::Open("capture thread exited during open".to_string()));
            }
        };

        info!(
            device = %name,
            sample_rate = config.sample_rate,
            frame_size = config.frame_size,
            "Recording from microphone"
        );

        Ok(Self {
            name,
            frame_size: config.frame_size * config.channels as usize,
            samples_rx,
            errors_rx,
            pending: VecDeque::with_capacity(config.frame_size * 2),
            stop_tx: Some(stop_tx),
            worker: Some(worker),
            overflows,
        })
    }

    /// Callback buffers dropped because the reader fell behind
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}

impl InputDevice for Microphone {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
        if self.stop_tx.is_none() {
            return Err(DeviceError::Closed);
        }

        while self.pending.len() < self.frame_size {
            select! {
                recv(self.samples_rx) -> chunk => match chunk {
                    Ok(chunk) => self.pending.extend(chunk),
                    Err(_) => return Err(DeviceError::Read("capture stream stopped".to_string())),
                },
                recv(self.errors_rx) -> err => {
                    let reason = err.unwrap_or_else(|_| "capture stream stopped".to_string());
                    return Err(DeviceError::Read(reason));
                }
            }
        }

        Ok(self
            .pending
            .drain(..self.frame_size)
            .flat_map(|s| s.to_le_bytes())
            .collect())
    }

    fn close(&mut self) {
        let Some(stop_tx) = self.stop_tx.take() else {
            return;
        };
        let _ = stop_tx.send(());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Microphone capture thread panicked");
            }
        }

        let overflows = self.overflow_count();
        if overflows > 0 {
            warn!(device = %self.name, overflows, "Microphone buffers were dropped during capture");
        }
        info!(device = %self.name, "Microphone closed");
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_stream(
    config: &DeviceConfig,
    samples_tx: Sender<Vec<i16>>,
    errors_tx: Sender<String>,
    overflows: Arc<AtomicU64>,
) -> Result<(Stream, String), DeviceError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(DeviceError::Unavailable)?;
    let name = device.name().unwrap_or_else(|_| "unknown input device".to_string());

    let supported = device
        .supported_input_configs()
        .map_err(|e| DeviceError::Open(e.to_string()))?
        .find(|c| {
            c.min_sample_rate().0 <= config.sample_rate
                && c.max_sample_rate().0 >= config.sample_rate
                && c.channels() == config.channels
        })
        .ok_or_else(|| {
            DeviceError::Open(format!(
                "{} does not support {}Hz with {} channel(s)",
                name, config.sample_rate, config.channels
            ))
        })?;

    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = move |err: cpal::StreamError| {
        error!("Microphone stream error: {}", err);
        let _ = errors_tx.try_send(err.to_string());
    };

    // Never block the audio thread: a full hand-off drops the buffer
    let forward = move |samples: Vec<i16>| match samples_tx.try_send(samples) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            overflows.fetch_add(1, Ordering::Relaxed);
        }
        Err(TrySendError::Disconnected(_)) => {}
    };

    let stream = match supported.sample_format() {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| forward(data.to_vec()),
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                forward(
                    data.iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect(),
                )
            },
            err_fn,
            None,
        ),
        other => {
            return Err(DeviceError::Open(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| DeviceError::Open(e.to_string()))?;

    stream.play().map_err(|e| DeviceError::Open(e.to_string()))?;

    Ok((stream, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_microphone_reads_one_frame() {
        let config = DeviceConfig::default();
        let mut mic = Microphone::open(&config).expect("microphone should open");
        let frame = mic.read_frame().expect("frame should be readable");
        assert_eq!(frame.len(), config.frame_size * 2);
        mic.close();
        mic.close();
    }
}
