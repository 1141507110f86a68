use std::path::PathBuf;
use std::sync::Arc;

use crate::error::DeviceError;

/// Encoding of the bytes carried by an `AudioFrame`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEncoding {
    /// Signed 16-bit little-endian PCM
    Pcm16 { sample_rate: u32, channels: u16 },
}

impl AudioEncoding {
    pub fn mono(sample_rate: u32) -> Self {
        AudioEncoding::Pcm16 {
            sample_rate,
            channels: 1,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            AudioEncoding::Pcm16 { sample_rate, .. } => *sample_rate,
        }
    }

    /// MIME type announced to the Live API for this encoding
    pub fn mime_type(&self) -> String {
        match self {
            AudioEncoding::Pcm16 { sample_rate, .. } => format!("audio/pcm;rate={}", sample_rate),
        }
    }
}

/// One captured unit of audio
///
/// Frames are immutable once created; the sequence number is assigned by the
/// capture loop in capture order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Vec<u8>,
    encoding: AudioEncoding,
    sequence: u64,
}

impl AudioFrame {
    pub fn new(data: Vec<u8>, encoding: AudioEncoding, sequence: u64) -> Self {
        Self {
            data,
            encoding,
            sequence,
        }
    }

    /// Build a frame from i16 samples (interleaved if multi-channel)
    pub fn from_samples(samples: &[i16], encoding: AudioEncoding, sequence: u64) -> Self {
        Self::new(samples_to_bytes(samples), encoding, sequence)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of samples per channel
    pub fn sample_count(&self) -> usize {
        match self.encoding {
            AudioEncoding::Pcm16 { channels, .. } => self.data.len() / (2 * channels.max(1) as usize),
        }
    }
}

/// Convert i16 samples to little-endian PCM bytes
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Parameters an input device is opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (the live session always captures mono)
    pub channels: u16,
    /// Samples per frame returned by `read_frame`
    pub frame_size: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Live API input rate
            channels: 1,
            frame_size: 1024,
        }
    }
}

/// Description of an available input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
}

/// An opened input device with a blocking read
///
/// Implementations must release the OS handle in `close`, tolerate repeated
/// calls to it, and close on drop if nobody did.
pub trait InputDevice: Send {
    /// Device name for logging
    fn name(&self) -> &str;

    /// Block until one frame of PCM16 bytes is available
    fn read_frame(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// Release the device
    fn close(&mut self);
}

/// Source of input devices
///
/// Implementations:
/// - `MicrophoneProvider`: default system microphone via cpal
/// - `WavFileProvider`: a 16-bit mono WAV file (offline runs and tests)
pub trait DeviceProvider: Send + Sync {
    /// The default input device, if there is one
    fn default_input_device(&self) -> Option<DeviceInfo>;

    /// Open the default input device
    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn InputDevice>, DeviceError>;
}

/// Where captured audio comes from
#[derive(Debug, Clone)]
pub enum DeviceSource {
    /// Default microphone
    Microphone,
    /// WAV file, optionally paced at real time
    File { path: PathBuf, realtime: bool },
}

/// Input device factory
pub struct DeviceFactory;

impl DeviceFactory {
    pub fn create(source: DeviceSource) -> Arc<dyn DeviceProvider> {
        match source {
            DeviceSource::Microphone => Arc::new(super::microphone::MicrophoneProvider),
            DeviceSource::File { path, realtime } => {
                Arc::new(super::file::WavFileProvider::new(path, realtime))
            }
        }
    }
}
