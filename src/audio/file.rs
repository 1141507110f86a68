use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

use super::backend::{samples_to_bytes, DeviceConfig, DeviceInfo, DeviceProvider, InputDevice};
use crate::error::DeviceError;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            anyhow::bail!(
                "Expected 16-bit integer PCM, got {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Check the file can be streamed as-is with the given device config
    pub fn ensure_format(&self, sample_rate: u32, channels: u16) -> Result<()> {
        // No resampling here: the live session expects exactly what it announces
        if self.sample_rate == sample_rate && self.channels == channels {
            Ok(())
        } else {
            anyhow::bail!(
                "Expected {}Hz {}ch, got {}Hz {}ch",
                sample_rate,
                channels,
                self.sample_rate,
                self.channels
            )
        }
    }
}

/// Serves a WAV file as the input device
pub struct WavFileProvider {
    path: PathBuf,
    realtime: bool,
}

impl WavFileProvider {
    pub fn new(path: impl Into<PathBuf>, realtime: bool) -> Self {
        Self {
            path: path.into(),
            realtime,
        }
    }
}

impl DeviceProvider for WavFileProvider {
    fn default_input_device(&self) -> Option<DeviceInfo> {
        self.path.is_file().then(|| DeviceInfo {
            name: self.path.display().to_string(),
        })
    }

    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn InputDevice>, DeviceError> {
        let input = WavFileInput::open(&self.path, config, self.realtime)?;
        Ok(Box::new(input))
    }
}

/// Reads fixed-size frames from a WAV file
///
/// The last frame is padded with silence. Once the file is exhausted every
/// read returns `DeviceError::EndOfInput`.
pub struct WavFileInput {
    name: String,
    samples: Vec<i16>,
    position: usize,
    frame_size: usize,
    frame_duration: Option<Duration>,
    last_read: Option<Instant>,
    closed: bool,
}

impl WavFileInput {
    pub fn open(
        path: impl AsRef<Path>,
        config: &DeviceConfig,
        realtime: bool,
    ) -> Result<Self, DeviceError> {
        let audio = AudioFile::open(path.as_ref()).map_err(|e| DeviceError::Open(format!("{:#}", e)))?;
        audio
            .ensure_format(config.sample_rate, config.channels)
            .map_err(|e| DeviceError::Open(e.to_string()))?;

        let frame_duration = realtime.then(|| {
            Duration::from_secs_f64(config.frame_size as f64 / config.sample_rate as f64)
        });

        Ok(Self {
            name: audio.path,
            samples: audio.samples,
            position: 0,
            frame_size: config.frame_size * config.channels as usize,
            frame_duration,
            last_read: None,
            closed: false,
        })
    }

    fn pace(&mut self) {
        if let (Some(frame_duration), Some(last)) = (self.frame_duration, self.last_read) {
            let elapsed = last.elapsed();
            if elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }
        self.last_read = Some(Instant::now());
    }
}

impl InputDevice for WavFileInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        if self.position >= self.samples.len() {
            return Err(DeviceError::EndOfInput);
        }

        self.pace();

        let end = (self.position + self.frame_size).min(self.samples.len());
        let mut frame = self.samples[self.position..end].to_vec();
        frame.resize(self.frame_size, 0);
        self.position = end;

        Ok(samples_to_bytes(&frame))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            info!(file = %self.name, frames_read = self.position / self.frame_size.max(1), "WAV input closed");
        }
    }
}

impl Drop for WavFileInput {
    fn drop(&mut self) {
        self.close();
    }
}
