use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};

use super::ResponseSink;

/// Output file settings for received audio
#[derive(Debug, Clone)]
pub struct WavSinkConfig {
    /// File to write
    pub path: PathBuf,
    /// Sample rate of the audio the model returns (24kHz for native audio models)
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl WavSinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sample_rate: 24000,
            channels: 1,
        }
    }
}

/// Writes received audio parts into a 16-bit PCM WAV file
///
/// Text parts are ignored. A write failure is logged once and disables the
/// sink; the session keeps running.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    sample_count: usize,
    carry: Option<u8>,
}

impl WavSink {
    pub fn create(config: WavSinkConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .context("Failed to create output directory")?;
        }

        let spec = hound::WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&config.path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", config.path))?;

        info!(
            "Writing received audio to {} ({}Hz, {} channels)",
            config.path.display(),
            config.sample_rate,
            config.channels
        );

        Ok(Self {
            writer: Some(writer),
            path: config.path,
            sample_count: 0,
            carry: None,
        })
    }

    /// Samples written so far
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Flush the header and close the file
    pub fn finish(mut self) -> Result<usize> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()
                .context("Failed to finalize WAV file")?;
        }
        Ok(self.sample_count)
    }

    fn write_pcm(&mut self, pcm: &[u8]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        // Audio parts may split a sample across two messages
        let mut bytes = Vec::with_capacity(pcm.len() + 1);
        bytes.extend(self.carry.take());
        bytes.extend_from_slice(pcm);

        let mut chunks = bytes.chunks_exact(2);
        for pair in &mut chunks {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .context("Failed to write sample to WAV")?;
            self.sample_count += 1;
        }
        self.carry = chunks.remainder().first().copied();

        Ok(())
    }
}

impl ResponseSink for WavSink {
    fn on_text(&mut self, _text: &str) {}

    fn on_audio(&mut self, pcm: &[u8]) {
        if let Err(e) = self.write_pcm(pcm) {
            warn!("Disabling audio output {}: {:#}", self.path.display(), e);
            self.writer = None;
        }
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
