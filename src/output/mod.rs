//! Where received content goes
//!
//! The receive loop only knows the `ResponseSink` trait; the binary decides
//! whether text is printed, audio is written to a WAV file, or both.

pub mod wav;

use std::io::{self, Write};
use tracing::{debug, info, warn};

pub use wav::{WavSink, WavSinkConfig};

/// Receives model output in arrival order
pub trait ResponseSink: Send {
    /// A text part
    fn on_text(&mut self, text: &str);

    /// Raw PCM bytes of an audio part
    fn on_audio(&mut self, pcm: &[u8]);

    /// The model finished a turn that carried `content` text/audio parts
    fn on_turn_complete(&mut self, content: usize) {
        let _ = content;
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for Box<S> {
    fn on_text(&mut self, text: &str) {
        (**self).on_text(text)
    }

    fn on_audio(&mut self, pcm: &[u8]) {
        (**self).on_audio(pcm)
    }

    fn on_turn_complete(&mut self, content: usize) {
        (**self).on_turn_complete(content)
    }
}

/// Prints text parts and reports audio parts
pub struct ConsoleSink<W: Write + Send = io::Stdout> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ResponseSink for ConsoleSink<W> {
    fn on_text(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!("Failed to print text part: {}", e);
        }
    }

    fn on_audio(&mut self, pcm: &[u8]) {
        info!("Audio received: {} bytes", pcm.len());
    }

    fn on_turn_complete(&mut self, content: usize) {
        debug!(content, "Turn rendered");
    }
}

/// Forwards everything to two sinks
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A: ResponseSink, B: ResponseSink> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: ResponseSink, B: ResponseSink> ResponseSink for TeeSink<A, B> {
    fn on_text(&mut self, text: &str) {
        self.first.on_text(text);
        self.second.on_text(text);
    }

    fn on_audio(&mut self, pcm: &[u8]) {
        self.first.on_audio(pcm);
        self.second.on_audio(pcm);
    }

    fn on_turn_complete(&mut self, content: usize) {
        self.first.on_turn_complete(content);
        self.second.on_turn_complete(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_prints_text_lines() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.on_text("hello");
        sink.on_audio(&[0u8; 4]);
        sink.on_text("world");

        let printed = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(printed, "hello\nworld\n");
    }

    #[test]
    fn test_tee_sink_forwards_to_both() {
        let mut tee = TeeSink::new(ConsoleSink::new(Vec::new()), ConsoleSink::new(Vec::new()));
        tee.on_text("hi");

        let (a, b) = tee.into_parts();
        assert_eq!(a.into_inner(), b"hi\n");
        assert_eq!(b.into_inner(), b"hi\n");
    }
}
