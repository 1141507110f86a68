use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::pipeline::Activity;

/// Live counters updated by the streaming loops
#[derive(Debug, Default)]
pub struct SessionCounters {
    frames_captured: AtomicU64,
    frames_sent: AtomicU64,
    turns_completed: AtomicU64,
    empty_turns: AtomicU64,
    text_parts: AtomicU64,
    audio_bytes: AtomicU64,
    decode_errors: AtomicU64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_captured(&self) -> u64 {
        self.frames_captured.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_sent(&self) -> u64 {
        self.frames_sent.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_turn(&self, content_events: usize) {
        self.turns_completed.fetch_add(1, Ordering::SeqCst);
        if content_events == 0 {
            self.empty_turns.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_text(&self) {
        self.text_parts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_audio(&self, bytes: usize) {
        self.audio_bytes.fetch_add(bytes as u64, Ordering::SeqCst);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured.load(Ordering::SeqCst)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::SeqCst)
    }

    /// Freeze the counters into a report
    pub fn snapshot(&self, started_at: DateTime<Utc>) -> SessionStats {
        let duration = Utc::now().signed_duration_since(started_at);

        SessionStats {
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_captured: self.frames_captured(),
            frames_sent: self.frames_sent(),
            turns_completed: self.turns_completed.load(Ordering::SeqCst),
            empty_turns: self.empty_turns.load(Ordering::SeqCst),
            text_parts: self.text_parts.load(Ordering::SeqCst),
            audio_bytes: self.audio_bytes.load(Ordering::SeqCst),
            decode_errors: self.decode_errors.load(Ordering::SeqCst),
        }
    }
}

/// Statistics about a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// When the session was started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Frames read from the input device and queued
    pub frames_captured: u64,

    /// Frames transmitted to the server
    pub frames_sent: u64,

    /// Turns the server completed
    pub turns_completed: u64,

    /// Completed turns that carried no text or audio
    pub empty_turns: u64,

    /// Text parts received
    pub text_parts: u64,

    /// Audio bytes received
    pub audio_bytes: u64,

    /// Inbound events that could not be decoded
    pub decode_errors: u64,
}

/// Why an active session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// External stop request (Ctrl-C)
    Interrupted,
    /// An activity ran to completion (input exhausted, server closed the stream)
    Finished(Activity),
    /// An activity failed
    Failed { activity: Activity, error: String },
}

/// Outcome of a session that reached `Active`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub stop_reason: StopReason,
    pub stats: SessionStats,
}

impl SessionReport {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self.stop_reason {
            StopReason::Interrupted | StopReason::Finished(_) => 0,
            StopReason::Failed { .. } => 1,
        }
    }
}
