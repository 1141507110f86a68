//! Live session management
//!
//! This module provides the `SessionController` that manages:
//! - Opening the input device and connecting to the Live API
//! - Running capture, send and receive concurrently
//! - Coordinated teardown when any activity ends
//! - Session statistics and the final report

mod config;
mod controller;
mod stats;

pub use config::{ControllerOptions, ResponseModality, SessionConfig};
pub use controller::{SessionController, SessionState};
pub use stats::{SessionCounters, SessionReport, SessionStats, StopReason};
