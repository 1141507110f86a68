//! The three streaming activities and what they share
//!
//! - capture: input device -> bounded queue
//! - send: bounded queue -> session sender
//! - receive: session receiver -> response sink

pub mod capture;
pub mod queue;
pub mod receive;
pub mod send;
pub mod shutdown;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use capture::run_capture;
pub use queue::{bounded, FrameConsumer, FrameProducer, QueueClosed, QueueConsumer, QueueProducer};
pub use receive::{receive_turn, run_receive, TurnOutcome};
pub use send::run_send;
pub use shutdown::{Shutdown, ShutdownListener};

/// One of the supervised activities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Capture,
    Send,
    Receive,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Capture => write!(f, "capture"),
            Activity::Send => write!(f, "send"),
            Activity::Receive => write!(f, "receive"),
        }
    }
}
