// Test doubles for the device and transport seams
//
// Each integration test binary uses a different subset of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use live_transcriber::audio::{DeviceConfig, DeviceInfo, DeviceProvider, InputDevice};
use live_transcriber::error::{
    ConnectionError, DeviceError, EventDecodeError, StreamError, TransmitError,
};
use live_transcriber::output::ResponseSink;
use live_transcriber::session::SessionConfig;
use live_transcriber::transport::{
    Inbound, LiveSession, LiveTransport, ServerEvent, SessionReceiver, SessionSender,
};
use live_transcriber::AudioFrame;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Frame payload that encodes its index, so order can be checked after sending
pub fn numbered_frame(index: u16) -> Vec<u8> {
    let mut data = vec![0u8; 8];
    data[..2].copy_from_slice(&index.to_le_bytes());
    data
}

/// An input device that plays back a fixed list of frames
pub struct ScriptedDevice {
    frames: VecDeque<Vec<u8>>,
    /// Keep producing silence instead of ending
    endless: bool,
    /// Fail with a read error after this many frames
    fail_after: Option<usize>,
    read_delay: Duration,
    reads: usize,
    closed: bool,
    closes: Arc<AtomicUsize>,
}

impl ScriptedDevice {
    pub fn with_frames(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            endless: false,
            fail_after: None,
            read_delay: Duration::ZERO,
            reads: 0,
            closed: false,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Produces frames until closed, one every `read_delay`
    pub fn endless(read_delay: Duration) -> Self {
        let mut device = Self::with_frames(Vec::new());
        device.endless = true;
        device.read_delay = read_delay;
        device
    }

    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Counts how many times the device was actually released
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

impl InputDevice for ScriptedDevice {
    fn name(&self) -> &str {
        "scripted"
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        if self.fail_after == Some(self.reads) {
            return Err(DeviceError::Read("scripted read failure".to_string()));
        }
        if !self.read_delay.is_zero() {
            std::thread::sleep(self.read_delay);
        }
        self.reads += 1;

        match self.frames.pop_front() {
            Some(frame) => Ok(frame),
            None if self.endless => Ok(vec![0u8; 8]),
            None => Err(DeviceError::EndOfInput),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ScriptedDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// Hands out one scripted device
pub struct ScriptedProvider {
    device: Mutex<Option<ScriptedDevice>>,
    available: bool,
    /// How long `open` blocks before returning
    pub open_delay: Duration,
    pub opens: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(device: ScriptedDevice) -> Self {
        Self {
            device: Mutex::new(Some(device)),
            available: true,
            open_delay: Duration::ZERO,
            opens: AtomicUsize::new(0),
        }
    }

    /// A provider that reports no input device at all
    pub fn unavailable() -> Self {
        Self {
            device: Mutex::new(None),
            available: false,
            open_delay: Duration::ZERO,
            opens: AtomicUsize::new(0),
        }
    }
}

impl DeviceProvider for ScriptedProvider {
    fn default_input_device(&self) -> Option<DeviceInfo> {
        self.available.then(|| DeviceInfo {
            name: "scripted".to_string(),
        })
    }

    fn open(&self, _config: &DeviceConfig) -> Result<Box<dyn InputDevice>, DeviceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if !self.open_delay.is_zero() {
            std::thread::sleep(self.open_delay);
        }
        let device = self
            .device
            .lock()
            .map_err(|_| DeviceError::Open("provider poisoned".to_string()))?
            .take()
            .ok_or_else(|| DeviceError::Open("already opened".to_string()))?;
        Ok(Box::new(device))
    }
}

/// Records every frame it is asked to send
pub struct RecordingSender {
    pub sent: Arc<Mutex<Vec<AudioFrame>>>,
    pub closed: Arc<AtomicBool>,
    /// Fail the send after this many successful ones
    pub fail_after: Option<usize>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            fail_after: None,
        }
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.sent.lock().unwrap().iter().map(|f| f.sequence()).collect()
    }
}

#[async_trait]
impl SessionSender for RecordingSender {
    async fn send_realtime_input(&mut self, frame: &AudioFrame) -> Result<(), TransmitError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransmitError::Closed);
        }
        let mut sent = self.sent.lock().unwrap();
        if self.fail_after == Some(sent.len()) {
            return Err(TransmitError::Send("scripted transmit failure".to_string()));
        }
        sent.push(frame.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransmitError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A sender whose sends never complete, as over a stuck connection
pub struct HangingSender {
    pub closed: Arc<AtomicBool>,
}

#[async_trait]
impl SessionSender for HangingSender {
    async fn send_realtime_input(&mut self, _frame: &AudioFrame) -> Result<(), TransmitError> {
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), TransmitError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// What the test pushes into a scripted inbound stream
pub type Scripted = Result<Inbound, StreamError>;

/// Inbound half fed from a channel; ends when the test drops its sender
pub struct ChannelReceiver {
    rx: mpsc::UnboundedReceiver<Scripted>,
}

impl ChannelReceiver {
    pub fn new() -> (mpsc::UnboundedSender<Scripted>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// A receiver that yields `items` and then reports the stream closed
    pub fn scripted(items: Vec<Scripted>) -> Self {
        let (tx, receiver) = Self::new();
        for item in items {
            let _ = tx.send(item);
        }
        receiver
    }
}

#[async_trait]
impl SessionReceiver for ChannelReceiver {
    async fn next_event(&mut self) -> Result<Option<Inbound>, StreamError> {
        match self.rx.recv().await {
            Some(Ok(inbound)) => Ok(Some(inbound)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

pub fn text(value: &str) -> Scripted {
    Ok(Ok(ServerEvent::TextPart(value.to_string())))
}

pub fn audio(bytes: &[u8]) -> Scripted {
    Ok(Ok(ServerEvent::AudioPart(bytes.to_vec())))
}

pub fn boundary() -> Scripted {
    Ok(Ok(ServerEvent::TurnBoundary))
}

pub fn undecodable() -> Scripted {
    Ok(Err(EventDecodeError("unexpected token".to_string())))
}

/// Transport that hands out one scripted session
pub struct MockTransport {
    pub connects: AtomicUsize,
    fail_connect: bool,
    session: Mutex<Option<LiveSession>>,
    pub sent: Arc<Mutex<Vec<AudioFrame>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Session whose sender fails after `fail_after` frames (if set)
    pub fn new(receiver: ChannelReceiver, fail_after: Option<usize>) -> Self {
        let mut sender = RecordingSender::new();
        sender.fail_after = fail_after;
        let sent = Arc::clone(&sender.sent);
        let closed = Arc::clone(&sender.closed);

        Self {
            connects: AtomicUsize::new(0),
            fail_connect: false,
            session: Mutex::new(Some(LiveSession::new(Box::new(sender), Box::new(receiver)))),
            sent,
            closed,
        }
    }

    /// Session whose first send never completes
    pub fn hanging(receiver: ChannelReceiver) -> Self {
        let closed = Arc::new(AtomicBool::new(false));
        let sender = HangingSender {
            closed: Arc::clone(&closed),
        };

        Self {
            connects: AtomicUsize::new(0),
            fail_connect: false,
            session: Mutex::new(Some(LiveSession::new(Box::new(sender), Box::new(receiver)))),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed,
        }
    }

    pub fn refusing() -> Self {
        let (_, receiver) = ChannelReceiver::new();
        Self {
            fail_connect: true,
            ..Self::new(receiver, None)
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.sent.lock().unwrap().iter().map(|f| f.sequence()).collect()
    }
}

#[async_trait]
impl LiveTransport for MockTransport {
    async fn connect(&self, _config: &SessionConfig) -> Result<LiveSession, ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(ConnectionError("connection refused".to_string()));
        }
        self.session
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ConnectionError("session already used".to_string()))
    }
}

/// Sink that keeps everything it receives
#[derive(Clone, Default)]
pub struct CollectingSink {
    pub texts: Arc<Mutex<Vec<String>>>,
    pub audio: Arc<Mutex<Vec<u8>>>,
    pub turns: Arc<Mutex<Vec<usize>>>,
}

impl ResponseSink for CollectingSink {
    fn on_text(&mut self, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }

    fn on_audio(&mut self, pcm: &[u8]) {
        self.audio.lock().unwrap().extend_from_slice(pcm);
    }

    fn on_turn_complete(&mut self, content: usize) {
        self.turns.lock().unwrap().push(content);
    }
}
