use chrono::Utc;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::config::{ControllerOptions, SessionConfig};
use super::stats::{SessionCounters, SessionReport, StopReason};
use crate::audio::{DeviceProvider, InputDevice};
use crate::config::Config;
use crate::error::{DeviceError, SessionError};
use crate::output::ResponseSink;
use crate::pipeline::{self, shutdown, Activity};
use crate::transport::{LiveSession, LiveTransport};

/// Lifecycle of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Closing,
    Closed,
}

/// Owns one live session and supervises its streaming activities
///
/// Capture, send and receive run concurrently inside `run`. When any of them
/// fails, send or receive finishes, or the external stop future resolves, the
/// others are cancelled and awaited for at most the grace period; then the
/// session is closed. Capture running out of input only closes the queue. The
/// unit of failure is the whole session.
pub struct SessionController {
    config: SessionConfig,
    options: ControllerOptions,
    transport: Arc<dyn LiveTransport>,
    devices: Arc<dyn DeviceProvider>,
    state: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        options: ControllerOptions,
        transport: Arc<dyn LiveTransport>,
        devices: Arc<dyn DeviceProvider>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            config,
            options,
            transport,
            devices,
            state,
        }
    }

    /// Validate settings and build a controller
    ///
    /// Invalid settings are rejected here, before any device or network call.
    pub fn from_settings(
        cfg: &Config,
        transport: Arc<dyn LiveTransport>,
        devices: Arc<dyn DeviceProvider>,
    ) -> Result<Self, SessionError> {
        let config = SessionConfig::from_settings(cfg)?;
        let options = ControllerOptions::from_settings(cfg);
        Ok(Self::new(config, options, transport, devices))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Run one session until it closes
    ///
    /// `stop` is the external cancellation request (e.g. Ctrl-C). Failures
    /// before the session is active are returned as errors; once active, the
    /// outcome is described by the report's stop reason.
    pub async fn run<S, F>(&self, mut sink: S, stop: F) -> Result<SessionReport, SessionError>
    where
        S: ResponseSink,
        F: Future<Output = ()>,
    {
        let started_at = Utc::now();
        let counters = SessionCounters::new();
        tokio::pin!(stop);

        self.transition(SessionState::Connecting);

        let opened = tokio::select! {
            opened = self.open_device() => opened,
            _ = &mut stop => {
                // A device opened after this point is dropped with the worker's result
                info!("Stop requested while opening the input device");
                self.transition(SessionState::Closed);
                return Ok(self.report(StopReason::Interrupted, &counters, started_at));
            }
        };

        let mut device = match opened {
            Ok(device) => device,
            Err(e) => {
                error!("Failed to open input device: {}", e);
                self.transition(SessionState::Closed);
                return Err(e.into());
            }
        };

        let session = tokio::select! {
            connected = self.transport.connect(&self.config) => connected,
            _ = &mut stop => {
                info!("Stop requested while connecting");
                device.close();
                self.transition(SessionState::Closed);
                return Ok(self.report(StopReason::Interrupted, &counters, started_at));
            }
        };

        let mut session = match session {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to connect: {}", e);
                device.close();
                self.transition(SessionState::Closed);
                return Err(e.into());
            }
        };

        self.transition(SessionState::Active);
        info!("Session active, start speaking (Ctrl+C to stop)");

        let reason = self
            .supervise(device, &mut session, &mut sink, stop, &counters)
            .await;

        if let Err(e) = session.close().await {
            warn!("Failed to close session cleanly: {}", e);
        }
        drop(sink);
        self.transition(SessionState::Closed);

        let report = self.report(reason, &counters, started_at);
        info!(
            reason = ?report.stop_reason,
            frames_sent = report.stats.frames_sent,
            turns = report.stats.turns_completed,
            "Session closed"
        );
        Ok(report)
    }

    async fn open_device(&self) -> Result<Box<dyn InputDevice>, DeviceError> {
        let info = self
            .devices
            .default_input_device()
            .ok_or(DeviceError::Unavailable)?;
        info!(device = %info.name, "Opening input device");

        let devices = Arc::clone(&self.devices);
        let device_config = self.config.device_config();
        tokio::task::spawn_blocking(move || devices.open(&device_config))
            .await
            .map_err(|e| DeviceError::Open(format!("device open worker failed: {}", e)))?
    }

    /// Run the three activities until the first one ends, then tear down
    async fn supervise<S, F>(
        &self,
        device: Box<dyn InputDevice>,
        session: &mut LiveSession,
        sink: &mut S,
        mut stop: std::pin::Pin<&mut F>,
        counters: &SessionCounters,
    ) -> StopReason
    where
        S: ResponseSink,
        F: Future<Output = ()>,
    {
        let (producer, consumer) = pipeline::bounded(self.options.queue_capacity);
        let (shutdown, listener) = shutdown::channel();
        let (sender, receiver) = session.halves();
        let first_exit = OnceLock::new();
        let session_id = self.config.session_id.as_str();

        // Record the first activity to end, then cancel the rest
        let finish = |activity: Activity, result: Result<(), String>| {
            let reason = match result {
                Ok(()) => StopReason::Finished(activity),
                Err(error) => {
                    error!(%activity, "{} loop failed: {}", activity, error);
                    StopReason::Failed { activity, error }
                }
            };
            let _ = first_exit.set(reason);
            if shutdown.trigger() {
                self.transition(SessionState::Closing);
            }
        };

        let capture = async {
            let result = pipeline::run_capture(
                device,
                producer,
                self.config.encoding(),
                listener.clone(),
                counters,
            )
            .instrument(info_span!("capture", session = session_id))
            .await;
            // End of input only closes the queue; send drains it and ends the session
            match result {
                Ok(()) => debug!("Capture finished"),
                Err(e) => finish(Activity::Capture, Err(e.to_string())),
            }
        };

        let send = async {
            let result = pipeline::run_send(consumer, sender, listener.clone(), counters)
                .instrument(info_span!("send", session = session_id))
                .await;
            finish(Activity::Send, result.map_err(|e| e.to_string()));
        };

        let receive = async {
            let result = pipeline::run_receive(
                receiver,
                sink,
                self.options.stall_timeout,
                listener.clone(),
                counters,
            )
            .instrument(info_span!("receive", session = session_id))
            .await;
            finish(Activity::Receive, result.map_err(|e| e.to_string()));
        };

        let interrupt = async {
            let mut listener = listener.clone();
            tokio::select! {
                _ = &mut stop => {
                    info!("Stopping...");
                    let _ = first_exit.set(StopReason::Interrupted);
                    if shutdown.trigger() {
                        self.transition(SessionState::Closing);
                    }
                }
                _ = listener.cancelled() => {}
            }
        };

        let grace = async {
            let mut listener = listener.clone();
            listener.cancelled().await;
            tokio::time::sleep(self.options.shutdown_grace).await;
        };

        tokio::select! {
            _ = async { tokio::join!(capture, send, receive, interrupt) } => {}
            _ = grace => {
                warn!(
                    "Activities still running {:?} after shutdown, forcing teardown",
                    self.options.shutdown_grace
                );
            }
        }

        first_exit.into_inner().unwrap_or(StopReason::Interrupted)
    }

    fn report(
        &self,
        stop_reason: StopReason,
        counters: &SessionCounters,
        started_at: chrono::DateTime<Utc>,
    ) -> SessionReport {
        SessionReport {
            session_id: self.config.session_id.clone(),
            stop_reason,
            stats: counters.snapshot(started_at),
        }
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = ?previous, to = ?next, "Session state changed");
        }
    }
}
