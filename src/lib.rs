pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use audio::{
    AudioEncoding, AudioFile, AudioFrame, DeviceConfig, DeviceFactory, DeviceProvider,
    DeviceSource, InputDevice,
};
pub use config::Config;
pub use error::{
    ConfigError, ConnectionError, DeviceError, EventDecodeError, SessionError, StreamError,
    TransmitError,
};
pub use output::{ConsoleSink, ResponseSink, TeeSink, WavSink, WavSinkConfig};
pub use session::{
    ControllerOptions, ResponseModality, SessionConfig, SessionController, SessionReport,
    SessionState, SessionStats, StopReason,
};
pub use transport::{LiveSession, LiveTransport, ServerEvent, VertexEndpoint, VertexTransport};
