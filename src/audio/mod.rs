pub mod backend;
pub mod file;
pub mod microphone;

pub use backend::{
    samples_to_bytes, AudioEncoding, AudioFrame, DeviceConfig, DeviceFactory, DeviceInfo,
    DeviceProvider, DeviceSource, InputDevice,
};
pub use file::{AudioFile, WavFileInput, WavFileProvider};
pub use microphone::{Microphone, MicrophoneProvider};
