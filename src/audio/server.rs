//! Audio server interface and errors

use async_trait::async_trait;
use thiserror::Error;

/// Kind of device whose mute flag is read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// Output device (speakers, headphones)
    Sink,
    /// Input device (microphone)
    Source,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Sink => write!(f, "sink"),
            Device::Source => write!(f, "source"),
        }
    }
}

/// Errors reported while talking to the audio server
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("{0} failed")]
    Setup(&'static str),

    #[error("connection failure: {0}")]
    Connect(String),

    #[error("failed to get {device} information: {message}")]
    Query { device: Device, message: String },

    #[error("failed to set {device} mute: {message}")]
    Mutation { device: Device, message: String },
}

/// Name-addressed mute operations on an audio server.
///
/// Calls are issued one at a time from a single task, so implementations do
/// not need to be `Send`.
#[async_trait(?Send)]
pub trait AudioServer {
    /// Read the mute flag of the named source
    async fn get_source_mute(&mut self, name: &str) -> Result<bool, AudioError>;

    /// Read the mute flag of the named sink
    async fn get_sink_mute(&mut self, name: &str) -> Result<bool, AudioError>;

    /// Set the mute flag of the named source
    async fn set_source_mute(&mut self, name: &str, mute: bool) -> Result<(), AudioError>;

    /// Set the mute flag of the named sink
    async fn set_sink_mute(&mut self, name: &str, mute: bool) -> Result<(), AudioError>;

    /// Close the connection. Calling it more than once is harmless.
    async fn disconnect(&mut self);
}
