//! Audio server access
//!
//! `AudioServer` is the seam between the toggle logic and the sound server.
//! `PulseClient` implements it over the PulseAudio native protocol.

mod pulse;
mod server;

pub use pulse::PulseClient;
pub use server::{AudioError, AudioServer, Device};
