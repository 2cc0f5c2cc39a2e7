//! Toggle module
//!
//! Decides the new mute state from the current one and drives a single run
//! through its phases:
//! - Connecting: waiting for the audio server
//! - Deciding: querying the requested device and applying the lock rule
//! - Mutating: issuing mute requests one at a time
//! - Disconnecting, then Terminated or Failed

mod machine;
mod plan;

pub use machine::Toggle;
pub use plan::ToggleRequest;
