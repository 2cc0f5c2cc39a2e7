//! Microphone lock marker
//!
//! A zero-byte file in the cache directory records that the microphone was
//! muted on purpose, so a later speaker unmute leaves it muted.

mod marker;

pub use marker::LockMarker;
