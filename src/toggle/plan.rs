//! Toggle decision logic
//!
//! Speakers and microphone are coupled: muting the speakers always mutes
//! the microphone, but unmuting them only brings the microphone back when it
//! was not muted on purpose (the lock marker is absent).

use crate::audio::Device;

/// What a single run was asked to toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleRequest {
    /// Toggle the default sink (no arguments)
    Speaker,
    /// Toggle the default source (`-m`)
    Microphone,
}

impl ToggleRequest {
    /// Device whose mute state is queried and flipped
    pub fn device(self) -> Device {
        match self {
            ToggleRequest::Speaker => Device::Sink,
            ToggleRequest::Microphone => Device::Source,
        }
    }
}

impl std::fmt::Display for ToggleRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToggleRequest::Speaker => write!(f, "speaker"),
            ToggleRequest::Microphone => write!(f, "microphone"),
        }
    }
}

/// Change to apply to the lock marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Acquire,
    Release,
}

/// A single mute request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub device: Device,
    pub mute: bool,
}

/// Everything one run does after reading the current mute state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Applied before any mutation is issued
    pub lock: Option<LockAction>,
    /// Issued in order; the requested device is always last
    pub mutations: Vec<Mutation>,
}

/// Decide what to do given the requested device's current mute state.
///
/// `locked` only matters when unmuting the speakers.
pub fn plan(request: ToggleRequest, muted: bool, locked: bool) -> Plan {
    let mut lock = None;
    let mut mutations = Vec::with_capacity(2);

    match request {
        ToggleRequest::Speaker => {
            if !muted {
                mutations.push(Mutation { device: Device::Source, mute: true });
            } else if !locked {
                mutations.push(Mutation { device: Device::Source, mute: false });
            }
        }
        ToggleRequest::Microphone => {
            if muted {
                lock = Some(LockAction::Release);
                mutations.push(Mutation { device: Device::Sink, mute: false });
            } else {
                lock = Some(LockAction::Acquire);
            }
        }
    }

    mutations.push(Mutation {
        device: request.device(),
        mute: !muted,
    });

    Plan { lock, mutations }
}
