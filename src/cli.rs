//! Command line arguments

use clap::Parser;

use crate::toggle::ToggleRequest;

/// Printed to standard error for any unsupported invocation
pub const USAGE: &str = "usage: mute [-m]";

/// Toggle speaker mute, or microphone mute with `-m`
#[derive(Debug, Parser)]
#[command(name = "mute", disable_help_flag = true, disable_version_flag = true)]
pub struct Args {
    /// Toggle the default microphone instead of the speakers
    #[arg(short = 'm')]
    pub microphone: bool,
}

impl Args {
    /// The device this invocation toggles
    pub fn request(&self) -> ToggleRequest {
        if self.microphone {
            ToggleRequest::Microphone
        } else {
            ToggleRequest::Speaker
        }
    }
}
