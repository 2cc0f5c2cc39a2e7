//! mute: toggle speaker or microphone mute on the default PulseAudio devices
//!
//! Without arguments the default sink is toggled, and the default source
//! follows it. With `-m` only the microphone is toggled, and a lock file in
//! the cache directory remembers that it was muted on purpose so that a
//! later speaker unmute leaves it muted.

mod audio;
mod cli;
mod config;
mod lock;
mod toggle;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::audio::PulseClient;
use crate::cli::Args;
use crate::config::Config;
use crate::toggle::{Toggle, ToggleRequest};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn"))
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            debug!(error = %e, "invalid arguments");
            eprintln!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    match run(args.request()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mute: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(request: ToggleRequest) -> Result<()> {
    let config = Config::load();
    info!(?config.lock_path, "configuration loaded");

    let mut toggle = Toggle::new(request, &config);
    let result = toggle.run(PulseClient::connect(&config.client_name)).await;
    info!(phase = %toggle.phase(), "toggle finished");

    Ok(result?)
}
