//! Existence-only lock file
//!
//! Every operation is best effort: I/O failures are logged at debug level
//! and otherwise ignored, and a marker without a resolved path does nothing.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Handle to the microphone lock marker file
#[derive(Debug, Clone)]
pub struct LockMarker {
    path: Option<PathBuf>,
}

impl LockMarker {
    /// Create a marker handle for the given path
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Path of the marker file, if resolved
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create the marker file if it does not exist yet
    pub fn acquire(&self) {
        let Some(path) = &self.path else {
            debug!("no lock path resolved, skipping acquire");
            return;
        };

        match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o700)
            .open(path)
        {
            Ok(_) => debug!(?path, "microphone lock acquired"),
            Err(e) => debug!(?path, error = %e, "failed to create microphone lock"),
        }
    }

    /// Remove the marker file if it exists
    pub fn release(&self) {
        let Some(path) = &self.path else {
            debug!("no lock path resolved, skipping release");
            return;
        };

        match std::fs::remove_file(path) {
            Ok(()) => debug!(?path, "microphone lock released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!(?path, error = %e, "failed to remove microphone lock"),
        }
    }

    /// Check whether the marker file exists
    pub fn is_present(&self) -> bool {
        self.path.as_deref().is_some_and(Path::exists)
    }
}
