//! Configuration loading and management

use std::ffi::OsString;
use std::path::PathBuf;

/// File name of the microphone lock marker inside the cache directory
pub const LOCK_FILE_NAME: &str = "mute_microphone_lock";

/// Symbolic name of the server's default output device
pub const DEFAULT_SINK: &str = "@DEFAULT_SINK@";

/// Symbolic name of the server's default input device
pub const DEFAULT_SOURCE: &str = "@DEFAULT_SOURCE@";

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the microphone lock marker, if one could be resolved
    pub lock_path: Option<PathBuf>,

    /// Name the client announces to the audio server
    pub client_name: String,

    /// Sink addressed in speaker mode
    pub sink_name: String,

    /// Source addressed in microphone mode
    pub source_name: String,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Self {
        Self::from_vars(
            std::env::var_os("XDG_CACHE_HOME"),
            std::env::var_os("HOME"),
        )
    }

    /// Build configuration from explicit `XDG_CACHE_HOME` and `HOME` values
    pub fn from_vars(cache_home: Option<OsString>, home: Option<OsString>) -> Self {
        Self {
            lock_path: resolve_lock_path(cache_home, home),
            client_name: env!("CARGO_PKG_NAME").to_string(),
            sink_name: DEFAULT_SINK.to_string(),
            source_name: DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Resolve the lock marker path, preferring `XDG_CACHE_HOME` over `~/.cache`.
///
/// Returns `None` when neither variable is usable or the path would not fit
/// in `PATH_MAX` bytes including the terminating NUL.
fn resolve_lock_path(cache_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    let path = match cache_home.filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir).join(LOCK_FILE_NAME),
        None => {
            let home = home.filter(|dir| !dir.is_empty())?;
            PathBuf::from(home).join(".cache").join(LOCK_FILE_NAME)
        }
    };

    if path.as_os_str().len() >= libc::PATH_MAX as usize {
        return None;
    }

    Some(path)
}
