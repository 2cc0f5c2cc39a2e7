//! Per-run state machine
//!
//! Owns everything one invocation needs (device names, the lock marker and
//! the current phase) and chains query, lock update and mutations strictly
//! one after another.

use std::future::Future;

use tracing::{debug, info};

use crate::audio::{AudioError, AudioServer, Device};
use crate::config::Config;
use crate::lock::LockMarker;

use super::plan::{plan, LockAction, ToggleRequest};

/// Phases of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the audio server connection to become ready
    Connecting,
    /// Querying the current mute state and choosing the new one
    Deciding,
    /// Issuing mute requests
    Mutating,
    /// Closing the connection
    Disconnecting,
    /// Finished cleanly
    Terminated,
    /// Finished after an audio server error
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Connecting => write!(f, "Connecting"),
            Phase::Deciding => write!(f, "Deciding"),
            Phase::Mutating => write!(f, "Mutating"),
            Phase::Disconnecting => write!(f, "Disconnecting"),
            Phase::Terminated => write!(f, "Terminated"),
            Phase::Failed => write!(f, "Failed"),
        }
    }
}

/// One toggle invocation
pub struct Toggle {
    request: ToggleRequest,
    phase: Phase,
    lock: LockMarker,
    sink_name: String,
    source_name: String,
}

impl Toggle {
    /// Create a run for the given request
    pub fn new(request: ToggleRequest, config: &Config) -> Self {
        Self {
            request,
            phase: Phase::Connecting,
            lock: LockMarker::new(config.lock_path.clone()),
            sink_name: config.sink_name.clone(),
            source_name: config.source_name.clone(),
        }
    }

    /// Get the current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run to completion on the server produced by `connect`.
    ///
    /// The connection is closed whether or not the toggle succeeded.
    pub async fn run<S, F>(&mut self, connect: F) -> Result<(), AudioError>
    where
        S: AudioServer,
        F: Future<Output = Result<S, AudioError>>,
    {
        info!(request = %self.request, "toggle started");

        let mut server = match connect.await {
            Ok(server) => server,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        self.transition_to(Phase::Deciding);
        let result = self.apply(&mut server).await;

        self.transition_to(Phase::Disconnecting);
        server.disconnect().await;

        match result {
            Ok(()) => {
                self.transition_to(Phase::Terminated);
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    async fn apply<S: AudioServer>(&mut self, server: &mut S) -> Result<(), AudioError> {
        let device = self.request.device();
        let muted = match device {
            Device::Sink => server.get_sink_mute(&self.sink_name).await?,
            Device::Source => server.get_source_mute(&self.source_name).await?,
        };

        let locked = self.lock.is_present();
        let plan = plan(self.request, muted, locked);
        info!(
            %device,
            muted,
            locked,
            lock_path = ?self.lock.path(),
            ?plan,
            "toggle decided"
        );

        match plan.lock {
            Some(LockAction::Acquire) => self.lock.acquire(),
            Some(LockAction::Release) => self.lock.release(),
            None => {}
        }

        self.transition_to(Phase::Mutating);
        for mutation in &plan.mutations {
            match mutation.device {
                Device::Sink => server.set_sink_mute(&self.sink_name, mutation.mute).await?,
                Device::Source => {
                    server.set_source_mute(&self.source_name, mutation.mute).await?
                }
            }
        }

        Ok(())
    }

    fn fail(&mut self, error: &AudioError) {
        info!(phase = %self.phase, %error, "toggle failed");
        self.transition_to(Phase::Failed);
    }

    /// Perform a phase transition
    fn transition_to(&mut self, next: Phase) {
        debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;

    /// Audio server state shared between a test and its fake connections
    #[derive(Debug, Default)]
    struct Devices {
        sink_muted: bool,
        source_muted: bool,
        connected: bool,
        fail_query: bool,
        fail_mutation: Option<Device>,
        mutations: Vec<(Device, bool)>,
    }

    #[derive(Clone)]
    struct FakeServer(Rc<RefCell<Devices>>);

    impl FakeServer {
        fn new(sink_muted: bool, source_muted: bool) -> Self {
            Self(Rc::new(RefCell::new(Devices {
                sink_muted,
                source_muted,
                ..Devices::default()
            })))
        }

        fn sink_muted(&self) -> bool {
            self.0.borrow().sink_muted
        }

        fn source_muted(&self) -> bool {
            self.0.borrow().source_muted
        }

        fn query(&self, device: Device) -> Result<bool, AudioError> {
            let devices = self.0.borrow();
            if devices.fail_query {
                return Err(AudioError::Query {
                    device,
                    message: "No such entity".to_string(),
                });
            }
            Ok(match device {
                Device::Sink => devices.sink_muted,
                Device::Source => devices.source_muted,
            })
        }

        fn set(&self, device: Device, mute: bool) -> Result<(), AudioError> {
            let mut devices = self.0.borrow_mut();
            if devices.fail_mutation == Some(device) {
                return Err(AudioError::Mutation {
                    device,
                    message: "Access denied".to_string(),
                });
            }
            devices.mutations.push((device, mute));
            match device {
                Device::Sink => devices.sink_muted = mute,
                Device::Source => devices.source_muted = mute,
            }
            Ok(())
        }
    }

    #[async_trait(?Send)]
    impl AudioServer for FakeServer {
        async fn get_source_mute(&mut self, name: &str) -> Result<bool, AudioError> {
            assert_eq!(name, "@DEFAULT_SOURCE@");
            self.query(Device::Source)
        }

        async fn get_sink_mute(&mut self, name: &str) -> Result<bool, AudioError> {
            assert_eq!(name, "@DEFAULT_SINK@");
            self.query(Device::Sink)
        }

        async fn set_source_mute(&mut self, name: &str, mute: bool) -> Result<(), AudioError> {
            assert_eq!(name, "@DEFAULT_SOURCE@");
            self.set(Device::Source, mute)
        }

        async fn set_sink_mute(&mut self, name: &str, mute: bool) -> Result<(), AudioError> {
            assert_eq!(name, "@DEFAULT_SINK@");
            self.set(Device::Sink, mute)
        }

        async fn disconnect(&mut self) {
            self.0.borrow_mut().connected = false;
        }
    }

    /// A cache directory and the lock marker inside it
    struct Cache {
        _dir: TempDir,
        config: Config,
    }

    impl Cache {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = Config::from_vars(Some(dir.path().as_os_str().to_owned()), None);
            Self { _dir: dir, config }
        }

        fn marker(&self) -> LockMarker {
            LockMarker::new(self.config.lock_path.clone())
        }

        fn locked(&self) -> bool {
            self.marker().is_present()
        }
    }

    fn run(
        request: ToggleRequest,
        server: &FakeServer,
        cache: &Cache,
    ) -> (Phase, Result<(), AudioError>) {
        let mut toggle = Toggle::new(request, &cache.config);
        let connection = server.clone();
        connection.0.borrow_mut().connected = true;
        let connect = async move { Ok::<_, AudioError>(connection) };
        let result = tokio_test::block_on(toggle.run(connect));
        assert!(!server.0.borrow().connected);
        (toggle.phase(), result)
    }

    fn toggle_ok(request: ToggleRequest, server: &FakeServer, cache: &Cache) {
        let (phase, result) = run(request, server, cache);
        assert!(result.is_ok());
        assert_eq!(phase, Phase::Terminated);
    }

    #[test]
    fn test_initial_phase() {
        let cache = Cache::new();
        let toggle = Toggle::new(ToggleRequest::Speaker, &cache.config);
        assert_eq!(toggle.phase(), Phase::Connecting);
    }

    #[test]
    fn test_speaker_toggle_flips_sink() {
        for sink_muted in [false, true] {
            let cache = Cache::new();
            let server = FakeServer::new(sink_muted, false);
            toggle_ok(ToggleRequest::Speaker, &server, &cache);
            assert_eq!(server.sink_muted(), !sink_muted);
        }
    }

    #[test]
    fn test_speaker_mute_forces_source_mute_and_leaves_lock() {
        for locked in [false, true] {
            let cache = Cache::new();
            if locked {
                cache.marker().acquire();
            }
            let server = FakeServer::new(false, false);
            toggle_ok(ToggleRequest::Speaker, &server, &cache);
            assert!(server.sink_muted());
            assert!(server.source_muted());
            assert_eq!(cache.locked(), locked);
        }
    }

    #[test]
    fn test_speaker_unmute_unlocked_unmutes_source() {
        let cache = Cache::new();
        let server = FakeServer::new(true, true);
        toggle_ok(ToggleRequest::Speaker, &server, &cache);
        assert!(!server.sink_muted());
        assert!(!server.source_muted());
    }

    #[test]
    fn test_speaker_unmute_locked_keeps_source_muted() {
        let cache = Cache::new();
        cache.marker().acquire();
        let server = FakeServer::new(true, true);
        toggle_ok(ToggleRequest::Speaker, &server, &cache);
        assert!(!server.sink_muted());
        assert!(server.source_muted());
        assert!(cache.locked());
    }

    #[test]
    fn test_microphone_toggle_flips_source() {
        for source_muted in [false, true] {
            let cache = Cache::new();
            let server = FakeServer::new(false, source_muted);
            toggle_ok(ToggleRequest::Microphone, &server, &cache);
            assert_eq!(server.source_muted(), !source_muted);
        }
    }

    #[test]
    fn test_microphone_unmute_releases_lock_and_unmutes_sink() {
        let cache = Cache::new();
        cache.marker().acquire();
        let server = FakeServer::new(true, true);
        toggle_ok(ToggleRequest::Microphone, &server, &cache);
        assert!(!server.source_muted());
        assert!(!server.sink_muted());
        assert!(!cache.locked());
    }

    #[test]
    fn test_microphone_mute_acquires_lock() {
        let cache = Cache::new();
        let server = FakeServer::new(false, false);
        toggle_ok(ToggleRequest::Microphone, &server, &cache);
        assert!(server.source_muted());
        assert!(!server.sink_muted());
        assert!(cache.locked());
    }

    #[test]
    fn test_mutations_are_issued_in_order() {
        let cache = Cache::new();
        let server = FakeServer::new(false, false);
        toggle_ok(ToggleRequest::Speaker, &server, &cache);
        assert_eq!(
            server.0.borrow().mutations,
            vec![(Device::Source, true), (Device::Sink, true)]
        );
    }

    #[test]
    fn test_scenario_mute_then_unmute_everything() {
        let cache = Cache::new();
        let server = FakeServer::new(false, false);

        toggle_ok(ToggleRequest::Speaker, &server, &cache);
        assert!(server.sink_muted());
        assert!(server.source_muted());
        assert!(!cache.locked());

        toggle_ok(ToggleRequest::Speaker, &server, &cache);
        assert!(!server.sink_muted());
        assert!(!server.source_muted());
    }

    #[test]
    fn test_scenario_deliberate_microphone_mute_survives_speakers() {
        let cache = Cache::new();
        let server = FakeServer::new(false, false);

        toggle_ok(ToggleRequest::Microphone, &server, &cache);
        assert!(server.source_muted());
        assert!(cache.locked());

        toggle_ok(ToggleRequest::Speaker, &server, &cache);
        assert!(server.sink_muted());
        assert!(server.source_muted());

        toggle_ok(ToggleRequest::Speaker, &server, &cache);
        assert!(!server.sink_muted());
        assert!(server.source_muted());
        assert!(cache.locked());
    }

    #[test]
    fn test_connect_failure() {
        let cache = Cache::new();
        let mut toggle = Toggle::new(ToggleRequest::Speaker, &cache.config);
        let result = tokio_test::block_on(toggle.run(async {
            Err::<FakeServer, _>(AudioError::Connect("Connection refused".to_string()))
        }));
        assert!(matches!(result, Err(AudioError::Connect(_))));
        assert_eq!(toggle.phase(), Phase::Failed);
    }

    #[test]
    fn test_query_failure_changes_nothing() {
        let cache = Cache::new();
        let server = FakeServer::new(false, false);
        server.0.borrow_mut().fail_query = true;

        let (phase, result) = run(ToggleRequest::Microphone, &server, &cache);
        assert!(matches!(result, Err(AudioError::Query { device: Device::Source, .. })));
        assert_eq!(phase, Phase::Failed);
        assert!(server.0.borrow().mutations.is_empty());
        assert!(!cache.locked());
    }

    #[test]
    fn test_mutation_failure_stops_and_disconnects() {
        let cache = Cache::new();
        let server = FakeServer::new(false, false);
        server.0.borrow_mut().fail_mutation = Some(Device::Source);

        let (phase, result) = run(ToggleRequest::Speaker, &server, &cache);
        assert!(matches!(result, Err(AudioError::Mutation { device: Device::Source, .. })));
        assert_eq!(phase, Phase::Failed);
        assert!(!server.sink_muted());
    }
}
