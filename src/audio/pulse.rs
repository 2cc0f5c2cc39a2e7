//! PulseAudio client on top of the libpulse threaded mainloop
//!
//! The mainloop thread runs the protocol. Context and operation callbacks
//! only forward results over channels, and the async methods await them
//! with the mainloop unlocked.

use async_trait::async_trait;
use libpulse_binding::callbacks::ListResult;
use libpulse_binding::context::{Context, FlagSet, State};
use libpulse_binding::error::PAErr;
use libpulse_binding::mainloop::threaded::Mainloop;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::server::{AudioError, AudioServer, Device};

/// Outcome of a by-name device info lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Found(bool),
    Missing,
    Failed,
}

/// Connection to a PulseAudio (or pipewire-pulse) server
pub struct PulseClient {
    // Dropped before the mainloop.
    context: Context,
    mainloop: Mainloop,
    /// Wakes up on every context state change
    state_rx: mpsc::UnboundedReceiver<()>,
    connected: bool,
}

impl PulseClient {
    /// Connect to the default server and wait for the context to become ready
    pub async fn connect(client_name: &str) -> Result<Self, AudioError> {
        let mut mainloop = Mainloop::new().ok_or(AudioError::Setup("mainloop creation"))?;
        let mut context =
            Context::new(&mainloop, client_name).ok_or(AudioError::Setup("context creation"))?;

        let (state_tx, state_rx) = mpsc::unbounded_channel();
        context.set_state_callback(Some(Box::new(move || {
            let _ = state_tx.send(());
        })));

        context
            .connect(None, FlagSet::NOFLAGS, None)
            .map_err(|e| AudioError::Connect(describe(e)))?;
        mainloop
            .start()
            .map_err(|e| AudioError::Connect(describe(e)))?;

        let mut client = Self {
            context,
            mainloop,
            state_rx,
            connected: true,
        };

        loop {
            if client.state_rx.recv().await.is_none() {
                return Err(AudioError::Connect("state notifications closed".to_string()));
            }
            match client.state() {
                State::Ready => break,
                State::Failed | State::Terminated => {
                    return Err(AudioError::Connect(client.last_error()));
                }
                state => debug!(?state, "context state changed"),
            }
        }

        info!(client_name, "connected to audio server");
        Ok(client)
    }

    fn state(&mut self) -> State {
        self.mainloop.lock();
        let state = self.context.get_state();
        self.mainloop.unlock();
        state
    }

    fn last_error(&mut self) -> String {
        self.mainloop.lock();
        let err = self.context.errno();
        self.mainloop.unlock();
        describe(err)
    }

    /// Wait for an operation reply, bailing out if the connection drops first
    async fn wait<T>(&mut self, mut reply: oneshot::Receiver<T>) -> Result<T, AudioError> {
        loop {
            let notified = tokio::select! {
                result = &mut reply => {
                    return result
                        .map_err(|_| AudioError::Connect("operation cancelled".to_string()));
                }
                notified = self.state_rx.recv() => notified,
            };

            if notified.is_none() {
                return Err(AudioError::Connect("state notifications closed".to_string()));
            }
            if let State::Failed | State::Terminated = self.state() {
                return Err(AudioError::Connect(self.last_error()));
            }
        }
    }

    async fn query(&mut self, device: Device, name: &str) -> Result<bool, AudioError> {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);

        self.mainloop.lock();
        {
            let introspector = self.context.introspect();
            match device {
                Device::Sink => {
                    introspector.get_sink_info_by_name(name, move |result| {
                        if let Some(tx) = tx.take() {
                            let _ = tx.send(lookup(result, |info| info.mute));
                        }
                    });
                }
                Device::Source => {
                    introspector.get_source_info_by_name(name, move |result| {
                        if let Some(tx) = tx.take() {
                            let _ = tx.send(lookup(result, |info| info.mute));
                        }
                    });
                }
            }
        }
        self.mainloop.unlock();

        match self.wait(rx).await? {
            Lookup::Found(mute) => {
                debug!(%device, name, mute, "queried mute state");
                Ok(mute)
            }
            Lookup::Missing => Err(AudioError::Query {
                device,
                message: format!("no device named {name}"),
            }),
            Lookup::Failed => Err(AudioError::Query {
                device,
                message: self.last_error(),
            }),
        }
    }

    async fn mutate(&mut self, device: Device, name: &str, mute: bool) -> Result<(), AudioError> {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        let callback: Box<dyn FnMut(bool)> = Box::new(move |success: bool| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(success);
            }
        });

        self.mainloop.lock();
        {
            let mut introspector = self.context.introspect();
            match device {
                Device::Sink => introspector.set_sink_mute_by_name(name, mute, Some(callback)),
                Device::Source => introspector.set_source_mute_by_name(name, mute, Some(callback)),
            };
        }
        self.mainloop.unlock();

        if !self.wait(rx).await? {
            return Err(AudioError::Mutation {
                device,
                message: self.last_error(),
            });
        }

        debug!(%device, name, mute, "mute state set");
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;

        self.mainloop.lock();
        self.context.disconnect();
        self.mainloop.unlock();
        self.mainloop.stop();
        debug!("disconnected from audio server");
    }
}

#[async_trait(?Send)]
impl AudioServer for PulseClient {
    async fn get_source_mute(&mut self, name: &str) -> Result<bool, AudioError> {
        self.query(Device::Source, name).await
    }

    async fn get_sink_mute(&mut self, name: &str) -> Result<bool, AudioError> {
        self.query(Device::Sink, name).await
    }

    async fn set_source_mute(&mut self, name: &str, mute: bool) -> Result<(), AudioError> {
        self.mutate(Device::Source, name, mute).await
    }

    async fn set_sink_mute(&mut self, name: &str, mute: bool) -> Result<(), AudioError> {
        self.mutate(Device::Sink, name, mute).await
    }

    async fn disconnect(&mut self) {
        self.shutdown();
    }
}

impl Drop for PulseClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reduce a list callback result to the first device's mute flag
fn lookup<T>(result: ListResult<T>, mute_of: impl FnOnce(T) -> bool) -> Lookup {
    match result {
        ListResult::Item(info) => Lookup::Found(mute_of(info)),
        ListResult::End => Lookup::Missing,
        ListResult::Error => Lookup::Failed,
    }
}

fn describe(err: PAErr) -> String {
    err.to_string().unwrap_or_else(|| format!("error code {}", err.0))
}
