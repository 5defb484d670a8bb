use std::sync::Arc;

use log::{debug, error};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

use super::controller::{self, Command, Controller, Internal};
use super::state::ViewState;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::service::SensorService;

/// Handle to a running workout controller.
///
/// Every request returns as soon as it is queued; effects show up later in
/// the published [`ViewState`]. Clones share the same controller, which
/// stops once the last handle is dropped.
#[derive(Clone)]
pub struct WorkoutManager {
    commands: mpsc::UnboundedSender<Command>,
    internal: mpsc::UnboundedSender<Internal>,
    view: watch::Receiver<ViewState>,
}

impl WorkoutManager {
    /// Spawns a controller on the current tokio runtime.
    pub fn spawn(service: Arc<dyn SensorService>, config: ControllerConfig) -> Self {
        Self::spawn_on(&Handle::current(), service, config)
    }

    pub fn spawn_on(
        runtime: &Handle,
        service: Arc<dyn SensorService>,
        config: ControllerConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ViewState::default());

        debug!("Spawning workout controller with {:?}", config);
        let controller = Controller::new(service, config, view_tx, internal_tx.clone(), session_tx);
        runtime.spawn(async move {
            match controller::run(controller, command_rx, session_rx, internal_rx).await {
                Ok(()) => debug!("Workout controller stopped"),
                Err(e) => error!("Workout controller aborted: {}", e),
            }
        });

        Self {
            commands: command_tx,
            internal: internal_tx,
            view: view_rx,
        }
    }

    /// Asks the service for workout write and heart rate read access. The
    /// outcome is only logged.
    pub fn request_authorization(&self) -> Result<(), ControllerError> {
        self.send(Command::RequestAuthorization)
    }

    pub fn start(&self) -> Result<(), ControllerError> {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> Result<(), ControllerError> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), ControllerError> {
        self.send(Command::Resume)
    }

    pub fn end(&self) -> Result<(), ControllerError> {
        self.send(Command::End)
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.clone()
    }

    pub fn snapshot(&self) -> ViewState {
        self.view.borrow().clone()
    }

    /// Resolves once every request and service event queued before this
    /// call has been applied.
    pub async fn flush(&self) -> Result<(), ControllerError> {
        let (ack, done) = oneshot::channel();
        self.internal
            .send(Internal::Flush(ack))
            .map_err(|_| ControllerError::Stopped)?;
        done.await.map_err(|_| ControllerError::Stopped)
    }

    pub fn is_stopped(&self) -> bool {
        self.commands.is_closed()
    }

    /// Resolves when the controller task has exited.
    pub async fn stopped(&self) {
        self.commands.closed().await
    }

    fn send(&self, cmd: Command) -> Result<(), ControllerError> {
        self.commands.send(cmd).map_err(|_| ControllerError::Stopped)
    }
}
