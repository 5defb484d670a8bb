//! The controller task. Owns the workout state, the elapsed-time
//! accumulator and the published view; every mutation happens here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use super::elapsed::ElapsedTimeAccumulator;
use super::format::format_elapsed;
use super::state::{ViewState, WorkoutState};
use super::ticker::Ticker;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::service::{
    DataType, EventSink, HeartRateSample, QuantityType, SensorService, SessionEvent,
    SessionHandle, SessionMessage, SessionState, Statistics,
};

/// Ended sessions kept waiting for the service's confirmation. Past this
/// the oldest is finalized without it.
const MAX_PENDING_FINALIZATIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    RequestAuthorization,
    Start,
    Pause,
    Resume,
    End,
}

#[derive(Debug)]
pub(crate) enum Internal {
    Tick { ticker_id: u64 },
    Flush(oneshot::Sender<()>),
    Finalized { session_id: u64 },
}

struct ActiveSession {
    id: u64,
    handle: Arc<dyn SessionHandle>,
}

pub(crate) struct Controller {
    service: Arc<dyn SensorService>,
    config: ControllerConfig,
    state: WorkoutState,
    accumulator: ElapsedTimeAccumulator,
    session: Option<ActiveSession>,
    /// Ended sessions waiting for the service to confirm before their data
    /// collection is closed.
    finalizing: HashMap<u64, Arc<dyn SessionHandle>>,
    ticker: Option<Ticker>,
    next_session_id: u64,
    next_ticker_id: u64,
    view: watch::Sender<ViewState>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    session_tx: mpsc::UnboundedSender<SessionMessage>,
}

/// Serializes commands, service events and ticks onto one task.
///
/// Commands take priority, then service events, then internal messages,
/// so a flush acknowledges only after everything queued ahead of it.
pub(crate) async fn run(
    mut controller: Controller,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut sessions: mpsc::UnboundedReceiver<SessionMessage>,
    mut internal: mpsc::UnboundedReceiver<Internal>,
) -> Result<(), ControllerError> {
    loop {
        tokio::select! {
            biased;
            cmd = commands.recv() => match cmd {
                Some(cmd) => controller.handle_command(cmd),
                None => break,
            },
            Some(msg) = sessions.recv() => controller.handle_session_message(msg)?,
            Some(msg) = internal.recv() => controller.handle_internal(msg),
        }
    }
    controller.shutdown();
    Ok(())
}

impl Controller {
    pub(crate) fn new(
        service: Arc<dyn SensorService>,
        config: ControllerConfig,
        view: watch::Sender<ViewState>,
        internal_tx: mpsc::UnboundedSender<Internal>,
        session_tx: mpsc::UnboundedSender<SessionMessage>,
    ) -> Self {
        Self {
            service,
            config,
            state: WorkoutState::Idle,
            accumulator: ElapsedTimeAccumulator::default(),
            session: None,
            finalizing: HashMap::new(),
            ticker: None,
            next_session_id: 0,
            next_ticker_id: 0,
            view,
            internal_tx,
            session_tx,
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        debug!("Command {:?} while {}", cmd, self.state);
        match cmd {
            Command::RequestAuthorization => self.request_authorization(),
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::End => self.end(),
        }
    }

    fn request_authorization(&self) {
        let service = self.service.clone();
        tokio::spawn(async move {
            let share = [DataType::Workout];
            let read = [DataType::Quantity(QuantityType::HeartRate)];
            match service.request_authorization(&share, &read).await {
                Ok(true) => info!("Authorization granted"),
                Ok(false) => warn!("Authorization denied, heart rate data will be unavailable"),
                Err(e) => error!("Authorization request failed: {}", e),
            }
        });
    }

    fn start(&mut self) {
        if self.state != WorkoutState::Idle {
            warn!("Ignoring start while {}", self.state);
            return;
        }
        info!("Starting workout");
        self.accumulator.reset();

        self.next_session_id += 1;
        let session_id = self.next_session_id;
        let sink = EventSink::new(session_id, self.session_tx.clone());
        let handle = match self.service.open_session(&self.config.workout, sink) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Could not start workout: {}", e);
                return;
            }
        };

        let now = Utc::now();
        if let Err(e) = handle.start_activity(now) {
            warn!("Service rejected start of session {}: {}", session_id, e);
        }
        let collector = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = collector.begin_collection(now).await {
                error!(
                    "Failed to begin data collection for session {}: {}",
                    session_id, e
                );
            }
        });

        self.session = Some(ActiveSession {
            id: session_id,
            handle,
        });
        self.accumulator.resume(Instant::now());
        self.state = WorkoutState::Running;
        self.start_ticker();
        self.publish();
    }

    fn pause(&mut self) {
        if self.state != WorkoutState::Running {
            warn!("Ignoring pause while {}", self.state);
            return;
        }
        self.ticker = None;
        info!("Pausing workout");
        if let Some(session) = &self.session {
            if let Err(e) = session.handle.pause() {
                warn!("Service rejected pause of session {}: {}", session.id, e);
            }
        }
        let total = self.accumulator.pause(Instant::now());
        debug!("Accumulated {:?} of active time", total);
        self.state = WorkoutState::Paused;
        self.publish();
    }

    fn resume(&mut self) {
        if self.state != WorkoutState::Paused {
            warn!("Ignoring resume while {}", self.state);
            return;
        }
        info!("Resuming workout");
        self.accumulator.resume(Instant::now());
        if let Some(session) = &self.session {
            if let Err(e) = session.handle.resume() {
                warn!("Service rejected resume of session {}: {}", session.id, e);
            }
        }
        self.state = WorkoutState::Running;
        self.start_ticker();
        self.publish();
    }

    fn end(&mut self) {
        self.ticker = None;
        match self.session.take() {
            Some(session) => {
                info!("Ending workout session {}", session.id);
                match session.handle.end() {
                    Ok(()) => {
                        self.finalizing.insert(session.id, session.handle);
                        self.trim_finalizing();
                    }
                    Err(e) => warn!(
                        "Service rejected end of session {}, dropping it unfinalized: {}",
                        session.id, e
                    ),
                }
            }
            None => debug!("End without an open session, resetting view"),
        }
        self.state = WorkoutState::Ended;
        self.collapse_to_idle();
    }

    fn collapse_to_idle(&mut self) {
        self.accumulator.reset();
        self.state = WorkoutState::Idle;
        self.reset_view();
    }

    /// Finalizes the oldest unconfirmed session once too many pile up.
    fn trim_finalizing(&mut self) {
        while self.finalizing.len() > MAX_PENDING_FINALIZATIONS {
            let Some(oldest) = self.finalizing.keys().min().copied() else {
                return;
            };
            if let Some(handle) = self.finalizing.remove(&oldest) {
                warn!("Session {} never confirmed its end, finalizing anyway", oldest);
                self.spawn_finalization(oldest, handle);
            }
        }
    }

    fn shutdown(&mut self) {
        if self.session.is_some() {
            info!("All controller handles dropped, ending the open workout");
            self.end();
        }
        self.ticker = None;
        // No confirmation can be received past this point.
        for (session_id, handle) in std::mem::take(&mut self.finalizing) {
            self.spawn_finalization(session_id, handle);
        }
        debug!("Workout controller shutting down");
    }

    fn handle_session_message(&mut self, msg: SessionMessage) -> Result<(), ControllerError> {
        let SessionMessage { session_id, event } = msg;
        match event {
            SessionEvent::StateChanged { from, to, date } => {
                self.session_state_changed(session_id, from, to, date)?
            }
            SessionEvent::Failed(e) => error!("Session {} failed: {}", session_id, e),
            SessionEvent::DataCollected(stats) => self.data_collected(session_id, &stats),
        }
        Ok(())
    }

    fn session_state_changed(
        &mut self,
        session_id: u64,
        from: SessionState,
        to: SessionState,
        date: DateTime<Utc>,
    ) -> Result<(), ControllerError> {
        debug!(
            "Session {} changed {:?} -> {:?} at {}",
            session_id, from, to, date
        );
        match to {
            SessionState::NotStarted => info!("Session {} not started", session_id),
            SessionState::Prepared => info!("Session {} prepared", session_id),
            SessionState::Running => info!("Session {} running", session_id),
            SessionState::Paused => info!("Session {} paused", session_id),
            SessionState::Stopped => info!("Session {} stopped", session_id),
            SessionState::Ended => {
                info!("Session {} ended", session_id);
                self.session_ended(session_id);
            }
            SessionState::Unrecognized(raw) => {
                error!(
                    "Session {} reported unrecognized state {}, stopping controller",
                    session_id, raw
                );
                return Err(ControllerError::UnrecognizedSessionState(raw));
            }
        }
        Ok(())
    }

    fn session_ended(&mut self, session_id: u64) {
        let handle = match self.session.take_if(|s| s.id == session_id) {
            Some(session) => {
                warn!("Session {} was ended by the service", session_id);
                self.ticker = None;
                self.state = WorkoutState::Ended;
                self.collapse_to_idle();
                Some(session.handle)
            }
            None => self.finalizing.remove(&session_id),
        };
        match handle {
            Some(handle) => self.spawn_finalization(session_id, handle),
            None => debug!("Ignoring end of unknown session {}", session_id),
        }
    }

    /// Ends data collection and saves the workout on a separate task.
    fn spawn_finalization(&self, session_id: u64, handle: Arc<dyn SessionHandle>) {
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.end_collection(Utc::now()).await {
                error!(
                    "Failed to end data collection for session {}: {}",
                    session_id, e
                );
            }
            if let Err(e) = handle.finish_workout().await {
                error!("Failed to finish workout for session {}: {}", session_id, e);
            }
            let _ = tx.send(Internal::Finalized { session_id });
        });
    }

    fn data_collected(&mut self, session_id: u64, stats: &[Statistics]) {
        if !self.session.as_ref().is_some_and(|s| s.id == session_id) {
            debug!("Dropping data for inactive session {}", session_id);
            return;
        }
        for sample in stats.iter().filter_map(HeartRateSample::from_statistics) {
            debug!("Heart rate {} bpm at {}", sample.bpm, sample.timestamp);
            self.view.send_if_modified(|view| {
                if view.heart_rate == sample.bpm {
                    return false;
                }
                view.heart_rate = sample.bpm;
                true
            });
        }
    }

    fn handle_internal(&mut self, msg: Internal) {
        match msg {
            Internal::Tick { ticker_id } => {
                if self.ticker.as_ref().is_some_and(|t| t.id() == ticker_id) {
                    self.publish();
                } else {
                    debug!("Discarding tick from cancelled ticker {}", ticker_id);
                }
            }
            Internal::Flush(ack) => {
                let _ = ack.send(());
            }
            Internal::Finalized { session_id } => {
                debug!("Session {} finalized", session_id);
                if self.session.is_none() {
                    self.reset_view();
                }
            }
        }
    }

    fn start_ticker(&mut self) {
        self.next_ticker_id += 1;
        self.ticker = Some(Ticker::spawn(
            self.next_ticker_id,
            self.config.tick_interval(),
            self.internal_tx.clone(),
        ));
    }

    /// Publishes run state and elapsed time; observers are only woken when
    /// something visible changed.
    fn publish(&self) {
        let run_state = self.state;
        let (elapsed_seconds, elapsed_time_text) = if run_state.is_active() {
            let seconds = self.accumulator.elapsed(Instant::now()).as_secs();
            (seconds, format_elapsed(seconds))
        } else {
            (0, String::new())
        };
        self.view.send_if_modified(|view| {
            if view.run_state == run_state
                && view.elapsed_seconds == elapsed_seconds
                && view.elapsed_time_text == elapsed_time_text
            {
                return false;
            }
            view.run_state = run_state;
            view.elapsed_seconds = elapsed_seconds;
            view.elapsed_time_text = elapsed_time_text;
            true
        });
    }

    fn reset_view(&self) {
        self.view.send_if_modified(|view| {
            if *view == ViewState::default() {
                return false;
            }
            *view = ViewState::default();
            true
        });
    }
}
