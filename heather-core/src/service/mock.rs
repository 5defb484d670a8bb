//! In-memory sensor service for tests and demos.
//!
//! Records every request it receives and lets the caller push events into
//! the most recently opened session, the same way the real service would
//! from its own callback thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use super::{
    DataType, EventSink, SensorService, SessionEvent, SessionHandle, SessionState, Statistics,
};
use crate::config::WorkoutConfiguration;
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    RequestAuthorization {
        share: Vec<DataType>,
        read: Vec<DataType>,
    },
    OpenSession {
        session_id: u64,
        config: WorkoutConfiguration,
    },
    StartActivity { session_id: u64 },
    Pause { session_id: u64 },
    Resume { session_id: u64 },
    End { session_id: u64 },
    BeginCollection { session_id: u64 },
    EndCollection { session_id: u64 },
    FinishWorkout { session_id: u64 },
}

#[derive(Default)]
struct MockState {
    calls: Vec<ServiceCall>,
    sinks: Vec<EventSink>,
    authorization: Option<Result<bool, ServiceError>>,
    fail_open: bool,
    reject_controls: bool,
    manual_transitions: bool,
}

#[derive(Clone, Default)]
pub struct MockSensorService {
    inner: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockSensorService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result handed back for authorization requests. Defaults to granted.
    pub fn set_authorization(&self, result: Result<bool, ServiceError>) {
        lock(&self.inner).authorization = Some(result);
    }

    pub fn set_fail_open(&self, fail: bool) {
        lock(&self.inner).fail_open = fail;
    }

    /// Makes pause/resume/end/start requests fail immediately.
    pub fn set_reject_controls(&self, reject: bool) {
        lock(&self.inner).reject_controls = reject;
    }

    /// When set, control requests no longer echo a state change back;
    /// the test drives transitions itself through [`Self::emit`].
    pub fn set_manual_transitions(&self, manual: bool) {
        lock(&self.inner).manual_transitions = manual;
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        lock(&self.inner).calls.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        lock(&self.inner).sinks.len()
    }

    /// Sink of the most recently opened session.
    pub fn last_sink(&self) -> Option<EventSink> {
        lock(&self.inner).sinks.last().cloned()
    }

    /// Pushes an event into the most recently opened session.
    pub fn emit(&self, event: SessionEvent) -> bool {
        match self.last_sink() {
            Some(sink) => sink.send(event),
            None => false,
        }
    }

    pub fn emit_heart_rate(&self, bpm: f64) -> bool {
        self.emit(SessionEvent::DataCollected(vec![Statistics::heart_rate(
            bpm,
            Utc::now(),
        )]))
    }
}

#[async_trait]
impl SensorService for MockSensorService {
    async fn request_authorization(
        &self,
        share: &[DataType],
        read: &[DataType],
    ) -> Result<bool, ServiceError> {
        let mut state = lock(&self.inner);
        state.calls.push(ServiceCall::RequestAuthorization {
            share: share.to_vec(),
            read: read.to_vec(),
        });
        state.authorization.clone().unwrap_or(Ok(true))
    }

    fn open_session(
        &self,
        config: &WorkoutConfiguration,
        events: EventSink,
    ) -> Result<Arc<dyn SessionHandle>, ServiceError> {
        let mut state = lock(&self.inner);
        let session_id = events.session_id();
        state.calls.push(ServiceCall::OpenSession {
            session_id,
            config: config.clone(),
        });
        if state.fail_open {
            return Err(ServiceError::SessionOpen("mock refused to open".into()));
        }
        debug!("Mock service opened session {}", session_id);
        state.sinks.push(events.clone());
        Ok(Arc::new(MockSession {
            session_id,
            events,
            service: self.inner.clone(),
            current: Mutex::new(SessionState::NotStarted),
        }))
    }
}

struct MockSession {
    session_id: u64,
    events: EventSink,
    service: Arc<Mutex<MockState>>,
    current: Mutex<SessionState>,
}

impl MockSession {
    fn control(&self, call: ServiceCall, to: SessionState) -> Result<(), ServiceError> {
        let (reject, manual) = {
            let mut state = lock(&self.service);
            state.calls.push(call);
            (state.reject_controls, state.manual_transitions)
        };
        if reject {
            return Err(ServiceError::SessionControl("mock rejected request".into()));
        }
        if !manual {
            let from = {
                let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::replace(&mut *current, to)
            };
            self.events.state_changed(from, to, Utc::now());
        }
        Ok(())
    }

    fn record(&self, call: ServiceCall) {
        lock(&self.service).calls.push(call);
    }
}

#[async_trait]
impl SessionHandle for MockSession {
    fn start_activity(&self, _at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.control(
            ServiceCall::StartActivity {
                session_id: self.session_id,
            },
            SessionState::Running,
        )
    }

    fn pause(&self) -> Result<(), ServiceError> {
        self.control(
            ServiceCall::Pause {
                session_id: self.session_id,
            },
            SessionState::Paused,
        )
    }

    fn resume(&self) -> Result<(), ServiceError> {
        self.control(
            ServiceCall::Resume {
                session_id: self.session_id,
            },
            SessionState::Running,
        )
    }

    fn end(&self) -> Result<(), ServiceError> {
        self.control(
            ServiceCall::End {
                session_id: self.session_id,
            },
            SessionState::Ended,
        )
    }

    async fn begin_collection(&self, _at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.record(ServiceCall::BeginCollection {
            session_id: self.session_id,
        });
        Ok(())
    }

    async fn end_collection(&self, _at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.record(ServiceCall::EndCollection {
            session_id: self.session_id,
        });
        Ok(())
    }

    async fn finish_workout(&self) -> Result<(), ServiceError> {
        self.record(ServiceCall::FinishWorkout {
            session_id: self.session_id,
        });
        Ok(())
    }
}
