//! Asynchronous notifications pushed by the sensor service.

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::mpsc;

use super::samples::Statistics;
use crate::error::ServiceError;

/// Session states as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    NotStarted,
    Prepared,
    Running,
    Paused,
    Ended,
    Stopped,
    /// A raw state code this crate has no model for.
    Unrecognized(i64),
}

impl SessionState {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => SessionState::NotStarted,
            2 => SessionState::Running,
            3 => SessionState::Ended,
            4 => SessionState::Paused,
            5 => SessionState::Prepared,
            6 => SessionState::Stopped,
            other => SessionState::Unrecognized(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
        date: DateTime<Utc>,
    },
    Failed(ServiceError),
    DataCollected(Vec<Statistics>),
}

/// A session event tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMessage {
    pub session_id: u64,
    pub event: SessionEvent,
}

/// Callback target handed to the service when a session is opened.
///
/// Cheap to clone and safe to use from any thread; events are queued for
/// the controller task and applied there in order.
#[derive(Debug, Clone)]
pub struct EventSink {
    session_id: u64,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl EventSink {
    pub fn new(session_id: u64, tx: mpsc::UnboundedSender<SessionMessage>) -> Self {
        Self { session_id, tx }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Queues an event. Returns `false` once the controller is gone.
    pub fn send(&self, event: SessionEvent) -> bool {
        let delivered = self
            .tx
            .send(SessionMessage {
                session_id: self.session_id,
                event,
            })
            .is_ok();
        if !delivered {
            debug!(
                "Dropping event for session {}: controller stopped",
                self.session_id
            );
        }
        delivered
    }

    pub fn state_changed(&self, from: SessionState, to: SessionState, date: DateTime<Utc>) -> bool {
        self.send(SessionEvent::StateChanged { from, to, date })
    }

    pub fn failed(&self, error: ServiceError) -> bool {
        self.send(SessionEvent::Failed(error))
    }

    pub fn collected(&self, statistics: Vec<Statistics>) -> bool {
        self.send(SessionEvent::DataCollected(statistics))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_map_to_states() {
        assert_eq!(SessionState::from_raw(1), SessionState::NotStarted);
        assert_eq!(SessionState::from_raw(3), SessionState::Ended);
        assert_eq!(SessionState::from_raw(5), SessionState::Prepared);
        assert_eq!(SessionState::from_raw(42), SessionState::Unrecognized(42));
        assert_eq!(SessionState::from_raw(4), SessionState::Paused);
    }

    #[test]
    fn sink_tags_events_with_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(7, tx);
        assert!(sink.failed(ServiceError::SessionControl("nope".into())));
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.session_id, 7);
        assert!(matches!(msg.event, SessionEvent::Failed(_)));

        drop(rx);
        assert!(!sink.collected(vec![]));
        assert!(sink.is_closed());
    }
}
