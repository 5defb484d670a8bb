//! Sensor service implemented by the host app.
//!
//! The host implements [`HealthBridge`] on top of the platform health
//! store and reports back through the [`SessionEvents`] object it receives
//! when a session is opened.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heather::service::{
    DataType, EventSink, Quantity, QuantityType, SensorService, SessionHandle, SessionState,
    Statistics, Unit,
};
use heather::{ServiceError, WorkoutConfiguration};
use log::debug;

use crate::errors::HeatherError;

#[uniffi::export(with_foreign)]
pub trait HealthBridge: Send + Sync {
    /// May block until the user answers the prompt.
    fn request_authorization(
        &self,
        share: Vec<String>,
        read: Vec<String>,
    ) -> Result<bool, HeatherError>;

    fn open_session(
        &self,
        activity_type: String,
        location_type: String,
        events: Arc<SessionEvents>,
    ) -> Result<(), HeatherError>;

    fn start_activity(&self, session_id: u64, timestamp_ms: i64) -> Result<(), HeatherError>;

    fn pause(&self, session_id: u64) -> Result<(), HeatherError>;

    fn resume(&self, session_id: u64) -> Result<(), HeatherError>;

    fn end(&self, session_id: u64) -> Result<(), HeatherError>;

    /// May block until collection has started.
    fn begin_collection(&self, session_id: u64, timestamp_ms: i64) -> Result<(), HeatherError>;

    /// May block until collection has stopped.
    fn end_collection(&self, session_id: u64, timestamp_ms: i64) -> Result<(), HeatherError>;

    /// May block until the workout is saved.
    fn finish_workout(&self, session_id: u64) -> Result<(), HeatherError>;
}

fn to_datetime(timestamp_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now)
}

/// Callback target for one session. Safe to call from any thread.
#[derive(uniffi::Object)]
pub struct SessionEvents {
    sink: EventSink,
}

#[uniffi::export]
impl SessionEvents {
    pub fn session_id(&self) -> u64 {
        self.sink.session_id()
    }

    /// Reports a state transition using the platform's raw state codes.
    pub fn state_changed(&self, from: i64, to: i64, timestamp_ms: i64) -> bool {
        self.sink.state_changed(
            SessionState::from_raw(from),
            SessionState::from_raw(to),
            to_datetime(timestamp_ms),
        )
    }

    pub fn failed(&self, message: String) -> bool {
        self.sink.failed(ServiceError::SessionControl(message))
    }

    /// Reports the most recent value collected for one quantity type.
    pub fn statistics_collected(
        &self,
        type_identifier: String,
        value: Option<f64>,
        unit: String,
        timestamp_ms: i64,
    ) -> bool {
        let unit = Unit::parse(&unit);
        self.sink.collected(vec![Statistics {
            quantity_type: QuantityType::from_identifier(&type_identifier),
            most_recent: value.map(|value| Quantity { value, unit }),
            most_recent_date: Some(to_datetime(timestamp_ms)),
        }])
    }
}

pub struct ForeignSensorService {
    bridge: Arc<dyn HealthBridge>,
}

impl ForeignSensorService {
    pub fn new(bridge: Arc<dyn HealthBridge>) -> Self {
        Self { bridge }
    }
}

fn identifiers(types: &[DataType]) -> Vec<String> {
    types.iter().map(|t| t.identifier().to_string()).collect()
}

/// Runs a possibly blocking bridge call off the async workers. A call that
/// panics or is cancelled leaves the host unreachable.
async fn blocking<T, F>(call: F, wrap: fn(String) -> ServiceError) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, HeatherError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ServiceError::Unavailable(e.to_string()))?
        .map_err(|e| wrap(e.to_string()))
}

#[async_trait]
impl SensorService for ForeignSensorService {
    async fn request_authorization(
        &self,
        share: &[DataType],
        read: &[DataType],
    ) -> Result<bool, ServiceError> {
        let bridge = self.bridge.clone();
        let (share, read) = (identifiers(share), identifiers(read));
        blocking(
            move || bridge.request_authorization(share, read),
            ServiceError::Authorization,
        )
        .await
    }

    fn open_session(
        &self,
        config: &WorkoutConfiguration,
        events: EventSink,
    ) -> Result<Arc<dyn SessionHandle>, ServiceError> {
        let session_id = events.session_id();
        debug!("Opening foreign session {}", session_id);
        self.bridge
            .open_session(
                config.activity_type.to_string(),
                config.location_type.to_string(),
                Arc::new(SessionEvents { sink: events }),
            )
            .map_err(|e| ServiceError::SessionOpen(e.to_string()))?;
        Ok(Arc::new(ForeignSession {
            bridge: self.bridge.clone(),
            session_id,
        }))
    }
}

struct ForeignSession {
    bridge: Arc<dyn HealthBridge>,
    session_id: u64,
}

fn rejected(e: HeatherError) -> ServiceError {
    ServiceError::SessionControl(e.to_string())
}

#[async_trait]
impl SessionHandle for ForeignSession {
    fn start_activity(&self, at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.bridge
            .start_activity(self.session_id, at.timestamp_millis())
            .map_err(rejected)
    }

    fn pause(&self) -> Result<(), ServiceError> {
        self.bridge.pause(self.session_id).map_err(rejected)
    }

    fn resume(&self) -> Result<(), ServiceError> {
        self.bridge.resume(self.session_id).map_err(rejected)
    }

    fn end(&self) -> Result<(), ServiceError> {
        self.bridge.end(self.session_id).map_err(rejected)
    }

    async fn begin_collection(&self, at: DateTime<Utc>) -> Result<(), ServiceError> {
        let (bridge, id) = (self.bridge.clone(), self.session_id);
        blocking(
            move || bridge.begin_collection(id, at.timestamp_millis()),
            ServiceError::Collection,
        )
        .await
    }

    async fn end_collection(&self, at: DateTime<Utc>) -> Result<(), ServiceError> {
        let (bridge, id) = (self.bridge.clone(), self.session_id);
        blocking(
            move || bridge.end_collection(id, at.timestamp_millis()),
            ServiceError::Collection,
        )
        .await
    }

    async fn finish_workout(&self) -> Result<(), ServiceError> {
        let (bridge, id) = (self.bridge.clone(), self.session_id);
        blocking(move || bridge.finish_workout(id), ServiceError::Collection).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use heather::{ControllerConfig, WorkoutManager, WorkoutState};

    /// Host stand-in that records calls and echoes state changes.
    #[derive(Default)]
    pub(crate) struct RecordingBridge {
        pub(crate) calls: Mutex<Vec<String>>,
        pub(crate) events: Mutex<Option<Arc<SessionEvents>>>,
        pub(crate) deny_open: bool,
    }

    impl RecordingBridge {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn events(&self) -> Option<Arc<SessionEvents>> {
            self.events.lock().unwrap().clone()
        }
    }

    impl HealthBridge for RecordingBridge {
        fn request_authorization(
            &self,
            share: Vec<String>,
            read: Vec<String>,
        ) -> Result<bool, HeatherError> {
            self.record(format!("authorize {:?} {:?}", share, read));
            Ok(true)
        }

        fn open_session(
            &self,
            activity_type: String,
            location_type: String,
            events: Arc<SessionEvents>,
        ) -> Result<(), HeatherError> {
            if self.deny_open {
                return Err(HeatherError::Common("no sensor".into()));
            }
            self.record(format!("open {} {}", activity_type, location_type));
            *self.events.lock().unwrap() = Some(events);
            Ok(())
        }

        fn start_activity(&self, session_id: u64, _timestamp_ms: i64) -> Result<(), HeatherError> {
            self.record(format!("start {}", session_id));
            Ok(())
        }

        fn pause(&self, session_id: u64) -> Result<(), HeatherError> {
            self.record(format!("pause {}", session_id));
            Ok(())
        }

        fn resume(&self, session_id: u64) -> Result<(), HeatherError> {
            self.record(format!("resume {}", session_id));
            Ok(())
        }

        fn end(&self, session_id: u64) -> Result<(), HeatherError> {
            self.record(format!("end {}", session_id));
            if let Some(events) = self.events() {
                events.state_changed(2, 3, Utc::now().timestamp_millis());
            }
            Ok(())
        }

        fn begin_collection(&self, session_id: u64, _timestamp_ms: i64) -> Result<(), HeatherError> {
            self.record(format!("begin {}", session_id));
            Ok(())
        }

        fn end_collection(&self, session_id: u64, _timestamp_ms: i64) -> Result<(), HeatherError> {
            self.record(format!("end_collection {}", session_id));
            Ok(())
        }

        fn finish_workout(&self, session_id: u64) -> Result<(), HeatherError> {
            self.record(format!("finish {}", session_id));
            Ok(())
        }
    }

    async fn wait_for(bridge: &RecordingBridge, call: &str) {
        for _ in 0..200 {
            if bridge.calls().iter().any(|c| c == call) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{call} never happened, saw {:?}", bridge.calls());
    }

    #[tokio::test]
    async fn drives_host_through_a_workout() {
        let bridge = Arc::new(RecordingBridge::default());
        let service = Arc::new(ForeignSensorService::new(bridge.clone()));
        let manager = WorkoutManager::spawn(service, ControllerConfig::default());

        manager.request_authorization().unwrap();
        wait_for(&bridge, r#"authorize ["HKWorkoutTypeIdentifier"] ["HKQuantityTypeIdentifierHeartRate"]"#).await;

        manager.start().unwrap();
        manager.flush().await.unwrap();
        assert_eq!(manager.snapshot().run_state, WorkoutState::Running);
        wait_for(&bridge, "begin 1").await;
        assert!(bridge.calls().contains(&"open other unknown".to_string()));

        let events = bridge.events().unwrap();
        assert_eq!(events.session_id(), 1);
        events.statistics_collected(
            "HKQuantityTypeIdentifierHeartRate".into(),
            Some(88.4),
            "count/min".into(),
            Utc::now().timestamp_millis(),
        );
        manager.flush().await.unwrap();
        assert_eq!(manager.snapshot().heart_rate, 88);

        manager.end().unwrap();
        wait_for(&bridge, "finish 1").await;
        let calls = bridge.calls();
        let end_collection = calls.iter().position(|c| c == "end_collection 1").unwrap();
        let finish = calls.iter().position(|c| c == "finish 1").unwrap();
        assert!(end_collection < finish);
        assert_eq!(manager.snapshot().heart_rate, 0);
    }

    #[tokio::test]
    async fn open_failure_leaves_controller_idle() {
        let bridge = Arc::new(RecordingBridge {
            deny_open: true,
            ..Default::default()
        });
        let manager = WorkoutManager::spawn(
            Arc::new(ForeignSensorService::new(bridge.clone())),
            ControllerConfig::default(),
        );

        manager.start().unwrap();
        manager.flush().await.unwrap();
        assert_eq!(manager.snapshot().run_state, WorkoutState::Idle);
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn panicking_host_call_reports_unavailable() {
        let result: Result<(), ServiceError> =
            blocking(|| panic!("host went away"), ServiceError::Collection).await;
        assert!(matches!(result, Err(ServiceError::Unavailable(_))));

        let result: Result<(), ServiceError> = blocking(
            || Err(HeatherError::Common("busy".into())),
            ServiceError::Collection,
        )
        .await;
        assert!(matches!(result, Err(ServiceError::Collection(_))));
    }

    #[test]
    fn bad_timestamps_fall_back_to_now() {
        let before = Utc::now();
        assert!(to_datetime(i64::MAX) >= before);
        assert_eq!(to_datetime(0).timestamp_millis(), 0);
    }
}
