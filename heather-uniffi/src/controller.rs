use std::sync::Arc;

use heather::runtime::global_runtime;
use heather::{ControllerConfig, WorkoutManager};
use log::{debug, info};

use crate::bridge::{ForeignSensorService, HealthBridge};
use crate::errors::HeatherError;
use crate::objects::{ViewSnapshot, WorkoutControl};

#[uniffi::export(callback_interface)]
pub trait ViewObserver: Send + Sync {
    fn view_state_changed(&self, snapshot: ViewSnapshot);
}

/// Workout controller handed to the host app. Every call returns
/// immediately; the host learns about the outcome through a
/// [`ViewObserver`] or by polling [`WorkoutController::snapshot`].
#[derive(uniffi::Object)]
pub struct WorkoutController {
    manager: WorkoutManager,
}

#[uniffi::export]
impl WorkoutController {
    #[uniffi::constructor]
    pub fn new(bridge: Arc<dyn HealthBridge>, tick_interval_ms: u64) -> Arc<Self> {
        let mut config = ControllerConfig::from_env();
        config.tick_interval_ms = tick_interval_ms;
        info!("Creating workout controller with {:?}", config);
        let service = Arc::new(ForeignSensorService::new(bridge));
        let manager = WorkoutManager::spawn_on(global_runtime().handle(), service, config);
        Arc::new(Self { manager })
    }

    pub fn request_authorization(&self) -> Result<(), HeatherError> {
        Ok(self.manager.request_authorization()?)
    }

    pub fn start(&self) -> Result<(), HeatherError> {
        Ok(self.manager.start()?)
    }

    pub fn pause(&self) -> Result<(), HeatherError> {
        Ok(self.manager.pause()?)
    }

    pub fn resume(&self) -> Result<(), HeatherError> {
        Ok(self.manager.resume()?)
    }

    pub fn end(&self) -> Result<(), HeatherError> {
        Ok(self.manager.end()?)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot::from(&self.manager.snapshot())
    }

    pub fn available_controls(&self) -> Vec<WorkoutControl> {
        self.manager
            .snapshot()
            .run_state
            .controls()
            .iter()
            .map(|c| WorkoutControl::from(*c))
            .collect()
    }

    /// Delivers the current view, then every change, until the controller
    /// stops.
    pub fn observe(&self, observer: Box<dyn ViewObserver>) {
        let mut view = self.manager.subscribe();
        let current = ViewSnapshot::from(&*view.borrow_and_update());
        global_runtime().spawn(async move {
            observer.view_state_changed(current);
            while view.changed().await.is_ok() {
                let snapshot = ViewSnapshot::from(&*view.borrow_and_update());
                observer.view_state_changed(snapshot);
            }
            debug!("View observer detached");
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::bridge::tests::RecordingBridge;
    use crate::objects::RunState;

    fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !check() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    struct Collect(Arc<Mutex<Vec<ViewSnapshot>>>);

    impl ViewObserver for Collect {
        fn view_state_changed(&self, snapshot: ViewSnapshot) {
            self.0.lock().unwrap().push(snapshot);
        }
    }

    #[test]
    fn controls_follow_the_workout() {
        let bridge = Arc::new(RecordingBridge::default());
        let controller = WorkoutController::new(bridge.clone(), 100);
        assert_eq!(controller.available_controls(), vec![WorkoutControl::Start]);

        controller.start().unwrap();
        wait_until("running", || controller.snapshot().run_state == RunState::Running);
        assert_eq!(
            controller.available_controls(),
            vec![WorkoutControl::Pause, WorkoutControl::End]
        );

        controller.pause().unwrap();
        wait_until("paused", || controller.snapshot().run_state == RunState::Paused);
        assert_eq!(
            controller.available_controls(),
            vec![WorkoutControl::Resume, WorkoutControl::End]
        );

        controller.end().unwrap();
        wait_until("reset", || {
            controller.snapshot().run_state == RunState::NotStarted
        });
        wait_until("finished", || bridge.calls().contains(&"finish 1".to_string()));
    }

    #[test]
    fn observer_sees_heart_rate() {
        let bridge = Arc::new(RecordingBridge::default());
        let controller = WorkoutController::new(bridge.clone(), 100);
        let seen = Arc::new(Mutex::new(Vec::new()));
        controller.observe(Box::new(Collect(seen.clone())));

        controller.start().unwrap();
        wait_until("session", || bridge.events().is_some());
        bridge.events().unwrap().statistics_collected(
            "HKQuantityTypeIdentifierHeartRate".into(),
            Some(131.0),
            "count/min".into(),
            0,
        );

        wait_until("heart rate", || {
            seen.lock().unwrap().iter().any(|s| s.heart_rate == 131)
        });
        let first = seen.lock().unwrap()[0].clone();
        assert_eq!(first.run_state, RunState::NotStarted);
        assert_eq!(first.heart_rate, 0);
        controller.end().unwrap();
    }
}
