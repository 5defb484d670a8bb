//! A stand-in sensor service that produces a plausible heart rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heather::service::{
    DataType, EventSink, Quantity, QuantityType, SensorService, SessionHandle, SessionState,
    Statistics, Unit,
};
use heather::{ServiceError, WorkoutConfiguration};
use log::{debug, info};
use rand::Rng;
use tokio::task::JoinHandle;

pub struct SimulatedService {
    grant_authorization: bool,
    resting_bpm: u32,
    sample_interval: Duration,
}

impl SimulatedService {
    pub fn new(grant_authorization: bool, resting_bpm: u32, sample_interval: Duration) -> Self {
        Self {
            grant_authorization,
            resting_bpm,
            sample_interval,
        }
    }
}

#[async_trait]
impl SensorService for SimulatedService {
    async fn request_authorization(
        &self,
        share: &[DataType],
        read: &[DataType],
    ) -> Result<bool, ServiceError> {
        info!(
            "Simulated authorization prompt: share {:?}, read {:?}",
            share.iter().map(DataType::identifier).collect::<Vec<_>>(),
            read.iter().map(DataType::identifier).collect::<Vec<_>>()
        );
        Ok(self.grant_authorization)
    }

    fn open_session(
        &self,
        config: &WorkoutConfiguration,
        events: EventSink,
    ) -> Result<Arc<dyn SessionHandle>, ServiceError> {
        info!(
            "Simulated session {} opened for {} ({})",
            events.session_id(),
            config.activity_type,
            config.location_type
        );
        Ok(Arc::new(SimulatedSession {
            events,
            resting_bpm: self.resting_bpm,
            sample_interval: self.sample_interval,
            sampling_allowed: self.grant_authorization,
            paused: Arc::new(AtomicBool::new(false)),
            current: Mutex::new(SessionState::NotStarted),
            sampler: Mutex::new(None),
        }))
    }
}

struct SimulatedSession {
    events: EventSink,
    resting_bpm: u32,
    sample_interval: Duration,
    sampling_allowed: bool,
    paused: Arc<AtomicBool>,
    current: Mutex<SessionState>,
    sampler: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedSession {
    fn transition(&self, to: SessionState) {
        let from = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, to)
        };
        self.events.state_changed(from, to, Utc::now());
    }

    fn stop_sampler(&self) {
        let sampler = self
            .sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = sampler {
            task.abort();
        }
    }
}

/// Drifts the previous reading towards a target that rises with effort.
fn next_bpm(previous: f64, target: f64) -> f64 {
    let noise: f64 = rand::rng().random_range(-2.0..=2.0);
    (previous + (target - previous) * 0.15 + noise).clamp(40.0, 200.0)
}

#[async_trait]
impl SessionHandle for SimulatedSession {
    fn start_activity(&self, _at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.transition(SessionState::Prepared);
        self.transition(SessionState::Running);
        Ok(())
    }

    fn pause(&self) -> Result<(), ServiceError> {
        self.paused.store(true, Ordering::SeqCst);
        self.transition(SessionState::Paused);
        Ok(())
    }

    fn resume(&self) -> Result<(), ServiceError> {
        self.paused.store(false, Ordering::SeqCst);
        self.transition(SessionState::Running);
        Ok(())
    }

    fn end(&self) -> Result<(), ServiceError> {
        self.paused.store(true, Ordering::SeqCst);
        self.transition(SessionState::Ended);
        Ok(())
    }

    async fn begin_collection(&self, _at: DateTime<Utc>) -> Result<(), ServiceError> {
        if !self.sampling_allowed {
            debug!("Heart rate not authorized, simulated session collects nothing");
            return Ok(());
        }
        let events = self.events.clone();
        let paused = self.paused.clone();
        let interval = self.sample_interval;
        let resting = self.resting_bpm as f64;
        let task = tokio::spawn(async move {
            let mut bpm = resting;
            let mut active_samples = 0u32;
            loop {
                tokio::time::sleep(interval).await;
                if paused.load(Ordering::SeqCst) {
                    bpm = next_bpm(bpm, resting);
                    continue;
                }
                active_samples = active_samples.saturating_add(1);
                let effort = (active_samples as f64 * 2.0).min(80.0);
                bpm = next_bpm(bpm, resting + effort);
                let now = Utc::now();
                let energy = Statistics {
                    quantity_type: QuantityType::ActiveEnergyBurned,
                    most_recent: Some(Quantity {
                        value: 0.1,
                        unit: Unit::Other("kcal".into()),
                    }),
                    most_recent_date: Some(now),
                };
                if !events.collected(vec![Statistics::heart_rate(bpm, now), energy]) {
                    break;
                }
            }
        });
        if let Some(previous) = self
            .sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task)
        {
            previous.abort();
        }
        Ok(())
    }

    async fn end_collection(&self, _at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.stop_sampler();
        Ok(())
    }

    async fn finish_workout(&self) -> Result<(), ServiceError> {
        info!("Simulated workout {} saved", self.events.session_id());
        Ok(())
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        self.stop_sampler();
    }
}
