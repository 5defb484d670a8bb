//! Contract with the platform's sensor/session service.
//!
//! The service owns the physical sensors, authorization prompts and
//! workout persistence. The controller only sees the narrow surface below:
//! requests go out through [`SensorService`] and [`SessionHandle`], results
//! come back asynchronously through the [`EventSink`] handed over when a
//! session is opened.

mod events;
pub mod mock;
mod samples;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::WorkoutConfiguration;
use crate::error::ServiceError;

pub use events::{EventSink, SessionEvent, SessionMessage, SessionState};
pub use samples::{DataType, HeartRateSample, Quantity, QuantityType, Statistics, Unit};

#[async_trait]
pub trait SensorService: Send + Sync {
    /// Asks for permission to write `share` and read `read`. Resolves to
    /// whether access was granted.
    async fn request_authorization(
        &self,
        share: &[DataType],
        read: &[DataType],
    ) -> Result<bool, ServiceError>;

    /// Opens a new session. All state changes and collected data for it
    /// must be reported through `events`.
    fn open_session(
        &self,
        config: &WorkoutConfiguration,
        events: EventSink,
    ) -> Result<Arc<dyn SessionHandle>, ServiceError>;
}

/// One open session. Control requests must not block: outcomes are
/// reported later through the session's [`EventSink`], an `Err` only means
/// the request was rejected outright.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    fn start_activity(&self, at: DateTime<Utc>) -> Result<(), ServiceError>;

    fn pause(&self) -> Result<(), ServiceError>;

    fn resume(&self) -> Result<(), ServiceError>;

    fn end(&self) -> Result<(), ServiceError>;

    async fn begin_collection(&self, at: DateTime<Utc>) -> Result<(), ServiceError>;

    async fn end_collection(&self, at: DateTime<Utc>) -> Result<(), ServiceError>;

    async fn finish_workout(&self) -> Result<(), ServiceError>;
}
