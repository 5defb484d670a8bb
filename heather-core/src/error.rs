use thiserror::Error as ThisError;

/// Failures reported by the sensor/session service.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ServiceError {
    #[error("authorization failed: {0}")]
    Authorization(String),
    #[error("failed to open workout session: {0}")]
    SessionOpen(String),
    #[error("session request rejected: {0}")]
    SessionControl(String),
    #[error("data collection failed: {0}")]
    Collection(String),
    #[error("sensor service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ControllerError {
    #[error("workout controller has stopped")]
    Stopped,
    #[error("service reported unrecognized session state {0}")]
    UnrecognizedSessionState(i64),
}
