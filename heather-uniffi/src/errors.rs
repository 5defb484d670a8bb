use heather::{ControllerError, ServiceError};
use thiserror::Error as ThisError;
use uniffi::Error;

#[derive(Debug, ThisError, Error)]
#[non_exhaustive]
pub enum HeatherError {
    #[error("error: {0}")]
    Common(String),
}

impl From<anyhow::Error> for HeatherError {
    fn from(e: anyhow::Error) -> Self {
        HeatherError::Common(e.to_string())
    }
}

impl From<ControllerError> for HeatherError {
    fn from(e: ControllerError) -> Self {
        HeatherError::Common(e.to_string())
    }
}

impl From<ServiceError> for HeatherError {
    fn from(e: ServiceError) -> Self {
        HeatherError::Common(e.to_string())
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for HeatherError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        HeatherError::Common(e.reason)
    }
}

impl From<String> for HeatherError {
    fn from(s: String) -> Self {
        HeatherError::Common(s)
    }
}
