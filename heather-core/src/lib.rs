pub mod config;
pub mod error;
pub mod runtime;
pub mod service;
pub mod session;
pub mod view;

pub use config::{ActivityType, ControllerConfig, LocationType, WorkoutConfiguration};
pub use error::{ControllerError, ServiceError};
pub use session::{Control, ViewState, WorkoutManager, WorkoutState};
pub use view::DisplayAdapter;
