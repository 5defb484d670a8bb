uniffi::setup_scaffolding!();

pub mod bridge;
pub mod controller;
pub mod errors;
pub mod logging;
pub mod objects;

pub use bridge::{ForeignSensorService, HealthBridge, SessionEvents};
pub use controller::{ViewObserver, WorkoutController};
pub use errors::HeatherError;
pub use objects::{RunState, WorkoutControl, ViewSnapshot};
