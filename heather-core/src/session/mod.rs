//! Session module for the workout lifecycle.
//!
//! This module provides [`WorkoutManager`], the handle to the controller
//! task that drives a workout through idle, running, paused and ended,
//! keeps the elapsed-time accumulator and republishes heart rate samples
//! as a [`ViewState`].

mod controller;
mod elapsed;
mod format;
mod manager;
mod state;
mod ticker;

pub use elapsed::ElapsedTimeAccumulator;
pub use format::format_elapsed;
pub use manager::WorkoutManager;
pub use state::{Control, ViewState, WorkoutState};
