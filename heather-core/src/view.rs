//! Consumer side of the published view state.
//!
//! A display reads [`ViewState`] snapshots, offers the controls valid for
//! the current run state and forwards presses to the controller.

use log::debug;
use tokio::sync::watch;

use crate::error::ControllerError;
use crate::session::{Control, ViewState, WorkoutManager};

pub struct DisplayAdapter {
    manager: WorkoutManager,
    view: watch::Receiver<ViewState>,
    appeared: bool,
}

impl DisplayAdapter {
    pub fn new(manager: WorkoutManager) -> Self {
        let view = manager.subscribe();
        Self {
            manager,
            view,
            appeared: false,
        }
    }

    /// Called whenever the display is shown. Authorization is only
    /// requested the first time.
    pub fn on_appear(&mut self) -> Result<(), ControllerError> {
        if self.appeared {
            return Ok(());
        }
        self.appeared = true;
        self.manager.request_authorization()
    }

    pub fn snapshot(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn controls(&self) -> &'static [Control] {
        self.view.borrow().run_state.controls()
    }

    /// Forwards a press if the control is currently offered. Returns
    /// whether it was forwarded.
    pub fn press(&self, control: Control) -> Result<bool, ControllerError> {
        let run_state = self.view.borrow().run_state;
        if !run_state.allows(control) {
            debug!("{} is not available while {}", control, run_state);
            return Ok(false);
        }
        match control {
            Control::Start => self.manager.start()?,
            Control::Pause => self.manager.pause()?,
            Control::Resume => self.manager.resume()?,
            Control::End => self.manager.end()?,
        }
        Ok(true)
    }

    /// Waits for the next published change.
    pub async fn changed(&mut self) -> Result<ViewState, ControllerError> {
        self.view
            .changed()
            .await
            .map_err(|_| ControllerError::Stopped)?;
        Ok(self.view.borrow_and_update().clone())
    }

    pub fn manager(&self) -> &WorkoutManager {
        &self.manager
    }
}

pub fn elapsed_label(view: &ViewState) -> String {
    format!("Elapsed: {}", view.elapsed_time_text)
}

pub fn heart_rate_label(view: &ViewState) -> String {
    format!("HR: {}", view.heart_rate)
}
