use heather::{Control, ViewState, WorkoutState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum RunState {
    NotStarted,
    Running,
    Paused,
}

impl From<WorkoutState> for RunState {
    fn from(state: WorkoutState) -> Self {
        match state {
            WorkoutState::Running => RunState::Running,
            WorkoutState::Paused => RunState::Paused,
            WorkoutState::Idle | WorkoutState::Ended => RunState::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum WorkoutControl {
    Start,
    Pause,
    Resume,
    End,
}

impl From<Control> for WorkoutControl {
    fn from(control: Control) -> Self {
        match control {
            Control::Start => WorkoutControl::Start,
            Control::Pause => WorkoutControl::Pause,
            Control::Resume => WorkoutControl::Resume,
            Control::End => WorkoutControl::End,
        }
    }
}

impl From<WorkoutControl> for Control {
    fn from(control: WorkoutControl) -> Self {
        match control {
            WorkoutControl::Start => Control::Start,
            WorkoutControl::Pause => Control::Pause,
            WorkoutControl::Resume => Control::Resume,
            WorkoutControl::End => Control::End,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ViewSnapshot {
    pub run_state: RunState,
    pub elapsed_seconds: u64,
    pub elapsed_time_text: String,
    pub heart_rate: u32,
}

impl From<&ViewState> for ViewSnapshot {
    fn from(view: &ViewState) -> Self {
        ViewSnapshot {
            run_state: view.run_state.into(),
            elapsed_seconds: view.elapsed_seconds,
            elapsed_time_text: view.elapsed_time_text.clone(),
            heart_rate: view.heart_rate,
        }
    }
}
