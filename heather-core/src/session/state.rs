use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WorkoutState {
    #[default]
    Idle,
    Running,
    Paused,
    /// Transient: collapses back to `Idle` as soon as cleanup is done.
    Ended,
}

/// User intents a display can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Start,
    Pause,
    Resume,
    End,
}

impl WorkoutState {
    pub fn controls(&self) -> &'static [Control] {
        match self {
            WorkoutState::Idle => &[Control::Start],
            WorkoutState::Running => &[Control::Pause, Control::End],
            WorkoutState::Paused => &[Control::Resume, Control::End],
            WorkoutState::Ended => &[],
        }
    }

    pub fn allows(&self, control: Control) -> bool {
        self.controls().contains(&control)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, WorkoutState::Running | WorkoutState::Paused)
    }
}

impl fmt::Display for WorkoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkoutState::Idle => write!(f, "idle"),
            WorkoutState::Running => write!(f, "running"),
            WorkoutState::Paused => write!(f, "paused"),
            WorkoutState::Ended => write!(f, "ended"),
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Start => write!(f, "Start"),
            Control::Pause => write!(f, "Pause"),
            Control::Resume => write!(f, "Resume"),
            Control::End => write!(f, "End"),
        }
    }
}

/// Everything a display is allowed to read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub run_state: WorkoutState,
    pub elapsed_seconds: u64,
    pub elapsed_time_text: String,
    pub heart_rate: u32,
}
