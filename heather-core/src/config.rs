use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

const TICK_INTERVAL_ENV: &str = "HEATHER_TICK_INTERVAL_MS";
const ACTIVITY_TYPE_ENV: &str = "HEATHER_ACTIVITY_TYPE";
const LOCATION_TYPE_ENV: &str = "HEATHER_LOCATION_TYPE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[default]
    Other,
    Running,
    Walking,
    Cycling,
    Hiking,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[default]
    Unknown,
    Indoor,
    Outdoor,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Other => write!(f, "other"),
            ActivityType::Running => write!(f, "running"),
            ActivityType::Walking => write!(f, "walking"),
            ActivityType::Cycling => write!(f, "cycling"),
            ActivityType::Hiking => write!(f, "hiking"),
        }
    }
}

impl FromStr for ActivityType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "other" => Ok(ActivityType::Other),
            "running" => Ok(ActivityType::Running),
            "walking" => Ok(ActivityType::Walking),
            "cycling" => Ok(ActivityType::Cycling),
            "hiking" => Ok(ActivityType::Hiking),
            other => Err(anyhow!("unknown activity type: {}", other)),
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationType::Unknown => write!(f, "unknown"),
            LocationType::Indoor => write!(f, "indoor"),
            LocationType::Outdoor => write!(f, "outdoor"),
        }
    }
}

impl FromStr for LocationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "unknown" => Ok(LocationType::Unknown),
            "indoor" => Ok(LocationType::Indoor),
            "outdoor" => Ok(LocationType::Outdoor),
            other => Err(anyhow!("unknown location type: {}", other)),
        }
    }
}

/// What kind of workout the service should record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkoutConfiguration {
    pub activity_type: ActivityType,
    pub location_type: LocationType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub tick_interval_ms: u64,
    pub workout: WorkoutConfiguration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            workout: WorkoutConfiguration::default(),
        }
    }
}

impl ControllerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ControllerConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        debug!("Loaded controller config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Defaults overridden by `HEATHER_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `HEATHER_*` environment overrides. Unparseable values are
    /// logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = env::var(TICK_INTERVAL_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.tick_interval_ms = ms,
                _ => warn!("Ignoring invalid {}={:?}", TICK_INTERVAL_ENV, raw),
            }
        }
        if let Ok(raw) = env::var(ACTIVITY_TYPE_ENV) {
            match raw.parse() {
                Ok(activity) => self.workout.activity_type = activity,
                Err(e) => warn!("Ignoring {}: {}", ACTIVITY_TYPE_ENV, e),
            }
        }
        if let Ok(raw) = env::var(LOCATION_TYPE_ENV) {
            match raw.parse() {
                Ok(location) => self.workout.location_type = location,
                Err(e) => warn!("Ignoring {}: {}", LOCATION_TYPE_ENV, e),
            }
        }
        self
    }
}
