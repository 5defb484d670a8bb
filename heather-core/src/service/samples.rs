//! Sample and statistics types delivered by the sensor service.

use chrono::{DateTime, Utc};

const HEART_RATE_IDENTIFIER: &str = "HKQuantityTypeIdentifierHeartRate";
const ACTIVE_ENERGY_IDENTIFIER: &str = "HKQuantityTypeIdentifierActiveEnergyBurned";
const DISTANCE_IDENTIFIER: &str = "HKQuantityTypeIdentifierDistanceWalkingRunning";
const STEP_COUNT_IDENTIFIER: &str = "HKQuantityTypeIdentifierStepCount";
const WORKOUT_IDENTIFIER: &str = "HKWorkoutTypeIdentifier";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuantityType {
    HeartRate,
    ActiveEnergyBurned,
    DistanceWalkingRunning,
    StepCount,
    Other(String),
}

impl QuantityType {
    pub fn identifier(&self) -> &str {
        match self {
            QuantityType::HeartRate => HEART_RATE_IDENTIFIER,
            QuantityType::ActiveEnergyBurned => ACTIVE_ENERGY_IDENTIFIER,
            QuantityType::DistanceWalkingRunning => DISTANCE_IDENTIFIER,
            QuantityType::StepCount => STEP_COUNT_IDENTIFIER,
            QuantityType::Other(id) => id,
        }
    }

    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            HEART_RATE_IDENTIFIER => QuantityType::HeartRate,
            ACTIVE_ENERGY_IDENTIFIER => QuantityType::ActiveEnergyBurned,
            DISTANCE_IDENTIFIER => QuantityType::DistanceWalkingRunning,
            STEP_COUNT_IDENTIFIER => QuantityType::StepCount,
            other => QuantityType::Other(other.to_string()),
        }
    }
}

/// Data types named in an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Workout,
    Quantity(QuantityType),
}

impl DataType {
    pub fn identifier(&self) -> &str {
        match self {
            DataType::Workout => WORKOUT_IDENTIFIER,
            DataType::Quantity(q) => q.identifier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    CountPerMinute,
    CountPerSecond,
    Other(String),
}

impl Unit {
    pub fn parse(unit: &str) -> Self {
        match unit.trim() {
            "count/min" | "bpm" => Unit::CountPerMinute,
            "count/s" | "Hz" => Unit::CountPerSecond,
            other => Unit::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn count_per_minute(value: f64) -> Self {
        Quantity {
            value,
            unit: Unit::CountPerMinute,
        }
    }

    /// Value in count/min, or `None` if the unit is not a frequency.
    pub fn in_count_per_minute(&self) -> Option<f64> {
        match self.unit {
            Unit::CountPerMinute => Some(self.value),
            Unit::CountPerSecond => Some(self.value * 60.0),
            Unit::Other(_) => None,
        }
    }
}

/// Aggregated statistics for one quantity type, as reported by a collection callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub quantity_type: QuantityType,
    pub most_recent: Option<Quantity>,
    pub most_recent_date: Option<DateTime<Utc>>,
}

impl Statistics {
    pub fn heart_rate(bpm: f64, at: DateTime<Utc>) -> Self {
        Statistics {
            quantity_type: QuantityType::HeartRate,
            most_recent: Some(Quantity::count_per_minute(bpm)),
            most_recent_date: Some(at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateSample {
    pub bpm: u32,
    pub timestamp: DateTime<Utc>,
}

impl HeartRateSample {
    /// Extracts the most recent heart rate reading. Anything that is not a
    /// finite, non-negative heart rate in a frequency unit yields `None`.
    pub fn from_statistics(stats: &Statistics) -> Option<Self> {
        if stats.quantity_type != QuantityType::HeartRate {
            return None;
        }
        let bpm = stats.most_recent.as_ref()?.in_count_per_minute()?;
        if !bpm.is_finite() || bpm < 0.0 || bpm > u32::MAX as f64 {
            return None;
        }
        Some(HeartRateSample {
            bpm: bpm as u32,
            timestamp: stats.most_recent_date.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heart_rate_is_truncated_to_whole_beats() {
        let stats = Statistics::heart_rate(72.9, Utc::now());
        assert_eq!(HeartRateSample::from_statistics(&stats).map(|s| s.bpm), Some(72));
    }

    #[test]
    fn count_per_second_is_converted() {
        let stats = Statistics {
            quantity_type: QuantityType::HeartRate,
            most_recent: Some(Quantity {
                value: 1.5,
                unit: Unit::CountPerSecond,
            }),
            most_recent_date: None,
        };
        assert_eq!(HeartRateSample::from_statistics(&stats).map(|s| s.bpm), Some(90));
    }

    #[test]
    fn unusable_readings_are_dropped() {
        let now = Utc::now();
        let missing = Statistics {
            quantity_type: QuantityType::HeartRate,
            most_recent: None,
            most_recent_date: None,
        };
        let wrong_unit = Statistics {
            quantity_type: QuantityType::HeartRate,
            most_recent: Some(Quantity {
                value: 80.0,
                unit: Unit::Other("kcal".into()),
            }),
            most_recent_date: None,
        };
        let other_type = Statistics {
            quantity_type: QuantityType::StepCount,
            most_recent: Some(Quantity::count_per_minute(80.0)),
            most_recent_date: None,
        };
        for stats in [
            missing,
            wrong_unit,
            other_type,
            Statistics::heart_rate(f64::NAN, now),
            Statistics::heart_rate(-3.0, now),
        ] {
            assert!(HeartRateSample::from_statistics(&stats).is_none(), "{stats:?}");
        }
    }

    #[test]
    fn identifiers_round_trip_known_types() {
        assert_eq!(
            QuantityType::from_identifier("HKQuantityTypeIdentifierHeartRate"),
            QuantityType::HeartRate
        );
        assert_eq!(
            QuantityType::from_identifier("HKQuantityTypeIdentifierBodyMass"),
            QuantityType::Other("HKQuantityTypeIdentifierBodyMass".into())
        );
        assert_eq!(DataType::Workout.identifier(), "HKWorkoutTypeIdentifier");
        assert_eq!(Unit::parse("count/min"), Unit::CountPerMinute);
    }
}
