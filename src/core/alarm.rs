//! Directional threshold evaluation

use marine_sens_types::{AlarmLevel, ThresholdDirection, Thresholds};

/// Stateless comparison of a value against thresholds
///
/// There is no hysteresis: a value exactly on a limit is in alarm, one
/// just past it is not.
pub struct AlarmEvaluator;

impl AlarmEvaluator {
    /// Alarm level of `value` under `thresholds`
    ///
    /// Never returns [`AlarmLevel::Stale`]; staleness is decided by the
    /// freshness check.
    pub fn evaluate(value: f64, thresholds: &Thresholds) -> AlarmLevel {
        if !thresholds.enabled || !value.is_finite() {
            return AlarmLevel::Normal;
        }
        match thresholds.direction {
            ThresholdDirection::Below => {
                if thresholds.critical.min.map_or(false, |limit| value <= limit) {
                    AlarmLevel::Critical
                } else if thresholds.warning.min.map_or(false, |limit| value <= limit) {
                    AlarmLevel::Warning
                } else {
                    AlarmLevel::Normal
                }
            }
            ThresholdDirection::Above => {
                if thresholds.critical.max.map_or(false, |limit| value >= limit) {
                    AlarmLevel::Critical
                } else if thresholds.warning.max.map_or(false, |limit| value >= limit) {
                    AlarmLevel::Warning
                } else {
                    AlarmLevel::Normal
                }
            }
        }
    }

    /// Merge an evaluated level with the freshness verdict
    ///
    /// Stale replaces normal but never hides a warning or critical level.
    pub fn with_freshness(level: AlarmLevel, stale: bool) -> AlarmLevel {
        if stale && level < AlarmLevel::Warning {
            AlarmLevel::Stale
        } else {
            level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_voltage_scenario() {
        let thresholds = Thresholds::below(10.5, 11.0);
        assert_eq!(AlarmEvaluator::evaluate(10.0, &thresholds), AlarmLevel::Critical);
        assert_eq!(AlarmEvaluator::evaluate(10.8, &thresholds), AlarmLevel::Warning);
        assert_eq!(AlarmEvaluator::evaluate(12.0, &thresholds), AlarmLevel::Normal);
    }

    #[test]
    fn test_limits_are_inclusive() {
        let below = Thresholds::below(10.5, 11.0);
        assert_eq!(AlarmEvaluator::evaluate(10.5, &below), AlarmLevel::Critical);
        assert_eq!(AlarmEvaluator::evaluate(11.0, &below), AlarmLevel::Warning);

        let above = Thresholds::above(105.0, 95.0);
        assert_eq!(AlarmEvaluator::evaluate(95.0, &above), AlarmLevel::Warning);
        assert_eq!(AlarmEvaluator::evaluate(105.0, &above), AlarmLevel::Critical);
        assert_eq!(AlarmEvaluator::evaluate(80.0, &above), AlarmLevel::Normal);
    }

    #[test]
    fn test_disabled_thresholds_never_alarm() {
        let thresholds = Thresholds::below(10.5, 11.0).disabled();
        assert_eq!(AlarmEvaluator::evaluate(1.0, &thresholds), AlarmLevel::Normal);
    }

    #[test]
    fn test_freshness_merge() {
        assert_eq!(AlarmEvaluator::with_freshness(AlarmLevel::Normal, true), AlarmLevel::Stale);
        assert_eq!(
            AlarmEvaluator::with_freshness(AlarmLevel::Critical, true),
            AlarmLevel::Critical
        );
        assert_eq!(AlarmEvaluator::with_freshness(AlarmLevel::Warning, false), AlarmLevel::Warning);
    }
}
