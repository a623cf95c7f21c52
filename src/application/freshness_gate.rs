// Freshness gate - Decides whether a sample may override setpoint-derived display values
use crate::domain::telemetry::{Origin, Sample};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct FreshnessGate {
    window: Duration,
}

impl Default for FreshnessGate {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_WINDOW)
    }
}

impl FreshnessGate {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True iff the sample is real and younger than the window. Timestamps ahead
    /// of `now` (bridge clock skew) count as age zero.
    pub fn is_trusted(&self, sample: &Sample, now: DateTime<Utc>) -> bool {
        if sample.origin != Origin::Real {
            return false;
        }
        match now.signed_duration_since(sample.timestamp).to_std() {
            Ok(age) => age < self.window,
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn sample_aged(now: DateTime<Utc>, age_ms: i64, origin: Origin) -> Sample {
        Sample::new(now - TimeDelta::milliseconds(age_ms), 5.0, 0.5, origin)
    }

    #[test]
    fn test_fresh_real_sample_is_trusted() {
        let gate = FreshnessGate::default();
        let now = Utc::now();
        assert!(gate.is_trusted(&sample_aged(now, 0, Origin::Real), now));
        assert!(gate.is_trusted(&sample_aged(now, 4_999, Origin::Real), now));
    }

    #[test]
    fn test_sample_at_or_beyond_window_is_not_trusted() {
        let gate = FreshnessGate::default();
        let now = Utc::now();
        assert!(!gate.is_trusted(&sample_aged(now, 5_000, Origin::Real), now));
        assert!(!gate.is_trusted(&sample_aged(now, 60_000, Origin::Real), now));
    }

    #[test]
    fn test_simulated_sample_is_never_trusted() {
        let gate = FreshnessGate::default();
        let now = Utc::now();
        assert!(!gate.is_trusted(&sample_aged(now, 0, Origin::Simulated), now));
        assert!(!gate.is_trusted(&sample_aged(now, -1_000, Origin::Simulated), now));
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let gate = FreshnessGate::new(Duration::from_millis(100));
        let now = Utc::now();
        assert!(gate.is_trusted(&sample_aged(now, -2_000, Origin::Real), now));
    }
}
