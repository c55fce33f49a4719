use std::hint::black_box;

use crate::clock::Clock;
use crate::error::{ConfigError, WorkloadFailure};
use crate::workload::Workload;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// One second of calibration, eleven seconds of measurement.
    #[default]
    Standard,
    /// A tenth of the standard durations, for smoke runs.
    Quick,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Standard => "standard",
            Profile::Quick => "quick",
        }
    }

    pub fn policy(&self) -> Policy {
        match self {
            Profile::Standard => Policy::default(),
            Profile::Quick => Policy {
                calibration_threshold_us: 100_000,
                target_us: 1_100_000,
                ..Policy::default()
            },
        }
    }
}

/// Numeric policy of the calibrating controller.
#[derive(Clone, Debug, PartialEq)]
pub struct Policy {
    /// Calibration stops at the first block lasting at least this long.
    pub calibration_threshold_us: u64,
    /// Duration the measurement block is scaled to. Set above the nominal
    /// ten seconds so rounding never lands the run short of it.
    pub target_us: u64,
    /// Smallest iteration count the measurement block may use.
    pub min_iterations: u32,
    /// Real-time length of the input stream one unit processes.
    pub reference_unit_secs: f64,
    pub score_multiplier: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            calibration_threshold_us: 1_000_000,
            target_us: 11_000_000,
            min_iterations: 10,
            reference_unit_secs: 1.5,
            score_multiplier: 1000.0,
        }
    }
}

impl Policy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calibration_threshold_us == 0 {
            return Err(ConfigError::ZeroCalibrationThreshold);
        }
        if self.target_us == 0 {
            return Err(ConfigError::ZeroTarget);
        }
        if self.min_iterations == 0 {
            return Err(ConfigError::ZeroFloor);
        }
        if !(self.reference_unit_secs.is_finite() && self.reference_unit_secs > 0.0) {
            return Err(ConfigError::BadReferencePeriod(self.reference_unit_secs));
        }
        if !(self.score_multiplier.is_finite() && self.score_multiplier > 0.0) {
            return Err(ConfigError::BadScoreMultiplier(self.score_multiplier));
        }
        Ok(())
    }
}

/// Result of one timed block.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    /// Wall time spent in the block, up to the abort point on failure.
    pub duration_us: u64,
    pub failure: Option<WorkloadFailure>,
}

impl RunOutcome {
    pub fn did_fail(&self) -> bool {
        self.failure.is_some()
    }
}

/// Run the workload `iterations` times between two clock samples.
///
/// Stops at the first failing call without attempting the rest; the clock is
/// sampled again either way so the partial duration is still reported.
pub fn run_timed<W, C>(workload: &mut W, clock: &C, iterations: u32) -> RunOutcome
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    let mut failure = None;

    let t0 = clock.now_micros();
    for _ in 0..iterations {
        if let Err(e) = black_box(workload.run_one_unit()) {
            failure = Some(e);
            break;
        }
    }
    let t1 = clock.now_micros();

    RunOutcome {
        duration_us: t1.saturating_sub(t0),
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeClock, ScriptedWorkload};

    #[test]
    fn timed_block_reports_full_duration() {
        let clock = FakeClock::new();
        let mut w = ScriptedWorkload::new(&clock, 300);
        let out = run_timed(&mut w, &clock, 7);
        assert_eq!(out.duration_us, 2_100);
        assert!(!out.did_fail());
        assert_eq!(w.run_count(), 7);
    }

    #[test]
    fn timed_block_stops_at_first_failure() {
        let clock = FakeClock::new();
        let mut w = ScriptedWorkload::new(&clock, 100).fail_at_run(3);
        let out = run_timed(&mut w, &clock, 10);
        assert!(out.did_fail());
        // Calls 1..=3 ran, the rest were never attempted.
        assert_eq!(out.duration_us, 300);
        assert_eq!(w.run_count(), 3);
        assert_eq!(w.calls(), &[Call::Run, Call::Run, Call::Run]);
    }

    #[test]
    fn timed_block_measures_difference_not_absolute_time() {
        let clock = FakeClock::new();
        clock.set(1_700_000_000_000_000);
        let mut w = ScriptedWorkload::new(&clock, 40);
        let out = run_timed(&mut w, &clock, 5);
        assert_eq!(out.duration_us, 200);
        assert_eq!(clock.now_micros(), 1_700_000_000_000_200);
    }

    #[test]
    fn timed_block_samples_clock_twice() {
        let clock = FakeClock::new();
        let mut w = ScriptedWorkload::new(&clock, 1).fail_at_run(1);
        let _ = run_timed(&mut w, &clock, 5);
        assert_eq!(clock.reads(), 2);
    }

    #[test]
    fn regressing_clock_saturates_to_zero() {
        struct Backwards(std::cell::Cell<u64>);
        impl Clock for Backwards {
            fn now_micros(&self) -> u64 {
                let v = self.0.get();
                self.0.set(v.saturating_sub(50));
                v
            }
        }
        let clock = FakeClock::new();
        let mut w = ScriptedWorkload::new(&clock, 1);
        let out = run_timed(&mut w, &Backwards(std::cell::Cell::new(1_000)), 2);
        assert_eq!(out.duration_us, 0);
    }

    #[test]
    fn standard_policy_is_valid() {
        assert!(Profile::Standard.policy().validate().is_ok());
        assert!(Profile::Quick.policy().validate().is_ok());
    }

    #[test]
    fn quick_profile_keeps_score_constants() {
        let q = Profile::Quick.policy();
        let s = Profile::Standard.policy();
        assert_eq!(q.min_iterations, s.min_iterations);
        assert_eq!(q.reference_unit_secs, s.reference_unit_secs);
        assert_eq!(q.score_multiplier, s.score_multiplier);
        assert!(q.target_us < s.target_us);
    }

    #[test]
    fn policy_rejects_degenerate_values() {
        let p = Policy {
            calibration_threshold_us: 0,
            ..Policy::default()
        };
        assert_eq!(p.validate(), Err(ConfigError::ZeroCalibrationThreshold));

        let p = Policy {
            min_iterations: 0,
            ..Policy::default()
        };
        assert_eq!(p.validate(), Err(ConfigError::ZeroFloor));

        let p = Policy {
            reference_unit_secs: f64::NAN,
            ..Policy::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ConfigError::BadReferencePeriod(_))
        ));
    }
}
