//! Calibration, scaling and the final measured run.
//!
//! The controller doubles the iteration count until one timed block lasts at
//! least `calibration_threshold_us`, scales that count linearly to
//! `target_us`, and times one last block of the scaled size. Any workload
//! failure ends the run without a score.

use log::{debug, info};

use crate::clock::Clock;
use crate::error::HarnessError;
use crate::harness::{run_timed, Policy};
use crate::workload::{ReleaseGuard, Workload};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationStep {
    pub iterations: u32,
    pub duration_us: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Calibration {
    /// Every block timed, in order. The last one crossed the threshold.
    pub steps: Vec<CalibrationStep>,
    pub iterations: u32,
    pub duration_us: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Score {
    pub seconds: f64,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeasuredRun {
    pub iterations: u32,
    pub duration_us: u64,
    pub score: Score,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BenchResult {
    pub calibration: Calibration,
    pub measurement: MeasuredRun,
}

/// Double the iteration count until a block reaches the calibration threshold.
pub fn calibrate<W, C>(
    workload: &mut W,
    clock: &C,
    policy: &Policy,
) -> Result<Calibration, HarnessError>
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    calibrate_from(workload, clock, policy, 1)
}

// The first timed block runs `2 * start` iterations.
fn calibrate_from<W, C>(
    workload: &mut W,
    clock: &C,
    policy: &Policy,
    start: u32,
) -> Result<Calibration, HarnessError>
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    let mut iterations = start;
    let mut steps: Vec<CalibrationStep> = Vec::new();

    loop {
        iterations = match iterations.checked_mul(2) {
            Some(n) => n,
            None => {
                return Err(HarnessError::CalibrationOverflow {
                    iterations,
                    elapsed_us: steps.last().map_or(0, |s| s.duration_us),
                })
            }
        };

        let outcome = run_timed(workload, clock, iterations);
        if let Some(source) = outcome.failure {
            return Err(HarnessError::Calibration {
                iterations,
                elapsed_us: outcome.duration_us,
                source,
            });
        }

        debug!(
            "calibration: {} iterations in {} us",
            iterations, outcome.duration_us
        );
        steps.push(CalibrationStep {
            iterations,
            duration_us: outcome.duration_us,
        });

        if outcome.duration_us >= policy.calibration_threshold_us {
            return Ok(Calibration {
                steps,
                iterations,
                duration_us: outcome.duration_us,
            });
        }
    }
}

/// Scale a calibrated count so the measured block lasts about `target_us`.
///
/// Computes `round(iterations * target_us / duration_us)` in exact integer
/// arithmetic (ties round up), then clamps to `[min_iterations, u32::MAX]`.
/// The result depends only on the three integers, never on the host's
/// floating point.
pub fn scale_iterations(policy: &Policy, iterations: u32, duration_us: u64) -> u32 {
    let d = u128::from(duration_us.max(1));
    let numer = u128::from(iterations) * u128::from(policy.target_us);
    let scaled = (numer + d / 2) / d;

    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX);
    scaled.max(policy.min_iterations)
}

/// Throughput relative to real time, times the policy multiplier.
///
/// A zero duration is treated as one microsecond to keep the score finite.
pub fn compute_score(policy: &Policy, iterations: u32, duration_us: u64) -> Score {
    let seconds = duration_us.max(1) as f64 / 1.0e6;
    let value = f64::from(iterations) / seconds
        * policy.score_multiplier
        * (1.0 / policy.reference_unit_secs);
    Score {
        seconds: duration_us as f64 / 1.0e6,
        value,
    }
}

/// Time one block of `iterations` and score it.
pub fn measure<W, C>(
    workload: &mut W,
    clock: &C,
    policy: &Policy,
    iterations: u32,
) -> Result<MeasuredRun, HarnessError>
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    let outcome = run_timed(workload, clock, iterations);
    if let Some(source) = outcome.failure {
        return Err(HarnessError::Measurement {
            iterations,
            elapsed_us: outcome.duration_us,
            source,
        });
    }

    Ok(MeasuredRun {
        iterations,
        duration_us: outcome.duration_us,
        score: compute_score(policy, iterations, outcome.duration_us),
    })
}

/// Calibrate then measure an already initialized workload.
pub fn run_protocol<W, C>(
    workload: &mut W,
    clock: &C,
    policy: &Policy,
) -> Result<BenchResult, HarnessError>
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    info!("Computing run speed");
    let calibration = calibrate(workload, clock, policy)?;

    let target = scale_iterations(policy, calibration.iterations, calibration.duration_us);
    debug!(
        "scaled {} iterations over {} us to {} iterations",
        calibration.iterations, calibration.duration_us, target
    );

    info!("Measuring");
    let measurement = measure(workload, clock, policy, target)?;

    Ok(BenchResult {
        calibration,
        measurement,
    })
}

/// Full lifecycle: initialize, calibrate, measure, release.
///
/// `release` runs exactly once whatever the outcome, including a failed
/// `initialize`.
pub fn run_benchmark<W, C>(
    workload: &mut W,
    clock: &C,
    policy: &Policy,
) -> Result<BenchResult, HarnessError>
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    policy.validate()?;

    let mut guard = ReleaseGuard::new(workload);

    info!("Initializing");
    guard
        .workload()
        .initialize()
        .map_err(HarnessError::Initialize)?;

    run_protocol(guard.workload(), clock, policy)
}
