use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::controller::BenchResult;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub clock: String,
    pub seed: u64,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationStepReport {
    pub iterations: u32,
    pub duration_us: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub threshold_us: u64,
    pub steps: Vec<CalibrationStepReport>,
    pub iterations: u32,
    pub duration_us: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub unit: String,
    pub target_us: u64,
    pub iterations: u32,
    pub duration_us: u64,
    pub seconds: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioMarkReport {
    pub run: RunMeta,
    pub calibration: CalibrationReport,
    pub measurement: ScoreReport,

    pub workload: serde_json::Value,
}

impl AudioMarkReport {
    pub fn new(
        run: RunMeta,
        threshold_us: u64,
        target_us: u64,
        result: &BenchResult,
        workload: serde_json::Value,
    ) -> Self {
        let cal = &result.calibration;
        let meas = &result.measurement;

        Self {
            run,
            calibration: CalibrationReport {
                threshold_us,
                steps: cal
                    .steps
                    .iter()
                    .map(|s| CalibrationStepReport {
                        iterations: s.iterations,
                        duration_us: s.duration_us,
                    })
                    .collect(),
                iterations: cal.iterations,
                duration_us: cal.duration_us,
            },
            measurement: ScoreReport {
                unit: "AudioMarks".to_string(),
                target_us,
                iterations: meas.iterations,
                duration_us: meas.duration_us,
                seconds: meas.score.seconds,
                score: meas.score.value,
            },
            workload,
        }
    }

    pub fn to_json_pretty(&self) -> io::Result<String> {
        serde_json::to_string_pretty(self).map_err(io::Error::other)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::write(path, self.to_json_pretty()?)
    }

    /// The three-line console summary.
    pub fn summary(&self) -> String {
        format!(
            "Total runtime    : {:.3} seconds\nTotal iterations : {} iterations\nScore            : {:.6} AudioMarks",
            self.measurement.seconds, self.measurement.iterations, self.measurement.score
        )
    }
}
