use thiserror::Error;

/// Failure signalled by the workload itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct WorkloadFailure {
    message: String,
}

impl WorkloadFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Why a benchmark run produced no score.
///
/// The phase variants carry the elapsed time of the aborted block so the time
/// spent up to the failure stays observable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarnessError {
    #[error("Failed to initialize: {0}")]
    Initialize(#[source] WorkloadFailure),

    #[error("Failed to compute iteration speed: {source} (after {elapsed_us} us at {iterations} iterations)")]
    Calibration {
        iterations: u32,
        elapsed_us: u64,
        #[source]
        source: WorkloadFailure,
    },

    #[error("Failed to compute iteration speed: iteration count overflowed at {iterations} with only {elapsed_us} us measured")]
    CalibrationOverflow { iterations: u32, elapsed_us: u64 },

    #[error("Failed main performance run: {source} (after {elapsed_us} us of {iterations} iterations)")]
    Measurement {
        iterations: u32,
        elapsed_us: u64,
        #[source]
        source: WorkloadFailure,
    },

    #[error("invalid policy: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("calibration threshold must be greater than zero")]
    ZeroCalibrationThreshold,
    #[error("target duration must be greater than zero")]
    ZeroTarget,
    #[error("iteration floor must be at least one")]
    ZeroFloor,
    #[error("reference seconds per unit must be positive and finite, got {0}")]
    BadReferencePeriod(f64),
    #[error("score multiplier must be positive and finite, got {0}")]
    BadScoreMultiplier(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_messages_match_console_output() {
        let init = HarnessError::Initialize(WorkloadFailure::new("no memory"));
        assert!(init.to_string().starts_with("Failed to initialize"));

        let cal = HarnessError::Calibration {
            iterations: 8,
            elapsed_us: 42,
            source: WorkloadFailure::new("boom"),
        };
        assert!(cal.to_string().starts_with("Failed to compute iteration speed"));

        let overflow = HarnessError::CalibrationOverflow {
            iterations: 1 << 31,
            elapsed_us: 0,
        };
        assert!(overflow
            .to_string()
            .starts_with("Failed to compute iteration speed"));

        let meas = HarnessError::Measurement {
            iterations: 110,
            elapsed_us: 7,
            source: WorkloadFailure::new("boom"),
        };
        assert!(meas.to_string().starts_with("Failed main performance run"));
    }

    #[test]
    fn source_chain_reaches_workload_failure() {
        use std::error::Error as _;
        let err = HarnessError::Measurement {
            iterations: 10,
            elapsed_us: 1,
            source: WorkloadFailure::new("nan in output"),
        };
        let src = err.source().map(|s| s.to_string());
        assert_eq!(src.as_deref(), Some("nan in output"));
    }
}
