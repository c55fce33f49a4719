use clap::ValueEnum;

pub mod clock;
pub mod controller;
pub mod error;
pub mod harness;
pub mod pipeline;
pub mod schema;
pub mod testing;
pub mod workload;

pub use controller::{run_benchmark, BenchResult};
pub use error::{ConfigError, HarnessError, WorkloadFailure};
pub use workload::Workload;

/// Clock source used for timing.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum ClockSource {
    /// Monotonic process clock.
    #[default]
    Monotonic,
    /// System realtime clock (microseconds since the Unix epoch).
    Wall,
}

impl ClockSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockSource::Monotonic => "monotonic",
            ClockSource::Wall => "wall",
        }
    }

    pub fn build(&self) -> Box<dyn clock::Clock> {
        match self {
            ClockSource::Monotonic => Box::new(clock::MonotonicClock::new()),
            ClockSource::Wall => Box::new(clock::WallClock),
        }
    }
}
