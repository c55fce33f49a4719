//! Deterministic test doubles for the clock and workload capabilities.
//!
//! A [`FakeClock`] only moves when someone advances it; a [`ScriptedWorkload`]
//! advances it by a fixed cost per unit, so whole calibration runs can be
//! replayed exactly without touching real time.

use std::cell::Cell;
use std::rc::Rc;

use crate::clock::Clock;
use crate::error::WorkloadFailure;
use crate::workload::Workload;

/// Manually driven clock. Clones share the same counter.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    now: Rc<Cell<u64>>,
    reads: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, micros: u64) {
        self.now.set(self.now.get().saturating_add(micros));
    }

    pub fn set(&self, micros: u64) {
        self.now.set(micros);
    }

    /// Number of times `now_micros` has been called.
    pub fn reads(&self) -> u64 {
        self.reads.get()
    }
}

impl Clock for FakeClock {
    fn now_micros(&self) -> u64 {
        self.reads.set(self.reads.get() + 1);
        self.now.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Initialize,
    Run,
    Release,
}

/// Workload with a fixed per-unit cost and optional failure injection.
///
/// Every `run_one_unit` call, including a failing one, advances the shared
/// clock by `cost_us`.
#[derive(Debug)]
pub struct ScriptedWorkload {
    clock: FakeClock,
    cost_us: u64,
    fail_initialize: bool,
    fail_at_run: Option<u64>,
    runs: u64,
    calls: Vec<Call>,
}

impl ScriptedWorkload {
    pub fn new(clock: &FakeClock, cost_us: u64) -> Self {
        Self {
            clock: clock.clone(),
            cost_us,
            fail_initialize: false,
            fail_at_run: None,
            runs: 0,
            calls: Vec::new(),
        }
    }

    pub fn fail_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Fail the `n`-th `run_one_unit` call, counted from 1 across the whole run.
    pub fn fail_at_run(mut self, n: u64) -> Self {
        self.fail_at_run = Some(n);
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn run_count(&self) -> u64 {
        self.runs
    }

    pub fn release_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == Call::Release)
            .count()
    }
}

impl Workload for ScriptedWorkload {
    fn initialize(&mut self) -> Result<(), WorkloadFailure> {
        self.calls.push(Call::Initialize);
        if self.fail_initialize {
            return Err(WorkloadFailure::new("scripted initialize failure"));
        }
        Ok(())
    }

    fn run_one_unit(&mut self) -> Result<(), WorkloadFailure> {
        self.calls.push(Call::Run);
        self.runs += 1;
        self.clock.advance(self.cost_us);
        if self.fail_at_run == Some(self.runs) {
            return Err(WorkloadFailure::new(format!(
                "scripted failure at run {}",
                self.runs
            )));
        }
        Ok(())
    }

    fn release(&mut self) {
        self.calls.push(Call::Release);
    }
}
