//! The three-call workload contract and the guard that enforces its ordering.

use crate::error::WorkloadFailure;

/// An opaque unit of work driven by the harness.
///
/// Calls arrive in a fixed order: `initialize` once, `run_one_unit` any number of
/// times, `release` once. The per-unit cost is assumed stable across calls.
pub trait Workload {
    /// Prepare internal state. Called once before any timed run.
    fn initialize(&mut self) -> Result<(), WorkloadFailure>;

    /// Process one unit of work.
    fn run_one_unit(&mut self) -> Result<(), WorkloadFailure>;

    /// Tear down internal state.
    fn release(&mut self);
}

impl<W: Workload + ?Sized> Workload for &mut W {
    fn initialize(&mut self) -> Result<(), WorkloadFailure> {
        (**self).initialize()
    }

    fn run_one_unit(&mut self) -> Result<(), WorkloadFailure> {
        (**self).run_one_unit()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Calls [`Workload::release`] exactly once when dropped.
///
/// Created before `initialize` so that every exit path, including a failed
/// initialization, releases the workload.
pub struct ReleaseGuard<'a, W: Workload + ?Sized> {
    workload: &'a mut W,
}

impl<'a, W: Workload + ?Sized> ReleaseGuard<'a, W> {
    pub fn new(workload: &'a mut W) -> Self {
        Self { workload }
    }

    pub fn workload(&mut self) -> &mut W {
        self.workload
    }
}

impl<W: Workload + ?Sized> Drop for ReleaseGuard<'_, W> {
    fn drop(&mut self) {
        log::debug!("releasing workload");
        self.workload.release();
    }
}
