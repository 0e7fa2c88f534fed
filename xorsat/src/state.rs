//! Miscellaneous solver state.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use xorsat_formula::Lit;

/// Satisfiability state.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SatState {
    Unknown,
    Sat,
    Unsat,
}

impl Default for SatState {
    fn default() -> SatState {
        SatState::Unknown
    }
}

/// Why a search episode stopped without an answer.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StopCause {
    Interrupted,
    RestartBudget,
    ConflictBudget,
}

/// Cooperative cancellation handle for a running solve.
///
/// Cloneable and sendable to other threads; setting the flag makes the solver
/// drain to a coherent level 0 state and report an undetermined result at the
/// next schedule boundary.
#[derive(Clone, Default, Debug)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Request the solver to stop.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Relaxed)
    }

    /// Clear a pending interrupt request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed)
    }

    /// Whether an interrupt was requested.
    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Miscellaneous solver state.
///
/// Anything larger or any larger group of related state variables should be
/// moved into a separate part of [`Context`](crate::context::Context).
#[derive(Default)]
pub struct SolverState {
    pub sat_state: SatState,
    /// Set when the last search episode ended without an answer.
    pub stop: Option<StopCause>,
    /// Polled at schedule boundaries.
    pub interrupt: InterruptHandle,
    /// The satisfying assignment found by the last successful search.
    ///
    /// Only valid while `sat_state` is `Sat`.
    pub last_model: Vec<Lit>,
}
