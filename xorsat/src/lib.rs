//! A CDCL based SAT solver with native XOR reasoning (library).
//!
//! This crate provides a library based SAT solver for formulas in conjunctive
//! normal form, extended with XOR (parity) constraints. The solver implements
//! conflict driven clause learning with two-watched-literal propagation,
//! first-UIP clause learning and minimization, activity based branching,
//! Luby and glue based restarts, learnt clause database reduction and an
//! on-the-fly Gaussian elimination engine over the XOR constraints.

pub mod config;
pub mod solver;

mod analyze;
mod binary;
mod cdcl;
mod clause;
mod context;
mod decision;
mod dump;
mod glue;
mod load;
mod prop;
mod restart;
mod schedule;
mod simplify;
mod state;
mod stats;
mod ternary;
mod tmp;
mod variables;
mod xor;

pub use config::{ConfigError, SolverConfig, SolverConfigUpdate};
pub use solver::{Solver, SolverResult};
pub use state::InterruptHandle;
pub use stats::Stats;

pub use xorsat_formula::{CnfFormula, ExtendFormula, Lit, Var, XorClause};
