//! Search statistics.

/// Counters accumulated over the lifetime of a solver.
#[derive(Copy, Clone, Default, Debug)]
pub struct Stats {
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
    pub restarts: u64,
    pub simplifications: u64,
    pub reductions: u64,

    pub learnt_units: u64,
    pub learnt_binaries: u64,
    pub learnt_ternaries: u64,
    pub learnt_longs: u64,
    pub deleted_clauses: u64,

    /// Clauses found shrinkable during conflict analysis.
    pub improved_clauses: u64,
    /// Deferred shrinks applied at simplification episodes.
    pub shrunk_clauses: u64,

    pub xor_propagations: u64,
    pub xor_conflicts: u64,
    pub gauss_calls: u64,
    pub gauss_propagations: u64,
    pub gauss_conflicts: u64,

    pub models_found: u64,
}
