//! Decision heuristics.
//!
//! Branch variables come from the VSIDS activity order, optionally randomized
//! by `random_var_freq` or restricted to a uniform pick among the top-K
//! active variables. Polarities follow the configured polarity mode, with
//! `auto` seeding initial phases from a Jeroslow-Wang score over the
//! irredundant clauses and phase saving thereafter.
pub mod rng;
pub mod vsids;

use partial_ref::{partial, PartialRef};

use xorsat_formula::Var;

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, RngP,
    SolverConfigP, StatsP, TernaryClausesP, TrailP, VariablesP, VsidsP, XorReasonsP,
};
use crate::config::PolarityMode;
use crate::prop::{enqueue_assignment, new_decision_level, Reason};

/// Insert a variable into the branching order if not already present.
pub fn make_available(mut ctx: partial!(Context, mut VsidsP), var: Var) {
    ctx.part_mut(VsidsP).make_available(var);
}

/// Make a decision and enqueue it.
///
/// Returns `false` if no decision was made because all branching variables
/// are assigned.
pub fn make_decision(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut RngP,
        mut StatsP,
        mut TrailP,
        mut VsidsP,
        mut XorReasonsP,
        SolverConfigP,
        VariablesP,
    ),
) -> bool {
    let decision_var = match pick_branch_var(ctx.borrow()) {
        Some(var) => var,
        None => return false,
    };

    let polarity = pick_polarity(ctx.borrow(), decision_var);

    new_decision_level(ctx.borrow());
    enqueue_assignment(ctx.borrow(), decision_var.lit(polarity), Reason::Unit);

    ctx.part_mut(StatsP).decisions += 1;

    true
}

/// Select the next branching variable.
fn pick_branch_var(
    mut ctx: partial!(
        Context,
        mut RngP,
        mut VsidsP,
        AssignmentP,
        SolverConfigP,
        VariablesP,
    ),
) -> Option<Var> {
    let (config, mut ctx) = ctx.split_part(SolverConfigP);

    // Occasionally branch on a random variable; when the pick is already
    // assigned or eliminated, fall through to the activity order.
    if config.random_var_freq > 0.0 && ctx.part_mut(RngP).chance(config.random_var_freq) {
        let count = ctx.part(VariablesP).count();
        if count > 0 {
            let var = Var::from_index(ctx.part_mut(RngP).irand(count));
            if ctx.part(AssignmentP).var_value(var).is_none()
                && !ctx.part(VariablesP).is_eliminated(var)
            {
                return Some(var);
            }
        }
    }

    if config.restrict_pick_branch > 0 {
        // Pick uniformly among the most active unassigned variables. Used for
        // crypto instances where the solution is determined by few variables.
        let (vsids, mut ctx) = ctx.split_part_mut(VsidsP);

        let mut candidates = Vec::with_capacity(config.restrict_pick_branch);
        while candidates.len() < config.restrict_pick_branch {
            match vsids.next() {
                Some(var) => {
                    if ctx.part(AssignmentP).var_value(var).is_none()
                        && !ctx.part(VariablesP).is_eliminated(var)
                    {
                        candidates.push(var);
                    }
                }
                None => break,
            }
        }

        if candidates.is_empty() {
            return None;
        }

        let pick = candidates[ctx.part_mut(RngP).irand(candidates.len())];
        for &var in candidates.iter() {
            vsids.make_available(var);
        }
        return Some(pick);
    }

    let (vsids, ctx) = ctx.split_part_mut(VsidsP);

    while let Some(var) = vsids.next() {
        if ctx.part(AssignmentP).var_value(var).is_none()
            && !ctx.part(VariablesP).is_eliminated(var)
        {
            return Some(var);
        }
    }

    None
}

/// Select the polarity for a decision variable.
fn pick_polarity(
    mut ctx: partial!(Context, mut RngP, AssignmentP, SolverConfigP),
    var: Var,
) -> bool {
    let (config, mut ctx) = ctx.split_part(SolverConfigP);
    match config.polarity_mode {
        PolarityMode::True => true,
        PolarityMode::False => false,
        PolarityMode::Rnd => ctx.part_mut(RngP).chance(0.5),
        PolarityMode::Auto => ctx.part(AssignmentP).last_var_value(var),
    }
}

/// Seed the initial phases with a Jeroslow-Wang estimate.
///
/// Scores every literal by `Σ 2^-|C|` over the irredundant clauses containing
/// it and prefers the polarity with the higher score. Only used by the `auto`
/// polarity mode; the other modes ignore the saved phases.
pub fn init_phases(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        BinaryClausesP,
        ClauseAllocP,
        ClauseDbP,
        SolverConfigP,
        TernaryClausesP,
        VariablesP,
    ),
) {
    if ctx.part(SolverConfigP).polarity_mode != PolarityMode::Auto {
        return;
    }

    let count = ctx.part(VariablesP).count();
    let mut score = vec![0.0f64; count * 2];

    for (lits, redundant) in ctx.part(BinaryClausesP).iter() {
        if !redundant {
            for &lit in lits.iter() {
                score[lit.code()] += 0.25;
            }
        }
    }

    for (lits, redundant) in ctx.part(TernaryClausesP).iter() {
        if !redundant {
            for &lit in lits.iter() {
                score[lit.code()] += 0.125;
            }
        }
    }

    let db = ctx.part(ClauseDbP);
    let alloc = ctx.part(ClauseAllocP);
    for &cref in db.clauses.iter() {
        let header = alloc.header(cref);
        if header.deleted() || header.redundant() {
            continue;
        }
        let weight = (-(header.len().min(30) as f64)).exp2();
        for &lit in alloc.lits(cref) {
            score[lit.code()] += weight;
        }
    }

    let assignment = ctx.part_mut(AssignmentP);
    for index in 0..count {
        let var = Var::from_index(index);
        let positive = score[var.positive().code()];
        let negative = score[var.negative().code()];
        assignment.set_initial_phase(var, positive >= negative);
    }
}
