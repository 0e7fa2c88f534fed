//! Conflict driven clause learning.

use partial_ref::{partial, split_borrow, PartialRef};

use crate::analyze::analyze_conflict;
use crate::clause::{
    assess_learned_clause, bump_clause_activity, db, decay_clause_activities,
};
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseActivityP, ClauseAllocP, ClauseDbP,
    Context, GaussP, ImplGraphP, RngP, ScheduleP, SolverConfigP, SolverStateP, StatsP,
    TernaryClausesP, TmpDataP, TrailP, VariablesP, VsidsP, WatchlistsP, XorClausesP, XorReasonsP,
};
use crate::decision::make_decision;
use crate::glue::compute_glue;
use crate::prop::{backtrack, enqueue_assignment, propagate, Conflict, Reason};
use crate::simplify::{prove_units, simplify_clauses};
use crate::state::SatState;
use crate::xor::gauss::{gauss_step, GaussResult};
use crate::xor::matrix::init_matrices;

/// Find a conflict, learn a clause and backtrack.
pub fn conflict_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut GaussP,
        mut ImplGraphP,
        mut RngP,
        mut ScheduleP,
        mut SolverStateP,
        mut StatsP,
        mut TernaryClausesP,
        mut TmpDataP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        mut XorClausesP,
        mut XorReasonsP,
        SolverConfigP,
        VariablesP,
    ),
) {
    let conflict = match find_conflict(ctx.borrow()) {
        Ok(()) => {
            if ctx.part(SolverStateP).sat_state == SatState::Unknown {
                ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
            }
            return;
        }
        Err(conflict) => conflict,
    };

    ctx.part_mut(StatsP).conflicts += 1;

    // The deepest decision level involved in the conflict.
    let conflict_level = {
        split_borrow!(lit_ctx = &(ClauseAllocP, XorReasonsP) ctx);
        let impl_graph = ctx.part(ImplGraphP);
        conflict
            .lits(&lit_ctx)
            .iter()
            .map(|&lit| impl_graph.level(lit.var()))
            .max()
            .unwrap_or(0)
    };

    if conflict_level == 0 {
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        return;
    }

    // Gaussian elimination can derive a conflict whose variables all lie
    // below the current decision level; re-root such a conflict at its own
    // level before analyzing it. The materialized reason has to be copied
    // out first, as backtracking truncates the reason buffer.
    let conflict = if conflict_level < ctx.part(TrailP).current_level() {
        match conflict {
            Conflict::Xor(rref) => {
                {
                    let (tmp, ctx) = ctx.split_part_mut(TmpDataP);
                    tmp.lits.clear();
                    tmp.lits
                        .extend_from_slice(ctx.part(XorReasonsP).lits(rref));
                }
                backtrack(ctx.borrow(), conflict_level);
                let (tmp, mut ctx) = ctx.split_part(TmpDataP);
                let rref = ctx
                    .part_mut(XorReasonsP)
                    .add(tmp.lits.iter().cloned());
                Conflict::Xor(rref)
            }
            other => {
                debug_assert!(
                    false,
                    "only XOR conflicts can be rooted below the current level"
                );
                backtrack(ctx.borrow(), conflict_level);
                other
            }
        }
    } else {
        conflict
    };

    let backtrack_to = analyze_conflict(ctx.borrow(), conflict);

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);

    for &cref in analyze.involved() {
        bump_clause_activity(ctx.borrow(), cref);
    }

    decay_clause_activities(ctx.borrow());

    backtrack(ctx.borrow(), backtrack_to);
    db::purge_transient(ctx.borrow(), backtrack_to);

    let clause = analyze.clause();

    // The asserting literal's level is stale at this point, which makes the
    // computed glue one too high.
    let glue = compute_glue(ctx.borrow(), clause).saturating_sub(1);

    let sample_conflicts = ctx.part(SolverConfigP).auto_restart_sample_conflicts;
    ctx.part_mut(ScheduleP)
        .policy
        .on_conflict(glue, sample_conflicts);

    let reason = match clause.len() {
        0 => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            return;
        }
        1 => {
            ctx.part_mut(StatsP).learnt_units += 1;
            Reason::Unit
        }
        2 => {
            ctx.part_mut(BinaryClausesP)
                .add_binary_clause([clause[0], clause[1]], true);
            ctx.part_mut(StatsP).learnt_binaries += 1;
            Reason::Binary([clause[1]])
        }
        3 => {
            ctx.part_mut(TernaryClausesP)
                .add_ternary_clause([clause[0], clause[1], clause[2]], true);
            ctx.part_mut(StatsP).learnt_ternaries += 1;
            Reason::Ternary([clause[1], clause[2]])
        }
        _ => {
            let header = assess_learned_clause(ctx.borrow(), glue);
            let transient = header.transient();
            let cref = db::add_clause(ctx.borrow(), header, clause);
            if transient {
                db::add_transient(ctx.part_mut(ClauseDbP), cref, backtrack_to);
            }
            ctx.part_mut(StatsP).learnt_longs += 1;
            Reason::Long(cref)
        }
    };

    enqueue_assignment(ctx.borrow(), clause[0], reason);
}

/// Find a conflict.
///
/// Returns `Err` if a conflict was found and `Ok` if a satisfying assignment
/// was found instead (or simplification settled the instance).
fn find_conflict(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut GaussP,
        mut ImplGraphP,
        mut RngP,
        mut SolverStateP,
        mut StatsP,
        mut TernaryClausesP,
        mut TmpDataP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        mut XorClausesP,
        mut XorReasonsP,
        SolverConfigP,
        VariablesP,
    ),
) -> Result<(), Conflict> {
    loop {
        let propagation_result = propagate(ctx.borrow());

        let new_unit = prove_units(ctx.borrow());

        propagation_result?;

        if new_unit {
            simplify_clauses(ctx.borrow());
            if ctx.part(SolverStateP).sat_state != SatState::Unknown {
                return Ok(());
            }
            continue;
        }

        let gauss_until = ctx.part(SolverConfigP).gauss_decision_until;
        if gauss_until > 0 && ctx.part(TrailP).current_level() <= gauss_until {
            if ctx.part(GaussP).is_dirty() {
                init_matrices(ctx.borrow());
            }
            match gauss_step(ctx.borrow()) {
                GaussResult::Conflict(conflict) => return Err(conflict),
                GaussResult::Propagated => continue,
                GaussResult::Nothing => (),
            }
        }

        if !make_decision(ctx.borrow()) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use partial_ref::IntoPartialRefMut;

    use xorsat_formula::{cnf_formula, test::*, ExtendFormula};

    use crate::context::set_var_count;
    use crate::load::{load_clause, load_xor_clause};
    use crate::state::SatState;

    fn solve_with_conflict_steps(ctx: &mut Context) -> SatState {
        let mut ctx = ctx.into_partial_ref_mut();
        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            conflict_step(ctx.borrow());
        }
        ctx.part(SolverStateP).sat_state
    }

    #[test]
    fn level_0_unsat() {
        let mut ctx = Context::default();

        let formula = cnf_formula![
            1, 2, 3;
            -1;
            1, -2;
            2, -3;
        ];

        {
            let mut ctx = ctx.into_partial_ref_mut();
            set_var_count(ctx.borrow(), formula.var_count());
            for clause in formula.iter() {
                load_clause(ctx.borrow(), clause);
            }
        }

        assert_eq!(solve_with_conflict_steps(&mut ctx), SatState::Unsat);
    }

    #[test]
    fn xor_cycle_odd_parity_unsat() {
        let mut ctx = Context::default();

        let mut formula = xorsat_formula::CnfFormula::new();
        formula.set_var_count(3);
        formula.add_xor_clause(xorsat_formula::xor_clause![1, 2; true]);
        formula.add_xor_clause(xorsat_formula::xor_clause![2, 3; true]);
        formula.add_xor_clause(xorsat_formula::xor_clause![1, 3; true]);

        {
            let mut ctx = ctx.into_partial_ref_mut();
            set_var_count(ctx.borrow(), formula.var_count());
            for xor in formula.xor_clauses() {
                load_xor_clause(ctx.borrow(), xor);
            }
        }

        assert_eq!(solve_with_conflict_steps(&mut ctx), SatState::Unsat);
    }

    #[test]
    fn xor_cycle_even_parity_sat() {
        let mut ctx = Context::default();

        let mut formula = xorsat_formula::CnfFormula::new();
        formula.set_var_count(3);
        formula.add_xor_clause(xorsat_formula::xor_clause![1, 2; false]);
        formula.add_xor_clause(xorsat_formula::xor_clause![2, 3; false]);
        formula.add_xor_clause(xorsat_formula::xor_clause![1, 3; false]);

        {
            let mut ctx = ctx.into_partial_ref_mut();
            set_var_count(ctx.borrow(), formula.var_count());
            for xor in formula.xor_clauses() {
                load_xor_clause(ctx.borrow(), xor);
            }
        }

        assert_eq!(solve_with_conflict_steps(&mut ctx), SatState::Sat);
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut ctx = Context::default();

            {
                let mut ctx = ctx.into_partial_ref_mut();
                set_var_count(ctx.borrow(), formula.var_count());
                for clause in formula.iter() {
                    load_clause(ctx.borrow(), clause);
                }
            }

            prop_assert_eq!(solve_with_conflict_steps(&mut ctx), SatState::Unsat);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut ctx = Context::default();

            {
                let mut ctx = ctx.into_partial_ref_mut();
                set_var_count(ctx.borrow(), formula.var_count());
                for clause in formula.iter() {
                    load_clause(ctx.borrow(), clause);
                }
            }

            prop_assert_eq!(solve_with_conflict_steps(&mut ctx), SatState::Sat);

            let ctx = ctx.into_partial_ref_mut();
            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|&lit| ctx.part(AssignmentP).lit_is_true(lit)));
            }
        }

        #[test]
        fn sat_with_xors(formula in sat_xor_formula(4..15usize, 0..40usize, 1..10usize)) {
            let mut ctx = Context::default();

            {
                let mut ctx = ctx.into_partial_ref_mut();
                set_var_count(ctx.borrow(), formula.var_count());
                for clause in formula.iter() {
                    load_clause(ctx.borrow(), clause);
                }
                for xor in formula.xor_clauses() {
                    load_xor_clause(ctx.borrow(), xor);
                }
            }

            prop_assert_eq!(solve_with_conflict_steps(&mut ctx), SatState::Sat);

            let ctx = ctx.into_partial_ref_mut();
            for xor in formula.xor_clauses() {
                let parity = xor.vars().iter().fold(false, |acc, &var| {
                    acc ^ (ctx.part(AssignmentP).var_value(var) == Some(true))
                });
                prop_assert_eq!(parity, xor.rhs());
            }
        }
    }
}
