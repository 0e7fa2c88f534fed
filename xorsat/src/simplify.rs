//! Level 0 simplification.
//!
//! Between search episodes, and whenever propagation fixes new assignments at
//! level 0, the clause stores are rewritten under those permanent
//! assignments: satisfied clauses are dropped, false literals are stripped
//! (demoting clauses to the ternary and binary stores as they shrink) and
//! XOR constraints have their assigned variables substituted away. Full
//! episodes additionally apply the clause strengthenings queued by conflict
//! analysis, compact the clause arena and rebuild the Gaussian matrices.
use partial_ref::{partial, PartialRef};

use rustc_hash::FxHashSet;

use xorsat_formula::Lit;

use crate::clause::{db, gc::collect_garbage, ClauseRef};
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, GaussP, ImplGraphP,
    SolverConfigP, SolverStateP, StatsP, TernaryClausesP, TmpDataP, TrailP, VsidsP, WatchlistsP,
    XorClausesP, XorReasonsP,
};
use crate::prop::{enqueue_assignment, full_restart, propagate, Reason};
use crate::state::SatState;
use crate::xor::matrix::init_matrices;
use crate::xor::store::StoredXor;

/// Turn level 0 assignments into permanent units.
///
/// Removes them from the trail so later backtracking never revisits them and
/// rewrites their implication graph entries, releasing any clause or XOR
/// reason they referenced.
pub fn prove_units(mut ctx: partial!(Context, mut ImplGraphP, mut TrailP)) -> bool {
    let mut new_unit = false;

    if ctx.part(TrailP).current_level() == 0 {
        let (impl_graph, mut ctx) = ctx.split_part_mut(ImplGraphP);
        let trail = ctx.part_mut(TrailP);

        for &lit in trail.trail() {
            new_unit = true;
            impl_graph.update_removed_unit(lit.var());
        }

        trail.clear();
    }

    new_unit
}

/// Remove satisfied clauses and false literals from all clause stores.
///
/// Returns whether new assignments were enqueued (by XOR substitution), in
/// which case propagation has to run again. May only be called at level 0
/// with all assignments propagated.
pub fn simplify_clauses(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut GaussP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TernaryClausesP,
        mut TmpDataP,
        mut TrailP,
        mut WatchlistsP,
        mut XorClausesP,
    ),
) -> bool {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    // The short clause stores.
    {
        let (assignment, mut ctx) = ctx.split_part(AssignmentP);
        let (binary_clauses, mut ctx) = ctx.split_part_mut(BinaryClausesP);
        ctx.part_mut(TernaryClausesP)
            .simplify(assignment, binary_clauses);
        binary_clauses.simplify(assignment);
    }

    // Long clauses; the watchlists are rebuilt before the next propagation.
    ctx.part_mut(WatchlistsP).disable();

    let crefs: Vec<ClauseRef> = ctx.part(ClauseDbP).clauses.clone();

    for cref in crefs {
        if ctx.part(ClauseAllocP).header(cref).deleted() {
            continue;
        }

        let (satisfied, old_len) = {
            let (assignment, mut ctx) = ctx.split_part(AssignmentP);
            let (tmp, mut ctx) = ctx.split_part_mut(TmpDataP);
            let lits = ctx.part(ClauseAllocP).lits(cref);

            tmp.lits.clear();
            let mut satisfied = false;
            for &lit in lits {
                match assignment.lit_value(lit) {
                    Some(true) => {
                        satisfied = true;
                        break;
                    }
                    Some(false) => (),
                    None => tmp.lits.push(lit),
                }
            }
            (satisfied, lits.len())
        };

        if satisfied {
            let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
            db::delete_clause(db, ctx.part_mut(ClauseAllocP), cref);
            continue;
        }

        let kept = ctx.part(TmpDataP).lits.len();
        if kept == old_len {
            continue;
        }

        let redundant = ctx.part(ClauseAllocP).header(cref).redundant();

        match kept {
            // An empty or unit clause would have been a conflict or a
            // propagation.
            0 | 1 => unreachable!("under-length clause after level 0 propagation"),
            2 => {
                let (tmp, mut ctx) = ctx.split_part(TmpDataP);
                ctx.part_mut(BinaryClausesP)
                    .add_binary_clause([tmp.lits[0], tmp.lits[1]], redundant);
                let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
                db::delete_clause(db, ctx.part_mut(ClauseAllocP), cref);
            }
            3 => {
                let (tmp, mut ctx) = ctx.split_part(TmpDataP);
                ctx.part_mut(TernaryClausesP).add_ternary_clause(
                    [tmp.lits[0], tmp.lits[1], tmp.lits[2]],
                    redundant,
                );
                let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
                db::delete_clause(db, ctx.part_mut(ClauseAllocP), cref);
            }
            _ => {
                let (tmp, mut ctx) = ctx.split_part(TmpDataP);
                let alloc = ctx.part_mut(ClauseAllocP);
                alloc.lits_mut(cref)[..kept].copy_from_slice(&tmp.lits);
                alloc.header_mut(cref).set_len(kept);
                ctx.part_mut(ClauseDbP).garbage_size += old_len - kept;
            }
        }
    }

    // XOR constraints: substitute the permanent assignments.
    let mut enqueued = false;
    {
        let old_xors = ctx.part_mut(XorClausesP).take_xors();
        let mut new_xors = Vec::with_capacity(old_xors.len());
        let mut units: Vec<Lit> = vec![];
        let mut changed = false;
        let mut found_unsat = false;

        {
            let assignment = ctx.part(AssignmentP);
            for xor in old_xors {
                let mut rhs = xor.rhs;
                let mut vars = Vec::with_capacity(xor.vars.len());
                for var in xor.vars {
                    match assignment.var_value(var) {
                        Some(value) => {
                            rhs ^= value;
                            changed = true;
                        }
                        None => vars.push(var),
                    }
                }
                match vars.len() {
                    0 => found_unsat |= rhs,
                    1 => units.push(vars[0].lit(rhs)),
                    _ => new_xors.push(StoredXor { vars, rhs }),
                }
            }
        }

        ctx.part_mut(XorClausesP).replace_xors(new_xors);
        if changed {
            ctx.part_mut(GaussP).mark_dirty();
        }

        if found_unsat {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            return enqueued;
        }

        for lit in units {
            if ctx.part(AssignmentP).lit_is_false(lit) {
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                return enqueued;
            }
            if ctx.part(AssignmentP).lit_is_unk(lit) {
                enqueue_assignment(ctx.borrow(), lit, Reason::Unit);
                enqueued = true;
            }
        }
    }

    enqueued
}

/// Apply the clause strengthenings queued by conflict analysis.
///
/// May only be called at level 0 with an empty trail, so no strengthened
/// clause can be the reason of an assignment.
pub fn apply_deferred_shrinks(
    mut ctx: partial!(
        Context,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut StatsP,
        mut TernaryClausesP,
        mut WatchlistsP,
    ),
) {
    if ctx.part(ClauseDbP).deferred_shrinks.is_empty() {
        return;
    }

    ctx.part_mut(WatchlistsP).disable();

    let shrinks = std::mem::take(&mut ctx.part_mut(ClauseDbP).deferred_shrinks);

    // Each queued strengthening was derived against the clause as it was at
    // analysis time, so at most one of them may be applied per clause.
    let mut shrunk: FxHashSet<ClauseRef> = FxHashSet::default();

    for (cref, lit) in shrinks {
        if !shrunk.insert(cref) {
            continue;
        }
        if ctx.part(ClauseAllocP).header(cref).deleted() {
            continue;
        }

        let (new_len, redundant) = {
            let alloc = ctx.part_mut(ClauseAllocP);
            let lits = alloc.lits_mut(cref);
            let pos = match lits.iter().position(|&l| l == lit) {
                Some(pos) => pos,
                // A later simplification already removed the literal.
                None => continue,
            };
            let new_len = lits.len() - 1;
            lits.swap(pos, new_len);
            let header = alloc.header_mut(cref);
            header.set_len(new_len);
            (new_len, header.redundant())
        };

        ctx.part_mut(ClauseDbP).garbage_size += 1;
        ctx.part_mut(StatsP).shrunk_clauses += 1;

        if new_len == 3 {
            let lits = {
                let clause_lits = ctx.part(ClauseAllocP).lits(cref);
                [clause_lits[0], clause_lits[1], clause_lits[2]]
            };
            ctx.part_mut(TernaryClausesP)
                .add_ternary_clause(lits, redundant);
            let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
            db::delete_clause(db, ctx.part_mut(ClauseAllocP), cref);
        }
    }
}

/// A full simplification episode between search episodes.
///
/// Performs a full restart, absorbs level 0 assignments as permanent units,
/// applies deferred strengthenings, rewrites the clause stores to a fixpoint,
/// compacts the arena and rebuilds the Gaussian matrices.
pub fn simplify_episode(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut GaussP,
        mut ImplGraphP,
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
    ),
) {
    full_restart(ctx.borrow());

    if propagate(ctx.borrow()).is_err() {
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        return;
    }
    prove_units(ctx.borrow());

    apply_deferred_shrinks(ctx.borrow());

    loop {
        let enqueued = simplify_clauses(ctx.borrow());
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return;
        }
        if !enqueued {
            break;
        }
        if propagate(ctx.borrow()).is_err() {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            return;
        }
        prove_units(ctx.borrow());
    }

    // All level 0 implications are plain units now.
    ctx.part_mut(XorReasonsP).clear();

    collect_garbage(ctx.borrow());
    init_matrices(ctx.borrow());

    ctx.part_mut(StatsP).simplifications += 1;
}
