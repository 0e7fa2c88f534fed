//! Learnt clause database reduction.
use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, StatsP, TrailP, WatchlistsP,
};
use crate::prop::Reason;

use super::gc::collect_garbage;
use super::ClauseRef;

/// Delete the less useful half of the redundant long clauses.
///
/// Clauses that are the reason of a current assignment are locked and kept.
/// Protected (low glue) clauses are never deleted. Among the remaining
/// candidates the worst half by (transient, glue, activity) is deleted,
/// transient clauses first.
pub fn reduce_learnts(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut StatsP,
        mut WatchlistsP,
        AssignmentP,
        TrailP,
    ),
) {
    // The watchlists refer to clauses about to be deleted; they are rebuilt
    // from the remaining clauses before the next propagation.
    ctx.part_mut(WatchlistsP).disable();

    let mut candidates: Vec<ClauseRef> = vec![];

    {
        let db = ctx.part(ClauseDbP);
        let alloc = ctx.part(ClauseAllocP);
        let assignment = ctx.part(AssignmentP);
        let impl_graph = ctx.part(ImplGraphP);

        for &cref in db.clauses.iter() {
            let header = alloc.header(cref);
            if header.deleted() || !header.redundant() || header.protected() {
                continue;
            }

            let lit_0 = alloc.lits(cref)[0];
            let locked = assignment.lit_is_true(lit_0)
                && impl_graph.reason(lit_0.var()) == &Reason::Long(cref);
            if locked {
                continue;
            }

            candidates.push(cref);
        }

        // Worst first: transient, then high glue, then low activity.
        candidates.sort_unstable_by_key(|&cref| {
            let header = alloc.header(cref);
            (
                !header.transient(),
                Reverse(header.glue()),
                OrderedFloat(header.activity()),
            )
        });
    }

    let to_delete = candidates.len() / 2;

    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let alloc = ctx.part_mut(ClauseAllocP);

    for &cref in candidates.iter().take(to_delete) {
        super::db::delete_clause(db, alloc, cref);
    }

    let transient = std::mem::take(&mut db.transient);
    db.transient = transient
        .into_iter()
        .filter(|&(cref, _)| !alloc.header(cref).deleted())
        .collect();

    let stats = ctx.part_mut(StatsP);
    stats.deleted_clauses += to_delete as u64;
    stats.reductions += 1;
}

/// Reduce the learnt database and compact the clause arena.
pub fn reduce_and_collect(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut StatsP,
        mut WatchlistsP,
        AssignmentP,
        TrailP,
    ),
) {
    reduce_learnts(ctx.borrow());
    collect_garbage(ctx.borrow());
}
