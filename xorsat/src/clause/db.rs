//! Database for long clauses.
use partial_ref::{partial, PartialRef};

use xorsat_formula::lit::LitIdx;
use xorsat_formula::Lit;

use crate::context::{AssignmentP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, WatchlistsP};
use crate::prop::Reason;

use super::{ClauseAlloc, ClauseHeader, ClauseRef};

/// Database for long clauses.
///
/// Deleted clauses stay in `clauses` and in the allocator until the next
/// garbage collection, so the header's deleted flag needs to be checked when
/// iterating.
#[derive(Default)]
pub struct ClauseDb {
    /// May contain deleted clauses, see above.
    pub(crate) clauses: Vec<ClauseRef>,
    /// Number of live irredundant long clauses.
    count_irredundant: usize,
    /// Number of live redundant (learnt) long clauses.
    count_redundant: usize,
    /// Size of deleted but not collected clauses.
    pub(crate) garbage_size: usize,
    /// Learnt clauses born over the glue bound, with their installation
    /// level. Discarded at the first backjump below that level.
    pub(crate) transient: Vec<(ClauseRef, LitIdx)>,
    /// Clause strengthenings discovered during conflict analysis, applied at
    /// the next simplification episode.
    pub(crate) deferred_shrinks: Vec<(ClauseRef, Lit)>,
}

impl ClauseDb {
    /// The number of live irredundant long clauses.
    pub fn count_irredundant(&self) -> usize {
        self.count_irredundant
    }

    /// The number of live redundant long clauses.
    pub fn count_redundant(&self) -> usize {
        self.count_redundant
    }
}

/// Add a long clause to the database and watch it.
///
/// `lits` must have length at least 3 (shorter clauses are stored inline in
/// the binary and ternary stores) and the first two literals must satisfy the
/// watchlist invariants.
pub fn add_clause(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut WatchlistsP),
    header: ClauseHeader,
    lits: &[Lit],
) -> ClauseRef {
    let redundant = header.redundant();

    let cref = ctx.part_mut(ClauseAllocP).add_clause(header, lits);

    let db = ctx.part_mut(ClauseDbP);
    db.clauses.push(cref);
    if redundant {
        db.count_redundant += 1;
    } else {
        db.count_irredundant += 1;
    }

    let watchlists = ctx.part_mut(WatchlistsP);
    if watchlists.enabled() {
        watchlists.watch_clause(cref, [lits[0], lits[1]]);
    }

    cref
}

/// Mark a long clause as deleted.
///
/// The caller is responsible for the clause's watches: either they were
/// removed explicitly or the watchlists are disabled and will be rebuilt.
/// The clause must not be the reason of any current assignment.
pub fn delete_clause(db: &mut ClauseDb, alloc: &mut ClauseAlloc, cref: ClauseRef) {
    let header = alloc.header_mut(cref);

    debug_assert!(!header.deleted(), "delete_clause for already deleted clause");

    header.set_deleted(true);

    if header.redundant() {
        db.count_redundant -= 1;
    } else {
        db.count_irredundant -= 1;
    }

    db.garbage_size += header.len();
}

/// Register a freshly installed transient learnt clause.
pub fn add_transient(db: &mut ClauseDb, cref: ClauseRef, install_level: usize) {
    // No backjump ever goes below level 0, so such a clause is permanent.
    if install_level > 0 {
        db.transient.push((cref, install_level as LitIdx));
    }
}

/// Discard transient learnt clauses after a backjump below their installation
/// level.
///
/// Keeps the watchlists consistent by removing the clause's two watches, so
/// this is safe to call mid-search.
pub fn purge_transient(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut WatchlistsP,
        AssignmentP,
        ImplGraphP,
    ),
    level: usize,
) {
    if ctx.part(ClauseDbP).transient.is_empty() {
        return;
    }

    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let (watchlists, ctx) = ctx.split_part_mut(WatchlistsP);

    let assignment = ctx.part(AssignmentP);
    let impl_graph = ctx.part(ImplGraphP);

    let transient = &mut db.transient;
    let count_redundant = &mut db.count_redundant;
    let count_irredundant = &mut db.count_irredundant;
    let garbage_size = &mut db.garbage_size;

    transient.retain(|&(cref, install_level)| {
        if (install_level as usize) <= level {
            return true;
        }

        let lits = alloc.lits(cref);
        let lit_0 = lits[0];
        let lit_1 = lits[1];

        debug_assert!(
            !(assignment.lit_is_true(lit_0)
                && impl_graph.reason(lit_0.var()) == &Reason::Long(cref)),
            "purging a locked transient clause"
        );

        if watchlists.enabled() {
            watchlists.unwatch_clause(cref, [lit_0, lit_1]);
        }

        let header = alloc.header_mut(cref);
        header.set_deleted(true);
        if header.redundant() {
            *count_redundant -= 1;
        } else {
            *count_irredundant -= 1;
        }
        *garbage_size += header.len();

        false
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use xorsat_formula::cnf_formula;

    use crate::context::set_var_count;

    #[test]
    fn counts_track_additions_and_deletions() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        let clauses = cnf_formula![
            1, 2, 3;
            4, -5, 6;
            -2, 3, -4, 5;
        ];

        let mut crefs = vec![];

        for (index, clause) in clauses.iter().enumerate() {
            let mut header = ClauseHeader::new();
            header.set_redundant(index == 2);
            crefs.push(add_clause(ctx.borrow(), header, clause));
        }

        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 2);
        assert_eq!(ctx.part(ClauseDbP).count_redundant(), 1);

        let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
        let alloc = ctx.part_mut(ClauseAllocP);
        delete_clause(db, alloc, crefs[0]);
        delete_clause(db, alloc, crefs[2]);

        assert_eq!(db.count_irredundant(), 1);
        assert_eq!(db.count_redundant(), 0);
        assert!(db.garbage_size > 0);
    }
}
