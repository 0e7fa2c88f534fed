//! Unit propagation.
pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod ternary;
pub mod watch;

pub use assignment::{
    backtrack, enqueue_assignment, full_restart, new_decision_level, restart, Assignment, Trail,
};
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use watch::{enable_watchlists, Watch, Watchlists};

use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, StatsP,
    TernaryClausesP, TrailP, WatchlistsP, XorClausesP, XorReasonsP,
};
use crate::xor::store::propagate_xor;

use self::binary::propagate_binary;
use self::long::propagate_long;
use self::ternary::propagate_ternary;

/// Propagate all enqueued assignments.
///
/// Propagates assignments in the trail queue until none are left or a
/// conflict is detected. For each assignment the binary and ternary stores
/// are scanned first, so cheap forced propagations are found before any
/// clause memory is touched, then the long clause watchlists and finally the
/// XOR watches.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut WatchlistsP,
        mut XorClausesP,
        mut XorReasonsP,
        BinaryClausesP,
        ClauseDbP,
        TernaryClausesP,
    ),
) -> Result<(), Conflict> {
    if !ctx.part(WatchlistsP).enabled() {
        enable_watchlists(ctx.borrow());
    }

    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        ctx.part_mut(StatsP).propagations += 1;

        propagate_binary(ctx.borrow(), lit)?;
        propagate_ternary(ctx.borrow(), lit)?;
        propagate_long(ctx.borrow(), lit)?;
        propagate_xor(ctx.borrow(), lit)?;
    }

    Ok(())
}
