//! Propagation of ternary clauses.
use partial_ref::{partial, PartialRef};

use xorsat_formula::Lit;

use crate::context::{AssignmentP, Context, ImplGraphP, TernaryClausesP, TrailP};

use super::enqueue_assignment;
use super::{Conflict, Reason};

/// Propagate all literals implied by the given literal via ternary clauses.
///
/// The three-way case analysis happens entirely on the inline entries, so no
/// clause memory is accessed.
pub fn propagate_ternary(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut TrailP,
        TernaryClausesP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let (ternary_clauses, mut ctx) = ctx.split_part(TernaryClausesP);

    for entry in ternary_clauses.implied(lit) {
        let [lit_a, lit_b] = entry.other;
        let assignment = ctx.part(AssignmentP);

        if assignment.lit_is_true(lit_a) || assignment.lit_is_true(lit_b) {
            continue;
        }

        match (assignment.lit_value(lit_a), assignment.lit_value(lit_b)) {
            (Some(false), Some(false)) => {
                return Err(Conflict::Ternary([lit_a, lit_b, !lit]));
            }
            (Some(false), None) => {
                enqueue_assignment(ctx.borrow(), lit_b, Reason::Ternary([lit_a, !lit]));
            }
            (None, Some(false)) => {
                enqueue_assignment(ctx.borrow(), lit_a, Reason::Ternary([lit_b, !lit]));
            }
            (None, None) => {}
            _ => unreachable!("true literals are handled above"),
        }
    }

    Ok(())
}
