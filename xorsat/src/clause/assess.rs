//! Assessment of learned clauses.
use partial_ref::{partial, PartialRef};

use crate::context::{Context, SolverConfigP};

use super::ClauseHeader;

/// Generate the header for a newly learned clause with the given glue level.
///
/// Low glue clauses are protected from database reduction. When a glue bound
/// is configured, clauses born above it are transient and will be discarded
/// at the first backjump below their installation level.
pub fn assess_learned_clause(
    ctx: partial!(Context, SolverConfigP),
    glue: usize,
) -> ClauseHeader {
    let config = ctx.part(SolverConfigP);

    let mut header = ClauseHeader::new();

    header.set_redundant(true);
    header.set_glue(glue);

    if glue <= 2 {
        header.set_protected(true);
    } else if config.max_glue > 0 && glue > config.max_glue {
        header.set_transient(true);
    }

    header
}
