//! Serializing the clause database back to DIMACS.
//!
//! Used for dumping the simplified original formula and the learnt clauses on
//! exit or interrupt. The output is plain DIMACS with `x`-prefixed XOR lines
//! and can be read back by the parser on a subsequent run.
use std::io;

use partial_ref::{partial, PartialRef};

use xorsat_formula::{Var, XorClause};

use xorsat_dimacs::{write_dimacs_clauses, write_dimacs_xor_clauses};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, TernaryClausesP, TrailP,
    VariablesP, XorClausesP,
};

/// Write the level 0 assignments as unit clauses.
fn write_units(
    ctx: partial!(Context, AssignmentP, TrailP, VariablesP),
    target: &mut impl io::Write,
) -> io::Result<()> {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let assignment = ctx.part(AssignmentP);
    let units = (0..ctx.part(VariablesP).count()).filter_map(|index| {
        let var = Var::from_index(index);
        assignment.var_value(var).map(|value| [var.lit(value)])
    });

    write_dimacs_clauses(target, units)
}

/// Write the irredundant part of the formula, simplified by the permanent
/// assignments.
///
/// May only be called while no decisions are active.
pub fn write_irredundant_clauses(
    mut ctx: partial!(
        Context,
        AssignmentP,
        BinaryClausesP,
        ClauseAllocP,
        ClauseDbP,
        TernaryClausesP,
        TrailP,
        VariablesP,
        XorClausesP,
    ),
    target: &mut impl io::Write,
) -> io::Result<()> {
    write_units(ctx.borrow(), target)?;

    write_dimacs_clauses(
        &mut *target,
        ctx.part(BinaryClausesP)
            .iter()
            .filter(|&(_, redundant)| !redundant)
            .map(|(lits, _)| lits),
    )?;

    write_dimacs_clauses(
        &mut *target,
        ctx.part(TernaryClausesP)
            .iter()
            .filter(|&(_, redundant)| !redundant)
            .map(|(lits, _)| lits),
    )?;

    let db = ctx.part(ClauseDbP);
    let alloc = ctx.part(ClauseAllocP);
    write_dimacs_clauses(
        &mut *target,
        db.clauses.iter().filter_map(|&cref| {
            let header = alloc.header(cref);
            if header.deleted() || header.redundant() {
                None
            } else {
                Some(alloc.lits(cref))
            }
        }),
    )?;

    write_dimacs_xor_clauses(
        &mut *target,
        ctx.part(XorClausesP)
            .xors()
            .iter()
            .map(|xor| XorClause::new(xor.vars.clone(), xor.rhs)),
    )
}

/// Write the learnt clauses of at most the given size, together with the
/// permanent assignments.
///
/// May only be called while no decisions are active.
pub fn write_redundant_clauses(
    mut ctx: partial!(
        Context,
        AssignmentP,
        BinaryClausesP,
        ClauseAllocP,
        ClauseDbP,
        TernaryClausesP,
        TrailP,
        VariablesP,
    ),
    target: &mut impl io::Write,
    max_len: usize,
) -> io::Result<()> {
    write_units(ctx.borrow(), target)?;

    if max_len >= 2 {
        write_dimacs_clauses(
            &mut *target,
            ctx.part(BinaryClausesP)
                .iter()
                .filter(|&(_, redundant)| redundant)
                .map(|(lits, _)| lits),
        )?;
    }

    if max_len >= 3 {
        write_dimacs_clauses(
            &mut *target,
            ctx.part(TernaryClausesP)
                .iter()
                .filter(|&(_, redundant)| redundant)
                .map(|(lits, _)| lits),
        )?;
    }

    let db = ctx.part(ClauseDbP);
    let alloc = ctx.part(ClauseAllocP);
    write_dimacs_clauses(
        &mut *target,
        db.clauses.iter().filter_map(|&cref| {
            let header = alloc.header(cref);
            if header.deleted() || !header.redundant() || header.len() > max_len {
                None
            } else {
                Some(alloc.lits(cref))
            }
        }),
    )
}