//! Loading a formula into the solver.
use partial_ref::{partial, PartialRef};

use xorsat_formula::{Lit, Var, XorClause};

use crate::clause::{db, ClauseHeader};
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, GaussP, ImplGraphP,
    SolverStateP, TernaryClausesP, TmpDataP, TrailP, VsidsP, WatchlistsP, XorClausesP,
    XorReasonsP,
};
use crate::prop::{assignment, full_restart, Reason};
use crate::state::SatState;

/// Adds a clause to the current formula.
///
/// Removes duplicated literals, ignores tautological clauses (eg. x v -x v
/// y), handles empty clauses and dispatches among unit, binary, ternary and
/// long clauses.
///
/// Does not adjust the solver's variable count. If necessary that has to be
/// done before calling this.
pub fn load_clause(
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
        mut VsidsP,
        mut WatchlistsP,
        mut XorReasonsP,
    ),
    lits: &[Lit],
) {
    match ctx.part(SolverStateP).sat_state {
        SatState::Unsat => return,
        SatState::Sat => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unknown;
        }
        _ => {}
    }

    // Restart the search when the user adds new clauses.
    full_restart(ctx.borrow());

    let (tmp_data, mut ctx) = ctx.split_part_mut(TmpDataP);

    tmp_data.lits.clear();
    tmp_data.lits.extend_from_slice(lits);
    let lits = &mut tmp_data.lits;
    let simplified_lits = &mut tmp_data.lits_2;

    lits.sort_unstable();
    lits.dedup();

    // Detect tautological clauses
    let mut last = None;

    for &lit in lits.iter() {
        if last == Some(!lit) {
            return;
        }
        last = Some(lit);
    }

    // Remove false literals and satisfied clauses
    simplified_lits.clear();

    for &lit in lits.iter() {
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => return,
            Some(false) => (),
            None => {
                simplified_lits.push(lit);
            }
        }
    }

    match simplified_lits[..] {
        [] => ctx.part_mut(SolverStateP).sat_state = SatState::Unsat,
        [lit] => assignment::enqueue_assignment(ctx.borrow(), lit, Reason::Unit),
        [lit_0, lit_1] => {
            ctx.part_mut(BinaryClausesP)
                .add_binary_clause([lit_0, lit_1], false);
        }
        [lit_0, lit_1, lit_2] => {
            ctx.part_mut(TernaryClausesP)
                .add_ternary_clause([lit_0, lit_1, lit_2], false);
        }
        _ => {
            let header = ClauseHeader::new();
            db::add_clause(ctx.borrow(), header, simplified_lits);
        }
    }
}

/// Adds an XOR constraint to the current formula.
///
/// Duplicate variable pairs cancel, assigned variables fold into the right
/// hand side, empty constraints are dropped or make the formula
/// unsatisfiable, and single variable constraints become units.
pub fn load_xor_clause(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut GaussP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP,
        mut VsidsP,
        mut XorClausesP,
        mut XorReasonsP,
    ),
    xor: &XorClause,
) {
    match ctx.part(SolverStateP).sat_state {
        SatState::Unsat => return,
        SatState::Sat => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unknown;
        }
        _ => {}
    }

    // Restart the search when the user adds new constraints.
    full_restart(ctx.borrow());

    let mut vars: Vec<Var> = xor.vars().to_vec();
    let mut rhs = xor.rhs();

    // v ⊕ v cancels.
    vars.sort_unstable();
    let mut kept = 0;
    let mut index = 0;
    while index < vars.len() {
        if index + 1 < vars.len() && vars[index] == vars[index + 1] {
            index += 2;
        } else {
            vars[kept] = vars[index];
            kept += 1;
            index += 1;
        }
    }
    vars.truncate(kept);

    // Substitute the permanent assignments.
    vars.retain(|&var| match ctx.part(AssignmentP).var_value(var) {
        Some(value) => {
            rhs ^= value;
            false
        }
        None => true,
    });

    match vars.len() {
        0 => {
            if rhs {
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            }
        }
        1 => {
            assignment::enqueue_assignment(ctx.borrow(), vars[0].lit(rhs), Reason::Unit);
        }
        _ => {
            ctx.part_mut(XorClausesP).add_xor_clause(vars, rhs);
            ctx.part_mut(GaussP).mark_dirty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use xorsat_formula::{lits, xor_clause};

    use crate::context::set_var_count;

    #[test]
    fn unsat_on_empty_clause() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &[]);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    #[test]
    fn unit_clauses() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &lits![1]);

        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        load_clause(ctx.borrow(), &lits![3, -3]);

        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        load_clause(ctx.borrow(), &lits![-2]);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);

        load_clause(ctx.borrow(), &lits![1, 1]);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);

        load_clause(ctx.borrow(), &lits![2]);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    #[test]
    fn short_clause_dispatch() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &lits![1, 2]);
        assert_eq!(ctx.part(BinaryClausesP).count(), 1);

        load_clause(ctx.borrow(), &lits![-1, 3, 3]);
        assert_eq!(ctx.part(BinaryClausesP).count(), 2);

        load_clause(ctx.borrow(), &lits![4, -4]);
        assert_eq!(ctx.part(BinaryClausesP).count(), 2);

        load_clause(ctx.borrow(), &lits![1, 2, 3]);
        assert_eq!(ctx.part(TernaryClausesP).count(), 1);

        load_clause(ctx.borrow(), &lits![-2, 3, 3, 4]);
        assert_eq!(ctx.part(TernaryClausesP).count(), 2);

        load_clause(ctx.borrow(), &lits![1, 2, 3, 4]);
        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 1);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);
    }

    #[test]
    fn xor_normalization() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        // 1 ⊕ 1 ⊕ 2 ⊕ 3 = 1 collapses to 2 ⊕ 3 = 1.
        load_xor_clause(ctx.borrow(), &xor_clause![1, 1, 2, 3; true]);
        assert_eq!(ctx.part(XorClausesP).count(), 1);

        // An empty even constraint is a no-op.
        load_xor_clause(ctx.borrow(), &xor_clause![4, 4; false]);
        assert_eq!(ctx.part(XorClausesP).count(), 1);
        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);

        // A single variable constraint becomes a unit.
        load_xor_clause(ctx.borrow(), &xor_clause![5; true]);
        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        // An empty odd constraint is unsatisfiable.
        load_xor_clause(ctx.borrow(), &xor_clause![6, 6; true]);
        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }
}
