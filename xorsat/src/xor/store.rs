//! XOR constraint store and watch based propagation.
//!
//! Each constraint watches two of its variables, so it is only examined when
//! one of those is assigned. The watch scheme parallels the two-watched
//! literal scheme for long clauses: the triggering variable is moved to
//! position 1, a replacement watch is searched among the unwatched variables,
//! and only when none is unassigned the constraint is evaluated.
//!
//! One wrinkle has no clause counterpart: a parity constraint that holds
//! under a full assignment of its variables can become falsifiable again on
//! backtracking. The watches must therefore sit on the two variables with the
//! highest decision levels whenever the constraint has no unassigned variable
//! left; this guarantees that undoing any of its assignments also undoes a
//! watched one, keeping the trigger condition intact.
use std::mem::take;

use partial_ref::{partial, PartialRef};

use xorsat_formula::{Lit, Var};

use crate::context::{
    AssignmentP, Context, ImplGraphP, StatsP, TrailP, XorClausesP, XorReasonsP,
};
use crate::prop::{enqueue_assignment, Conflict, Reason};

/// An XOR constraint as stored by the solver.
///
/// The first two variables are the watched positions.
pub struct StoredXor {
    pub vars: Vec<Var>,
    pub rhs: bool,
}

/// XOR constraint store with per-variable watchlists.
#[derive(Default)]
pub struct XorClauses {
    xors: Vec<StoredXor>,
    /// Indices into `xors`, keyed by watched variable.
    watches: Vec<Vec<u32>>,
}

impl XorClauses {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count, vec![]);
    }

    /// Add an XOR constraint over at least two distinct unassigned variables.
    pub fn add_xor_clause(&mut self, vars: Vec<Var>, rhs: bool) {
        assert!(
            vars.len() >= 2,
            "XorClauses can only store constraints over two or more variables"
        );

        let index = self.xors.len() as u32;
        self.watches[vars[0].index()].push(index);
        self.watches[vars[1].index()].push(index);
        self.xors.push(StoredXor { vars, rhs });
    }

    /// Number of stored constraints.
    pub fn count(&self) -> usize {
        self.xors.len()
    }

    /// All stored constraints.
    pub fn xors(&self) -> &[StoredXor] {
        &self.xors
    }

    /// Take all stored constraints, leaving the store empty.
    ///
    /// Used together with [`replace_xors`](XorClauses::replace_xors) to
    /// rewrite the store during simplification.
    pub fn take_xors(&mut self) -> Vec<StoredXor> {
        for watch_list in self.watches.iter_mut() {
            watch_list.clear();
        }
        std::mem::take(&mut self.xors)
    }

    /// Replace the stored constraints and rebuild all watches.
    ///
    /// Used by simplification after substituting level 0 assignments. All
    /// remaining variables must be unassigned.
    pub fn replace_xors(&mut self, xors: Vec<StoredXor>) {
        for watch_list in self.watches.iter_mut() {
            watch_list.clear();
        }
        self.xors = xors;
        for (index, xor) in self.xors.iter().enumerate() {
            self.watches[xor.vars[0].index()].push(index as u32);
            self.watches[xor.vars[1].index()].push(index as u32);
        }
    }
}

/// Propagate all XOR constraints watching the assigned literal's variable.
///
/// On conflict returns a reference to the materialized conflicting clause.
pub fn propagate_xor(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut XorClausesP,
        mut XorReasonsP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let var = lit.var();

    let (xor_clauses, mut ctx) = ctx.split_part_mut(XorClausesP);
    let (xor_reasons, mut ctx) = ctx.split_part_mut(XorReasonsP);

    let XorClauses {
        ref mut xors,
        ref mut watches,
    } = *xor_clauses;

    let mut watch_list = take(&mut watches[var.index()]);

    let mut write = 0;
    let mut read = 0;
    let len = watch_list.len();
    let mut conflict = None;

    'watchers: while read < len {
        let xref = watch_list[read];
        read += 1;

        let xor = &mut xors[xref as usize];

        // Move the triggering variable to position 1, mirroring the long
        // clause propagation.
        if xor.vars[0] == var {
            xor.vars.swap(0, 1);
        }
        debug_assert_eq!(xor.vars[1], var);

        // Look for an unassigned replacement among the unwatched variables.
        for pos in 2..xor.vars.len() {
            let replacement = xor.vars[pos];
            if ctx.part(AssignmentP).var_value(replacement).is_none() {
                xor.vars[1] = replacement;
                xor.vars[pos] = var;
                watches[replacement.index()].push(xref);
                continue 'watchers;
            }
        }

        // No replacement: at most the other watched variable is unassigned.
        watch_list[write] = xref;
        write += 1;

        let other = xor.vars[0];
        let other_value = ctx.part(AssignmentP).var_value(other);

        match other_value {
            None => {
                // Unit: the other watched variable is forced to restore the
                // parity of the constraint.
                let assignment = ctx.part(AssignmentP);
                let parity = xor.vars[1..]
                    .iter()
                    .fold(false, |acc, &v| acc ^ (assignment.var_value(v) == Some(true)));
                let value = xor.rhs ^ parity;

                let rref = xor_reasons.add(
                    xor.vars[1..]
                        .iter()
                        .map(|&v| v.lit(assignment.var_value(v) == Some(false))),
                );

                enqueue_assignment(ctx.borrow(), other.lit(value), Reason::Xor(rref));
                ctx.part_mut(StatsP).xor_propagations += 1;
            }
            Some(other_value) => {
                // Fully assigned: evaluate, and re-point the watches at the
                // two deepest assignments so backtracking keeps the trigger
                // condition intact.
                let assignment = ctx.part(AssignmentP);
                let parity = other_value
                    ^ xor.vars[1..]
                        .iter()
                        .fold(false, |acc, &v| acc ^ (assignment.var_value(v) == Some(true)));

                let impl_graph = ctx.part(ImplGraphP);
                let mut deepest = 0;
                for pos in 2..xor.vars.len() {
                    if impl_graph.level(xor.vars[pos]) > impl_graph.level(xor.vars[deepest]) {
                        deepest = pos;
                    }
                }
                if deepest != 0 {
                    let old_watch = xor.vars[0];
                    xor.vars.swap(0, deepest);
                    watches[old_watch.index()].retain(|&x| x != xref);
                    watches[xor.vars[0].index()].push(xref);
                }

                if parity != xor.rhs {
                    let assignment = ctx.part(AssignmentP);
                    let rref = xor_reasons.add(
                        xor.vars
                            .iter()
                            .map(|&v| v.lit(assignment.var_value(v) == Some(false))),
                    );
                    ctx.part_mut(StatsP).xor_conflicts += 1;

                    while read < len {
                        watch_list[write] = watch_list[read];
                        write += 1;
                        read += 1;
                    }
                    conflict = Some(Conflict::Xor(rref));
                    break;
                }
            }
        }
    }

    watch_list.truncate(write);
    watches[var.index()] = watch_list;

    match conflict {
        None => Ok(()),
        Some(conflict) => Err(conflict),
    }
}
