//! Partitioning XOR constraints into matrices.
//!
//! Constraints sharing variables interact under row reduction, while
//! unrelated ones only blow up the matrix, so constraints are grouped by the
//! connected components of their variable sharing graph. Components outside
//! the configured row bounds stay with the watch based propagator only, and
//! at most `gauss_max_num_matrixes` components (largest first) become
//! matrices.
use partial_ref::{partial, PartialRef};

use rustc_hash::FxHashMap;

use xorsat_formula::Var;

use crate::context::{Context, GaussP, SolverConfigP, XorClausesP};

use super::gauss::{GaussMatrix, GaussRow};
use super::store::StoredXor;

/// Union-find over variable indices.
struct ComponentFind {
    parent: FxHashMap<Var, Var>,
}

impl ComponentFind {
    fn new() -> ComponentFind {
        ComponentFind {
            parent: FxHashMap::default(),
        }
    }

    fn find(&mut self, var: Var) -> Var {
        let parent = *self.parent.entry(var).or_insert(var);
        if parent == var {
            return var;
        }
        let root = self.find(parent);
        self.parent.insert(var, root);
        root
    }

    fn union(&mut self, a: Var, b: Var) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent.insert(root_a, root_b);
        }
    }
}

/// Rebuild the Gaussian matrices from the current XOR store.
///
/// Must be called while all stored constraint variables are unassigned, i.e.
/// after level 0 substitution.
pub fn init_matrices(
    mut ctx: partial!(Context, mut GaussP, SolverConfigP, XorClausesP),
) {
    let (gauss, mut ctx) = ctx.split_part_mut(GaussP);
    let config = ctx.part(SolverConfigP);
    let xor_clauses = ctx.part(XorClausesP);

    gauss.matrices.clear();
    gauss.mark_clean();

    if config.gauss_decision_until == 0 || xor_clauses.count() == 0 {
        return;
    }

    // Group constraints by connected components of shared variables.
    let mut components = ComponentFind::new();
    for xor in xor_clauses.xors() {
        for &var in &xor.vars[1..] {
            components.union(xor.vars[0], var);
        }
    }

    let mut by_component = FxHashMap::<Var, Vec<&StoredXor>>::default();
    for xor in xor_clauses.xors() {
        let root = if config.gauss_no_matrix_find {
            Var::from_index(0)
        } else {
            components.find(xor.vars[0])
        };
        by_component.entry(root).or_insert_with(Vec::new).push(xor);
    }

    let mut groups: Vec<Vec<&StoredXor>> = by_component
        .into_iter()
        .map(|(_, group)| group)
        .filter(|group| {
            group.len() >= config.gauss_min_matrix_rows
                && group.len() <= config.gauss_max_matrix_rows
        })
        .collect();

    // Keep the largest components, deterministically ordered.
    groups.sort_by_key(|group| {
        std::cmp::Reverse((group.len(), group[0].vars[0].index()))
    });
    groups.truncate(config.gauss_max_num_matrixes);

    for group in groups {
        gauss.matrices.push(build_matrix(&group, config.gauss_order_cols));
    }
}

/// Build one matrix from a group of constraints.
fn build_matrix(group: &[&StoredXor], order_cols: bool) -> GaussMatrix {
    let mut occurrences = FxHashMap::<Var, usize>::default();
    for xor in group {
        for &var in &xor.vars {
            *occurrences.entry(var).or_insert(0) += 1;
        }
    }

    let mut vars: Vec<Var> = occurrences.keys().cloned().collect();
    if order_cols {
        // Frequent variables first keeps the elimination fill-in low.
        vars.sort_by_key(|&var| (std::cmp::Reverse(occurrences[&var]), var.index()));
    } else {
        vars.sort_by_key(|&var| var.index());
    }

    let col_of: FxHashMap<Var, usize> = vars
        .iter()
        .enumerate()
        .map(|(col, &var)| (var, col))
        .collect();

    let words = (vars.len() + 63) / 64;
    let rows = group
        .iter()
        .map(|xor| {
            let mut row = GaussRow::empty(words, xor.rhs);
            for &var in &xor.vars {
                row.set(col_of[&var]);
            }
            row
        })
        .collect();

    GaussMatrix::new(vars, rows)
}
