//! On-the-fly Gaussian elimination over XOR matrices.
//!
//! Runs after propagation reaches a fixpoint at decision levels up to the
//! configured depth. Each matrix is brought to (reduced) row echelon form
//! with pivots chosen among the currently unassigned columns; rows left
//! without an unassigned variable are checked for conflicts and rows with
//! exactly one unassigned variable propagate it. The variables responsible
//! for a derived row are blamed through a materialized reason clause.
//!
//! The row state is snapshotted every nth decision level; backtracking
//! restores the nearest snapshot below the target level, undoing elimination
//! steps that were driven by since-retracted assignments. Matrices that stop
//! producing implications are disabled until the next full restart unless
//! configured otherwise.
use partial_ref::{partial, PartialRef};

use xorsat_formula::Var;

use crate::context::{
    AssignmentP, Context, GaussP, ImplGraphP, SolverConfigP, StatsP, TrailP, XorReasonsP,
};
use crate::prop::{enqueue_assignment, Assignment, Conflict, Reason};

/// One row of a matrix: a set of variable columns and a parity bit.
#[derive(Clone)]
pub struct GaussRow {
    bits: Vec<u64>,
    rhs: bool,
}

impl GaussRow {
    /// An all-zero row over `words * 64` columns.
    pub fn empty(words: usize, rhs: bool) -> GaussRow {
        GaussRow {
            bits: vec![0; words],
            rhs,
        }
    }

    /// Set the bit for a column.
    pub fn set(&mut self, col: usize) {
        self.bits[col / 64] ^= 1 << (col % 64);
    }

    /// Whether the bit for a column is set.
    pub fn test(&self, col: usize) -> bool {
        self.bits[col / 64] >> (col % 64) & 1 != 0
    }

    /// Add the other row to this one over GF(2).
    pub fn xor_with(&mut self, other: &GaussRow) {
        for (word, &other_word) in self.bits.iter_mut().zip(other.bits.iter()) {
            *word ^= other_word;
        }
        self.rhs ^= other.rhs;
    }

    /// Iterate over the set columns.
    pub fn cols<'a>(&'a self) -> impl Iterator<Item = usize> + 'a {
        self.bits.iter().enumerate().flat_map(|(word_index, &word)| {
            let mut word = word;
            std::iter::from_fn(move || {
                if word == 0 {
                    None
                } else {
                    let bit = word.trailing_zeros() as usize;
                    word &= word - 1;
                    Some(word_index * 64 + bit)
                }
            })
        })
    }
}

/// A matrix of XOR constraints over a connected set of variables.
pub struct GaussMatrix {
    /// Column index to variable mapping.
    vars: Vec<Var>,
    rows: Vec<GaussRow>,
    /// Row states saved on entering snapshot levels.
    snapshots: Vec<(usize, Vec<GaussRow>)>,
    /// Disabled after producing nothing for too long.
    disabled: bool,
    calls: u64,
    useful: u64,
}

impl GaussMatrix {
    pub fn new(vars: Vec<Var>, rows: Vec<GaussRow>) -> GaussMatrix {
        GaussMatrix {
            vars,
            rows,
            snapshots: vec![],
            disabled: false,
            calls: 0,
            useful: 0,
        }
    }
}

/// All matrices plus their lifecycle state.
pub struct Gauss {
    pub(crate) matrices: Vec<GaussMatrix>,
    /// The XOR store changed and the matrices need a rebuild.
    dirty: bool,
}

impl Default for Gauss {
    fn default() -> Gauss {
        Gauss {
            matrices: vec![],
            dirty: true,
        }
    }
}

impl Gauss {
    /// Request a matrix rebuild before the next elimination run.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The matrices match the XOR store again.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Whether the matrices need a rebuild.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Undo elimination driven by assignments above the given level.
    pub fn cancel_to_level(&mut self, level: usize) {
        for matrix in self.matrices.iter_mut() {
            let mut restore = None;
            while matrix
                .snapshots
                .last()
                .map(|&(snapshot_level, _)| snapshot_level > level)
                .unwrap_or(false)
            {
                restore = matrix.snapshots.pop();
            }
            if let Some((_, rows)) = restore {
                matrix.rows = rows;
            }
        }
    }

    /// Re-enable matrices disabled for being unhelpful.
    pub fn re_enable(&mut self) {
        for matrix in self.matrices.iter_mut() {
            matrix.disabled = false;
            matrix.calls = 0;
            matrix.useful = 0;
        }
    }
}

/// Outcome of one Gaussian elimination run.
pub enum GaussResult {
    /// No new implication was derived.
    Nothing,
    /// At least one unit was enqueued; propagation must run again.
    Propagated,
    /// A row evaluated to an odd parity over fully assigned variables.
    Conflict(Conflict),
}

/// Run elimination on all enabled matrices at the current decision level.
pub fn gauss_step(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut GaussP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut XorReasonsP,
        SolverConfigP,
    ),
) -> GaussResult {
    let level = ctx.part(TrailP).current_level();
    let save_every = ctx.part(SolverConfigP).gauss_save_every_nth;
    let iterative = ctx.part(SolverConfigP).gauss_iterative_reduce;
    let dont_disable = ctx.part(SolverConfigP).gauss_dont_disable;

    ctx.part_mut(StatsP).gauss_calls += 1;

    let mut propagated = false;

    let (gauss, mut ctx) = ctx.split_part_mut(GaussP);
    let (xor_reasons, mut ctx) = ctx.split_part_mut(XorReasonsP);

    for matrix in gauss.matrices.iter_mut() {
        if matrix.disabled {
            continue;
        }

        matrix.calls += 1;

        if level % save_every == 0
            && matrix.snapshots.last().map(|&(l, _)| l) != Some(level)
        {
            matrix.snapshots.push((level, matrix.rows.clone()));
        }

        eliminate(matrix, ctx.part(AssignmentP), iterative);

        // Classify the reduced rows.
        for row_index in 0..matrix.rows.len() {
            let (unassigned, parity) = {
                let assignment = ctx.part(AssignmentP);
                let row = &matrix.rows[row_index];
                let mut unassigned = None;
                let mut unassigned_count = 0;
                let mut parity = false;
                for col in row.cols() {
                    match assignment.var_value(matrix.vars[col]) {
                        None => {
                            unassigned = Some(matrix.vars[col]);
                            unassigned_count += 1;
                            if unassigned_count > 1 {
                                break;
                            }
                        }
                        Some(value) => parity ^= value,
                    }
                }
                if unassigned_count > 1 {
                    continue;
                }
                (unassigned, parity)
            };

            let row = &matrix.rows[row_index];

            match unassigned {
                None => {
                    if parity != row.rhs {
                        // The assigned variables of this row form a
                        // contradiction.
                        let assignment = ctx.part(AssignmentP);
                        let vars = &matrix.vars;
                        let rref = xor_reasons.add(row.cols().map(|col| {
                            vars[col].lit(assignment.var_value(vars[col]) == Some(false))
                        }));
                        ctx.part_mut(StatsP).gauss_conflicts += 1;
                        matrix.useful += 1;
                        return GaussResult::Conflict(Conflict::Xor(rref));
                    }
                }
                Some(implied_var) => {
                    let value = row.rhs ^ parity;
                    let assignment = ctx.part(AssignmentP);
                    let vars = &matrix.vars;
                    let rref = xor_reasons.add(row.cols().filter_map(|col| {
                        let var = vars[col];
                        assignment
                            .var_value(var)
                            .map(|assigned| var.lit(assigned == false))
                    }));
                    enqueue_assignment(
                        ctx.borrow(),
                        implied_var.lit(value),
                        Reason::Xor(rref),
                    );
                    ctx.part_mut(StatsP).gauss_propagations += 1;
                    matrix.useful += 1;
                    propagated = true;
                }
            }
        }

        if !dont_disable && matrix.calls >= 32 && matrix.useful == 0 {
            matrix.disabled = true;
        }
    }

    if propagated {
        GaussResult::Propagated
    } else {
        GaussResult::Nothing
    }
}

/// Bring a matrix to echelon form with pivots on unassigned columns.
fn eliminate(matrix: &mut GaussMatrix, assignment: &Assignment, full: bool) {
    let mut pivot_row = 0;

    for col in 0..matrix.vars.len() {
        if pivot_row >= matrix.rows.len() {
            break;
        }
        if assignment.var_value(matrix.vars[col]).is_some() {
            continue;
        }

        let source = match (pivot_row..matrix.rows.len())
            .find(|&row| matrix.rows[row].test(col))
        {
            Some(row) => row,
            None => continue,
        };

        matrix.rows.swap(pivot_row, source);

        let (before, rest) = matrix.rows.split_at_mut(pivot_row);
        let (pivot, after) = rest.split_first_mut().expect("pivot row in bounds");

        for row in after.iter_mut() {
            if row.test(col) {
                row.xor_with(pivot);
            }
        }
        if full {
            for row in before.iter_mut() {
                if row.test(col) {
                    row.xor_with(pivot);
                }
            }
        }

        pivot_row += 1;
    }
}
