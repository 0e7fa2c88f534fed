//! Binary clauses.
//!
//! Binary clauses are not stored in the clause arena. Instead they are
//! inlined into per-literal implication lists, so propagating them touches no
//! clause memory at all. A clause `(a ∨ b)` is recorded in the lists of `¬a`
//! and `¬b`, each entry carrying the respective other literal.
use xorsat_formula::Lit;

use crate::prop::Assignment;

/// One half of a binary clause.
#[derive(Copy, Clone)]
pub struct BinaryEntry {
    /// The other literal of the clause.
    pub other: Lit,
    /// Whether the clause is learnt.
    pub redundant: bool,
}

/// Binary clauses.
#[derive(Default)]
pub struct BinaryClauses {
    by_lit: Vec<Vec<BinaryEntry>>,
    count_irredundant: usize,
    count_redundant: usize,
}

impl BinaryClauses {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Add a binary clause.
    pub fn add_binary_clause(&mut self, lits: [Lit; 2], redundant: bool) {
        for i in 0..2 {
            self.by_lit[(!lits[i]).code()].push(BinaryEntry {
                other: lits[i ^ 1],
                redundant,
            });
        }
        if redundant {
            self.count_redundant += 1;
        } else {
            self.count_irredundant += 1;
        }
    }

    /// Implications of a given literal.
    pub fn implied(&self, lit: Lit) -> &[BinaryEntry] {
        &self.by_lit[lit.code()]
    }

    /// Number of binary clauses.
    pub fn count(&self) -> usize {
        self.count_irredundant + self.count_redundant
    }

    /// Number of learnt binary clauses.
    pub fn count_redundant(&self) -> usize {
        self.count_redundant
    }

    /// Iterate over all binary clauses, each reported once.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = ([Lit; 2], bool)> + 'a {
        self.by_lit.iter().enumerate().flat_map(|(code, entries)| {
            let lit = !Lit::from_code(code);
            entries.iter().filter_map(move |entry| {
                // Each clause is stored twice, report it from the smaller lit.
                if lit.code() < entry.other.code() {
                    Some(([lit, entry.other], entry.redundant))
                } else {
                    None
                }
            })
        })
    }

    /// Remove all clauses satisfied at level 0.
    ///
    /// May only be called at level 0 with all assignments propagated; under
    /// that precondition a binary clause containing a false literal is either
    /// satisfied or would have been a conflict.
    pub fn simplify(&mut self, assignment: &Assignment) {
        let mut count_irredundant = 0;
        let mut count_redundant = 0;

        for (code, entries) in self.by_lit.iter_mut().enumerate() {
            let lit = !Lit::from_code(code);
            entries.retain(|entry| {
                if assignment.lit_is_true(lit) || assignment.lit_is_true(entry.other) {
                    return false;
                }
                debug_assert!(assignment.lit_is_unk(lit) && assignment.lit_is_unk(entry.other));
                if lit.code() < entry.other.code() {
                    if entry.redundant {
                        count_redundant += 1;
                    } else {
                        count_irredundant += 1;
                    }
                }
                true
            });
        }

        self.count_irredundant = count_irredundant;
        self.count_redundant = count_redundant;
    }
}
