//! Ternary clauses.
//!
//! Like binary clauses, ternary clauses live outside the clause arena. A
//! clause `(a ∨ b ∨ c)` is recorded in the lists of `¬a`, `¬b` and `¬c`, each
//! entry carrying the two other literals, so the three-way case analysis
//! during propagation needs no memory indirection.
use xorsat_formula::Lit;

use crate::binary::BinaryClauses;
use crate::prop::Assignment;

/// One third of a ternary clause.
#[derive(Copy, Clone)]
pub struct TernaryEntry {
    /// The other two literals of the clause.
    pub other: [Lit; 2],
    /// Whether the clause is learnt.
    pub redundant: bool,
}

/// Ternary clauses.
#[derive(Default)]
pub struct TernaryClauses {
    by_lit: Vec<Vec<TernaryEntry>>,
    count_irredundant: usize,
    count_redundant: usize,
}

impl TernaryClauses {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Add a ternary clause.
    pub fn add_ternary_clause(&mut self, lits: [Lit; 3], redundant: bool) {
        for i in 0..3 {
            self.by_lit[(!lits[i]).code()].push(TernaryEntry {
                other: [lits[(i + 1) % 3], lits[(i + 2) % 3]],
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
    pub fn implied(&self, lit: Lit) -> &[TernaryEntry] {
        &self.by_lit[lit.code()]
    }

    /// Number of ternary clauses.
    pub fn count(&self) -> usize {
        self.count_irredundant + self.count_redundant
    }

    /// Number of learnt ternary clauses.
    pub fn count_redundant(&self) -> usize {
        self.count_redundant
    }

    /// Iterate over all ternary clauses, each reported once.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = ([Lit; 3], bool)> + 'a {
        self.by_lit.iter().enumerate().flat_map(|(code, entries)| {
            let lit = !Lit::from_code(code);
            entries.iter().filter_map(move |entry| {
                // Each clause is stored three times, report it from the
                // smallest lit.
                if lit.code() < entry.other[0].code() && lit.code() < entry.other[1].code() {
                    Some(([lit, entry.other[0], entry.other[1]], entry.redundant))
                } else {
                    None
                }
            })
        })
    }

    /// Remove satisfied clauses and strip false literals at level 0.
    ///
    /// Clauses with a false literal become binary and move to the binary
    /// store. May only be called at level 0 with all assignments propagated,
    /// so at most one literal of a non-satisfied clause can be false.
    pub fn simplify(&mut self, assignment: &Assignment, binary: &mut BinaryClauses) {
        let mut count_irredundant = 0;
        let mut count_redundant = 0;

        for (code, entries) in self.by_lit.iter_mut().enumerate() {
            let lit = !Lit::from_code(code);
            entries.retain(|entry| {
                let lits = [lit, entry.other[0], entry.other[1]];

                if lits.iter().any(|&l| assignment.lit_is_true(l)) {
                    return false;
                }

                let canonical = lit.code() < entry.other[0].code()
                    && lit.code() < entry.other[1].code();

                if lits.iter().any(|&l| assignment.lit_is_false(l)) {
                    // Demote to a binary clause, from the canonical copy only.
                    if canonical {
                        let mut remaining = lits
                            .iter()
                            .cloned()
                            .filter(|&l| !assignment.lit_is_false(l));
                        let lit_0 = remaining.next().expect("ternary clause fully false");
                        let lit_1 = remaining.next().expect("false ternary clause not reported");
                        binary.add_binary_clause([lit_0, lit_1], entry.redundant);
                    }
                    return false;
                }

                if canonical {
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
