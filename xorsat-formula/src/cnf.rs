//! CNF formulas extended with XOR constraints.
use std::cmp::max;
use std::fmt;
use std::iter::Extend;
use std::ops::Range;

use crate::lit::{Lit, Var};

/// A parity constraint over a set of variables.
///
/// Asserts that the values of `vars` XOR to `rhs`. In the extended DIMACS
/// encoding this corresponds to a line `x l₁ … lₖ 0`, where the constraint
/// starts with `rhs = true` and every negated literal flips it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct XorClause {
    vars: Vec<Var>,
    rhs: bool,
}

impl XorClause {
    /// Create a parity constraint asserting that `vars` XOR to `rhs`.
    pub fn new(vars: Vec<Var>, rhs: bool) -> XorClause {
        XorClause { vars, rhs }
    }

    /// Create a parity constraint from signed literals.
    ///
    /// Each negated literal flips the right-hand side, so the constraint over
    /// the underlying variables is equivalent to requiring the literals to
    /// XOR to `true`.
    pub fn from_lits(lits: &[Lit]) -> XorClause {
        let mut rhs = true;
        let vars = lits
            .iter()
            .map(|&lit| {
                rhs ^= lit.is_negative();
                lit.var()
            })
            .collect();
        XorClause { vars, rhs }
    }

    /// The variables of the constraint.
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// The parity the variables must XOR to.
    pub fn rhs(&self) -> bool {
        self.rhs
    }
}

/// A formula in conjunctive normal form (CNF), optionally extended with XOR
/// constraints.
///
/// The CNF part is equivalent to a `Vec<Vec<Lit>>` but stored in a single
/// buffer for all literals.
#[derive(Default, Eq)]
pub struct CnfFormula {
    var_count: usize,
    literals: Vec<Lit>,
    clause_ranges: Vec<Range<usize>>,
    xor_clauses: Vec<XorClause>,
}

impl CnfFormula {
    /// Create an empty formula.
    pub fn new() -> CnfFormula {
        CnfFormula::default()
    }

    /// Number of variables in the formula.
    ///
    /// This also counts missing variables if a variable with a higher index is
    /// present. A vector of this length can be indexed with the variable
    /// indices present.
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Increase the number of variables in the formula.
    ///
    /// If the parameter is less than the current variable count do nothing.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_count = max(self.var_count, count)
    }

    /// Number of CNF clauses in the formula.
    pub fn len(&self) -> usize {
        self.clause_ranges.len()
    }

    /// Whether the formula contains neither clauses nor XOR constraints.
    pub fn is_empty(&self) -> bool {
        self.clause_ranges.is_empty() && self.xor_clauses.is_empty()
    }

    /// Iterator over all CNF clauses.
    pub fn iter(&self) -> impl Iterator<Item = &[Lit]> {
        let literals = &self.literals;
        self.clause_ranges
            .iter()
            .map(move |range| &literals[range.clone()])
    }

    /// The XOR constraints of the formula.
    pub fn xor_clauses(&self) -> &[XorClause] {
        &self.xor_clauses
    }
}

/// Extend a formula with new variables, clauses and XOR constraints.
pub trait ExtendFormula {
    /// Appends a clause to the formula.
    fn add_clause(&mut self, literals: &[Lit]);

    /// Appends an XOR constraint to the formula.
    fn add_xor_clause(&mut self, xor: XorClause);
}

impl ExtendFormula for CnfFormula {
    fn add_clause(&mut self, literals: &[Lit]) {
        let begin = self.literals.len();
        self.literals.extend_from_slice(literals);
        let end = self.literals.len();

        for &lit in self.literals[begin..end].iter() {
            self.var_count = max(lit.index() + 1, self.var_count);
        }

        self.clause_ranges.push(begin..end);
    }

    fn add_xor_clause(&mut self, xor: XorClause) {
        for &var in xor.vars() {
            self.var_count = max(var.index() + 1, self.var_count);
        }
        self.xor_clauses.push(xor);
    }
}

/// Convert any iterable of [`Lit`] iterables into a CnfFormula
impl<F, I, L> From<F> for CnfFormula
where
    F: IntoIterator<Item = I>,
    I: IntoIterator<Item = L>,
    Vec<Lit>: Extend<L>,
{
    fn from(formula: F) -> CnfFormula {
        let mut cnf_formula = CnfFormula::new();
        let mut buffer = vec![];
        for clause in formula {
            buffer.clear();
            buffer.extend(clause);
            cnf_formula.add_clause(&buffer);
        }
        cnf_formula
    }
}

impl fmt::Debug for CnfFormula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.var_count(), f)?;
        f.debug_list().entries(self.iter()).finish()?;
        if !self.xor_clauses.is_empty() {
            f.debug_list().entries(self.xor_clauses.iter()).finish()?;
        }
        Ok(())
    }
}

impl PartialEq for CnfFormula {
    fn eq(&self, other: &CnfFormula) -> bool {
        self.var_count() == other.var_count()
            && self.clause_ranges.len() == other.clause_ranges.len()
            && self.xor_clauses == other.xor_clauses
            && self
                .clause_ranges
                .iter()
                .zip(other.clause_ranges.iter())
                .all(|(range_a, range_b)| {
                    self.literals[range_a.clone()] == other.literals[range_b.clone()]
                })
    }
}

#[cfg(any(test, feature = "proptest-strategies"))]
#[doc(hidden)]
pub mod strategy {
    use super::*;

    use proptest::{collection::SizeRange, prelude::*};

    use crate::lit::strategy::lit;

    pub fn vec_formula(
        vars: impl Strategy<Value = usize>,
        clauses: impl Into<SizeRange>,
        clause_len: impl Into<SizeRange>,
    ) -> impl Strategy<Value = Vec<Vec<Lit>>> {
        let clauses = clauses.into();
        let clause_len = clause_len.into();
        vars.prop_flat_map(move |vars| {
            proptest::collection::vec(
                proptest::collection::vec(lit(0..vars), clause_len.clone()),
                clauses.clone(),
            )
        })
    }

    pub fn cnf_formula(
        vars: impl Strategy<Value = usize>,
        clauses: impl Into<SizeRange>,
        clause_len: impl Into<SizeRange>,
    ) -> impl Strategy<Value = CnfFormula> {
        vec_formula(vars, clauses, clause_len).prop_map(CnfFormula::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_from_lits_tracks_parity() {
        let xor = XorClause::from_lits(&crate::lits![1, 2, 3]);
        assert_eq!(xor.vars(), &crate::vars![1, 2, 3]);
        assert!(xor.rhs());

        let xor = XorClause::from_lits(&crate::lits![-1, 2]);
        assert_eq!(xor.vars(), &crate::vars![1, 2]);
        assert!(!xor.rhs());

        let xor = XorClause::from_lits(&crate::lits![-1, -2]);
        assert!(xor.rhs());
    }

    #[test]
    fn var_count_covers_xor_vars() {
        let mut formula = CnfFormula::new();
        formula.add_clause(&crate::lits![1, 2]);
        formula.add_xor_clause(crate::xor_clause![4, 5; false]);
        assert_eq!(formula.var_count(), 5);
    }

    #[test]
    fn formula_eq_considers_xors() {
        let mut a = CnfFormula::new();
        let mut b = CnfFormula::new();
        a.add_clause(&crate::lits![1, 2]);
        b.add_clause(&crate::lits![1, 2]);
        assert_eq!(a, b);
        a.add_xor_clause(crate::xor_clause![1, 2; true]);
        assert_ne!(a, b);
    }
}
