//! Materialized reason clauses for XOR implications.
//!
//! Unlike CNF clauses, XOR constraints do not directly contain the falsified
//! literals that conflict analysis needs to resolve over; which literals are
//! to blame depends on the assignment at propagation time. Whenever the XOR
//! watch scheme or the Gaussian engine propagates or conflicts, the implied
//! CNF clause is materialized into this buffer and referenced by index from
//! the implication graph.
//!
//! The buffer is synchronized with the trail: a mark is recorded when a
//! decision level starts and everything past the mark is dropped when the
//! level is backtracked, mirroring the trail's own level boundaries.
use xorsat_formula::Lit;

/// Compact reference to a materialized XOR reason clause.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct XorReasonRef {
    index: u32,
}

/// Buffer of materialized XOR reason clauses.
#[derive(Default)]
pub struct XorReasons {
    lits: Vec<Lit>,
    /// Start and length of each reason clause in `lits`.
    ranges: Vec<(u32, u32)>,
    /// Number of reasons present when each decision level started.
    level_marks: Vec<u32>,
}

impl XorReasons {
    /// Materialize a reason clause and return a reference to it.
    pub fn add(&mut self, lits: impl IntoIterator<Item = Lit>) -> XorReasonRef {
        let start = self.lits.len() as u32;
        self.lits.extend(lits);
        let len = self.lits.len() as u32 - start;

        let index = self.ranges.len() as u32;
        self.ranges.push((start, len));

        XorReasonRef { index }
    }

    /// The literals of a materialized reason clause.
    pub fn lits(&self, rref: XorReasonRef) -> &[Lit] {
        let (start, len) = self.ranges[rref.index as usize];
        &self.lits[start as usize..(start + len) as usize]
    }

    /// Record the buffer position at the start of a new decision level.
    pub fn new_level(&mut self) {
        self.level_marks.push(self.ranges.len() as u32);
    }

    /// Drop all reasons recorded in decision levels deeper than the given
    /// level.
    pub fn cancel_to_level(&mut self, level: usize) {
        if level >= self.level_marks.len() {
            return;
        }
        let keep_ranges = self.level_marks[level] as usize;
        if let Some(&(start, _)) = self.ranges.get(keep_ranges) {
            self.lits.truncate(start as usize);
        }
        self.ranges.truncate(keep_ranges);
        self.level_marks.truncate(level);
    }

    /// Drop all reasons.
    ///
    /// May only be called at level 0, after the referencing assignments were
    /// turned into permanent units.
    pub fn clear(&mut self) {
        assert!(self.level_marks.is_empty());
        self.lits.clear();
        self.ranges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use xorsat_formula::lits;

    #[test]
    fn ranges_and_rollback() {
        let mut reasons = XorReasons::default();

        let r0 = reasons.add(lits![1, -2].iter().cloned());
        reasons.new_level();
        let r1 = reasons.add(lits![3].iter().cloned());
        reasons.new_level();
        let r2 = reasons.add(lits![-4, 5, 6].iter().cloned());

        assert_eq!(reasons.lits(r0), &lits![1, -2][..]);
        assert_eq!(reasons.lits(r1), &lits![3][..]);
        assert_eq!(reasons.lits(r2), &lits![-4, 5, 6][..]);

        reasons.cancel_to_level(1);
        assert_eq!(reasons.lits(r0), &lits![1, -2][..]);
        assert_eq!(reasons.lits(r1), &lits![3][..]);
        assert_eq!(reasons.ranges.len(), 2);

        reasons.cancel_to_level(0);
        assert_eq!(reasons.ranges.len(), 1);

        reasons.clear();
        assert_eq!(reasons.ranges.len(), 0);
        assert_eq!(reasons.lits.len(), 0);
    }
}
