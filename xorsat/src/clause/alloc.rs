//! Clause arena.
//!
//! Long clauses are bump-allocated: their literals go into one shared buffer
//! and are never freed individually; space held by deleted clauses is only
//! reclaimed when the whole arena is rebuilt by garbage collection.
//!
//! Rather than interleaving headers and literals in a single word buffer,
//! the arena keeps a slot table: per clause one [`ClauseHeader`] plus the
//! offset of its literal span. A [`ClauseRef`] is an index into that table,
//! so it survives buffer growth and every access is an ordinary
//! bounds-checked slice operation. This costs one extra word per clause
//! compared to an offset-encoded reference, and buys accessors free of any
//! unsafe code.
use xorsat_formula::Lit;

use super::ClauseHeader;

/// Integer type used for slot indices and literal offsets.
type SlotIdx = u32;

/// A clause's header and the position of its literals.
struct ClauseSlot {
    header: ClauseHeader,
    offset: SlotIdx,
}

/// Bump allocator for clause storage.
#[derive(Default)]
pub struct ClauseAlloc {
    slots: Vec<ClauseSlot>,
    lits: Vec<Lit>,
}

impl ClauseAlloc {
    /// Create an empty clause arena.
    pub fn new() -> ClauseAlloc {
        ClauseAlloc::default()
    }

    /// Create a clause arena with capacity for the given number of literals.
    pub fn with_capacity(lit_capacity: usize) -> ClauseAlloc {
        ClauseAlloc {
            // Most long clauses are learnt and short.
            slots: Vec::with_capacity(lit_capacity / 4),
            lits: Vec::with_capacity(lit_capacity),
        }
    }

    /// Allocate space for and add a new clause.
    ///
    /// Clauses have a minimal size of 3, as unit, binary and ternary clauses
    /// are stored inline elsewhere.
    ///
    /// The length field of the header is set to the size of the given slice.
    /// The returned [`ClauseRef`] can be used to access the new clause.
    pub fn add_clause(&mut self, mut header: ClauseHeader, lits: &[Lit]) -> ClauseRef {
        assert!(
            lits.len() >= 3,
            "ClauseAlloc can only store ternary and larger clauses"
        );
        assert!(
            self.lits.len() <= SlotIdx::max_value() as usize
                && self.slots.len() < SlotIdx::max_value() as usize,
            "Exceeded ClauseAlloc's maximal size"
        );

        header.set_len(lits.len());

        let index = self.slots.len() as SlotIdx;
        self.slots.push(ClauseSlot {
            header,
            offset: self.lits.len() as SlotIdx,
        });
        self.lits.extend_from_slice(lits);

        ClauseRef { index }
    }

    /// Access the header of a clause.
    pub fn header(&self, cref: ClauseRef) -> &ClauseHeader {
        &self.slots[cref.index as usize].header
    }

    /// Mutate the header of a clause.
    ///
    /// Shrinking the length this way leaves the trailing literals as garbage
    /// in the buffer; the caller accounts for them until the next
    /// collection.
    pub fn header_mut(&mut self, cref: ClauseRef) -> &mut ClauseHeader {
        &mut self.slots[cref.index as usize].header
    }

    /// The literals of a clause.
    pub fn lits(&self, cref: ClauseRef) -> &[Lit] {
        let slot = &self.slots[cref.index as usize];
        let offset = slot.offset as usize;
        &self.lits[offset..offset + slot.header.len()]
    }

    /// Mutable slice of the literals of a clause.
    pub fn lits_mut(&mut self, cref: ClauseRef) -> &mut [Lit] {
        let slot = &self.slots[cref.index as usize];
        let offset = slot.offset as usize;
        let len = slot.header.len();
        &mut self.lits[offset..offset + len]
    }

    /// Current literal buffer size.
    pub fn buffer_size(&self) -> usize {
        self.lits.len()
    }
}

/// Compact reference to a clause.
///
/// Indexes the slot table of a [`ClauseAlloc`]. Only valid for the arena
/// that produced it and invalidated by garbage collection, which hands out a
/// remapping instead.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ClauseRef {
    index: SlotIdx,
}

#[cfg(test)]
mod tests {
    use super::*;

    use xorsat_formula::cnf::{strategy::*, CnfFormula};
    use xorsat_formula::ExtendFormula;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn stored_clauses_read_back(input in cnf_formula(1..100usize, 0..1000, 3..30)) {
            let mut alloc = ClauseAlloc::new();
            let mut crefs = vec![];

            for clause_lits in input.iter() {
                crefs.push(alloc.add_clause(ClauseHeader::new(), clause_lits));
            }

            let mut recovered = CnfFormula::new();

            for cref in crefs {
                prop_assert_eq!(alloc.header(cref).len(), alloc.lits(cref).len());
                recovered.add_clause(alloc.lits(cref));
            }

            // Ignore difference caused by unused vars
            recovered.set_var_count(input.var_count());

            prop_assert_eq!(input, recovered);
        }

        #[test]
        fn mutation_and_shrinking(input in cnf_formula(1..100usize, 0..1000, 3..30)) {
            let mut alloc = ClauseAlloc::new();
            let mut crefs = vec![];

            for clause_lits in input.iter() {
                crefs.push(alloc.add_clause(ClauseHeader::new(), clause_lits));
            }

            for &cref in crefs.iter() {
                alloc.lits_mut(cref).reverse();
            }

            for &cref in crefs.iter() {
                let clause_len = alloc.lits(cref).len();
                if clause_len > 3 {
                    alloc.header_mut(cref).set_len(clause_len - 1);
                }
            }

            for (&cref, lits) in crefs.iter().zip(input.iter()) {
                let expected = if lits.len() > 3 {
                    lits[1..].iter().rev()
                } else {
                    lits.iter().rev()
                };
                prop_assert!(alloc.lits(cref).iter().eq(expected));
            }
        }
    }
}
