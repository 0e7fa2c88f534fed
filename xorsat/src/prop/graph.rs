//! The implication graph.

use partial_ref::{partial, PartialRef};

use xorsat_formula::lit::LitIdx;
use xorsat_formula::{Lit, Var};

use crate::clause::ClauseRef;
use crate::context::{ClauseAllocP, Context, XorReasonsP};
use crate::xor::reasons::XorReasonRef;

/// Assignments that caused a propagation.
///
/// Binary and ternary reasons carry the falsified remainder of the clause
/// inline. XOR propagations, whether from the watch scheme or from a Gaussian
/// matrix row, reference a materialized clause in the XOR reason buffer.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reason {
    Unit,
    Binary([Lit; 1]),
    Ternary([Lit; 2]),
    Long(ClauseRef),
    Xor(XorReasonRef),
}

impl Reason {
    /// The literals that caused the propagation.
    pub fn lits<'out, 'a, 'b>(
        &'a self,
        ctx: &'b partial!('b Context, ClauseAllocP, XorReasonsP),
    ) -> &'out [Lit]
    where
        'a: 'out,
        'b: 'out,
    {
        match self {
            Reason::Unit => &[],
            Reason::Binary(lits) => lits,
            Reason::Ternary(lits) => lits,
            // The propagated literal is always kept at position 0
            Reason::Long(cref) => &ctx.part(ClauseAllocP).lits(*cref)[1..],
            Reason::Xor(rref) => ctx.part(XorReasonsP).lits(*rref),
        }
    }

    /// Whether the assignment was caused by a unit clause or decision.
    pub fn is_unit(&self) -> bool {
        matches!(self, Reason::Unit)
    }
}

/// Propagation that resulted in a conflict.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Conflict {
    Binary([Lit; 2]),
    Ternary([Lit; 3]),
    Long(ClauseRef),
    Xor(XorReasonRef),
}

impl Conflict {
    /// The literals that caused the conflict.
    pub fn lits<'out, 'a, 'b>(
        &'a self,
        ctx: &'b partial!('b Context, ClauseAllocP, XorReasonsP),
    ) -> &'out [Lit]
    where
        'a: 'out,
        'b: 'out,
    {
        match self {
            Conflict::Binary(lits) => lits,
            Conflict::Ternary(lits) => lits,
            Conflict::Long(cref) => ctx.part(ClauseAllocP).lits(*cref),
            Conflict::Xor(rref) => ctx.part(XorReasonsP).lits(*rref),
        }
    }
}

/// Node and incoming edges of the implication graph.
#[derive(Copy, Clone)]
pub struct ImplNode {
    pub reason: Reason,
    pub level: LitIdx,
}

/// The implication graph.
///
/// This is a DAG having all assigned variables as nodes. It has unit clauses
/// and decisions as sources. For each propagated assignment it has incoming
/// edges from the literals whose assignment caused the propagation to happen.
#[derive(Default)]
pub struct ImplGraph {
    /// Contains only valid data for indices of assigned variables.
    pub nodes: Vec<ImplNode>,
}

impl ImplGraph {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.nodes.resize(
            count,
            ImplNode {
                reason: Reason::Unit,
                level: 0,
            },
        );
    }

    /// Get the reason for an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn reason(&self, var: Var) -> &Reason {
        &self.nodes[var.index()].reason
    }

    /// Get the decision level of an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn level(&self, var: Var) -> usize {
        self.nodes[var.index()].level as usize
    }

    /// Updates the reason for an assigned variable.
    ///
    /// Make sure the reason vars are in front of the assigned variable in the
    /// trail.
    pub fn update_reason(&mut self, var: Var, reason: Reason) {
        self.nodes[var.index()].reason = reason
    }

    /// Turn the variable's assignment into a permanent unit.
    ///
    /// Used when level 0 assignments are removed from the trail.
    pub fn update_removed_unit(&mut self, var: Var) {
        let node = &mut self.nodes[var.index()];
        node.reason = Reason::Unit;
        node.level = 0;
    }
}
