//! Boolean satisfiability solver.
use std::io;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use anyhow::Error;
use log::info;

use xorsat_dimacs::DimacsParser;
use xorsat_formula::{CnfFormula, ExtendFormula, Lit, Var, XorClause};

use crate::config::{ConfigError, SolverConfigUpdate};
use crate::context::{
    config_changed, ensure_var_count, AssignmentP, Context, SolverStateP, StatsP, VariablesP,
};
use crate::dump;
use crate::load::{load_clause, load_xor_clause};
use crate::prop::restart;
use crate::schedule::schedule_step;
use crate::state::{InterruptHandle, SatState};
use crate::stats::Stats;

/// Result of a search.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SolverResult {
    Sat,
    Unsat,
    /// A budget was exhausted or an interrupt was requested before the
    /// search settled the instance.
    Undetermined,
}

/// A boolean satisfiability solver with XOR reasoning.
#[derive(Default)]
pub struct Solver {
    ctx: Box<Context>,
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Change the solver configuration.
    pub fn config(&mut self, update: &SolverConfigUpdate) -> Result<(), ConfigError> {
        let mut config = self.ctx.solver_config.clone();
        config.merge(update);
        config.validate()?;
        self.ctx.solver_config = config;

        let mut ctx = self.ctx.into_partial_ref_mut();
        config_changed(ctx.borrow(), update);
        Ok(())
    }

    /// Add a formula to the solver.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }
        for xor in formula.xor_clauses() {
            load_xor_clause(ctx.borrow(), xor);
        }
    }

    /// Reads and adds a formula in DIMACS CNF format, including `x`-prefixed
    /// XOR clause lines.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`].
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let parser = DimacsParser::parse_incremental(input, |parser| {
            self.add_formula(&parser.take_formula());
            Ok(())
        })?;

        info!(
            "Parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Check the satisfiability of the current formula.
    pub fn solve(&mut self) -> SolverResult {
        {
            let mut ctx = self.ctx.into_partial_ref_mut();
            ctx.part_mut(SolverStateP).stop = None;
            while schedule_step(ctx.borrow()) {}
        }

        let mut ctx = self.ctx.into_partial_ref_mut();

        if ctx.part(SolverStateP).stop.is_some() {
            return SolverResult::Undetermined;
        }

        match ctx.part(SolverStateP).sat_state {
            SatState::Sat => {
                // Record the model before leaving the full assignment.
                let model: Vec<Lit> = {
                    let assignment = ctx.part(AssignmentP);
                    (0..ctx.part(VariablesP).count())
                        .map(|index| {
                            let var = Var::from_index(index);
                            let value = assignment
                                .var_value(var)
                                .unwrap_or_else(|| assignment.last_var_value(var));
                            var.lit(value)
                        })
                        .collect()
                };
                ctx.part_mut(SolverStateP).last_model = model;

                restart(ctx.borrow());

                ctx.part_mut(StatsP).models_found += 1;

                SolverResult::Sat
            }
            SatState::Unsat => {
                // A conflict rooted at level 0 can be detected while
                // decisions are still active; drain them so dumping sees a
                // coherent state.
                restart(ctx.borrow());
                SolverResult::Unsat
            }
            SatState::Unknown => SolverResult::Undetermined,
        }
    }

    /// Set of literals that satisfy the formula.
    ///
    /// Only valid directly after a [`solve`](Solver::solve) call that
    /// returned [`SolverResult::Sat`].
    pub fn model(&self) -> Option<Vec<Lit>> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(ctx.part(SolverStateP).last_model.clone())
        } else {
            None
        }
    }

    /// Exclude the most recent model from future searches.
    ///
    /// Adds a blocking clause negating the model over all branching-eligible
    /// variables, so a following [`solve`](Solver::solve) either finds a
    /// model differing in at least one of their values or reports
    /// unsatisfiability.
    pub fn block_model(&mut self) {
        let blocking: Vec<Lit> = {
            let ctx = self.ctx.into_partial_ref();
            let variables = ctx.part(VariablesP);
            ctx.part(SolverStateP)
                .last_model
                .iter()
                .filter(|lit| !variables.is_eliminated(lit.var()))
                .map(|&lit| !lit)
                .collect()
        };

        let mut ctx = self.ctx.into_partial_ref_mut();
        load_clause(ctx.borrow(), &blocking);
    }

    /// A cloneable handle that interrupts this solver's search.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.ctx.solver_state.interrupt.clone()
    }

    /// The accumulated search statistics.
    pub fn stats(&self) -> Stats {
        self.ctx.stats
    }

    /// Write the simplified irredundant formula as DIMACS.
    pub fn write_irredundant(&self, target: &mut impl io::Write) -> io::Result<()> {
        let mut ctx = self.ctx.into_partial_ref();
        dump::write_irredundant_clauses(ctx.borrow(), target)
    }

    /// Write the learnt clauses of at most `max_len` literals as DIMACS.
    pub fn write_learnts(&self, target: &mut impl io::Write, max_len: usize) -> io::Result<()> {
        let mut ctx = self.ctx.into_partial_ref();
        dump::write_redundant_clauses(ctx.borrow(), target, max_len)
    }
}

impl ExtendFormula for Solver {
    fn add_clause(&mut self, literals: &[Lit]) {
        let var_count = literals
            .iter()
            .map(|lit| lit.index() + 1)
            .max()
            .unwrap_or(0);

        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), var_count);
        load_clause(ctx.borrow(), literals);
    }

    fn add_xor_clause(&mut self, xor: XorClause) {
        let var_count = xor.vars().iter().map(|var| var.index() + 1).max().unwrap_or(0);

        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), var_count);
        load_xor_clause(ctx.borrow(), &xor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use xorsat_dimacs::write_dimacs;
    use xorsat_formula::{cnf_formula, test::*};

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), SolverResult::Unsat);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), SolverResult::Sat);

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs_cnf(&mut &dimacs[..]).unwrap();

            prop_assert_eq!(solver.solve(), SolverResult::Sat);

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_with_xors(formula in sat_xor_formula(4..15usize, 0..40usize, 1..10usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), SolverResult::Sat);

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }

            for xor in formula.xor_clauses() {
                let parity = xor
                    .vars()
                    .iter()
                    .fold(false, |acc, &var| acc ^ model.contains(&var.positive()));
                prop_assert_eq!(parity, xor.rhs());
            }
        }

        #[test]
        fn xor_cycles(
            sat_cycle in xor_cycle_formula(3..12usize, true),
            unsat_cycle in xor_cycle_formula(3..12usize, false),
        ) {
            let mut solver = Solver::new();
            solver.add_formula(&sat_cycle);
            prop_assert_eq!(solver.solve(), SolverResult::Sat);

            let mut solver = Solver::new();
            solver.add_formula(&unsat_cycle);
            prop_assert_eq!(solver.solve(), SolverResult::Unsat);
        }

        #[test]
        fn parity_chain_unsat(formula in unsat_parity_formula(4..40usize)) {
            let mut solver = Solver::new();
            solver.add_formula(&formula);
            prop_assert_eq!(solver.solve(), SolverResult::Unsat);

            // The answer must not depend on the matrix engine.
            let mut update = crate::config::SolverConfigUpdate::new();
            update.gauss_decision_until = Some(64);
            let mut solver = Solver::new();
            solver.config(&update).unwrap();
            solver.add_formula(&formula);
            prop_assert_eq!(solver.solve(), SolverResult::Unsat);
        }
    }

    #[test]
    fn incremental_clauses_flip_to_unsat() {
        let mut solver = Solver::new();

        let formula = cnf_formula![
            1, 2, 3;
            -1;
            1, -2;
            2, -3;
        ];

        let mut last_result = SolverResult::Sat;

        for clause in formula.iter() {
            solver.add_clause(clause);
            let result = solver.solve();
            if result != last_result {
                assert_eq!(result, SolverResult::Unsat);
                assert_eq!(last_result, SolverResult::Sat);
                last_result = result;
            }
        }

        assert_eq!(last_result, SolverResult::Unsat);
    }

    #[test]
    fn model_enumeration_exhausts_free_space() {
        let mut solver = Solver::new();
        let mut formula = CnfFormula::new();
        formula.set_var_count(2);
        solver.add_formula(&formula);

        let mut models = vec![];

        loop {
            match solver.solve() {
                SolverResult::Sat => {
                    let model = solver.model().unwrap();
                    assert!(!models.contains(&model));
                    models.push(model);
                    solver.block_model();
                }
                SolverResult::Unsat => break,
                SolverResult::Undetermined => panic!("unexpected undetermined result"),
            }
        }

        assert_eq!(models.len(), 4);
    }

    #[test]
    fn interrupting_returns_undetermined() {
        let mut solver = Solver::new();
        solver.add_formula(&cnf_formula![1, 2; -1, 2; 1, -2;]);

        solver.interrupt_handle().interrupt();
        assert_eq!(solver.solve(), SolverResult::Undetermined);

        solver.interrupt_handle().reset();
        assert_eq!(solver.solve(), SolverResult::Sat);
    }
}
