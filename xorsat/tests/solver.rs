//! End to end solver scenarios.
use std::io::{Read, Seek, SeekFrom};

use xorsat::config::SolverConfigUpdate;
use xorsat::{CnfFormula, ExtendFormula, Lit, Solver, SolverResult, Var, XorClause};

fn solver_for_dimacs(input: &str) -> Solver {
    let mut solver = Solver::new();
    solver.add_dimacs_cnf(input.as_bytes()).unwrap();
    solver
}

fn gauss_config() -> SolverConfigUpdate {
    let mut update = SolverConfigUpdate::new();
    update.gauss_decision_until = Some(64);
    update
}

/// The standard encoding of placing `holes + 1` pigeons into `holes` holes.
fn pigeon_hole_formula(holes: usize) -> CnfFormula {
    let pigeons = holes + 1;
    let mut formula = CnfFormula::new();
    let var = |pigeon: usize, hole: usize| Var::from_index(pigeon * holes + hole);

    for pigeon in 0..pigeons {
        let clause: Vec<Lit> = (0..holes).map(|hole| var(pigeon, hole).positive()).collect();
        formula.add_clause(&clause);
    }

    for hole in 0..holes {
        for pigeon_a in 0..pigeons {
            for pigeon_b in 0..pigeon_a {
                formula.add_clause(&[
                    var(pigeon_a, hole).negative(),
                    var(pigeon_b, hole).negative(),
                ]);
            }
        }
    }

    formula
}

#[test]
fn single_unit_is_sat() {
    let mut solver = solver_for_dimacs("p cnf 1 1\n1 0\n");
    assert_eq!(solver.solve(), SolverResult::Sat);
    assert_eq!(solver.model().unwrap(), vec![Lit::from_dimacs(1)]);
}

#[test]
fn immediate_contradiction_is_unsat() {
    let mut solver = solver_for_dimacs("p cnf 1 2\n1 0\n-1 0\n");
    assert_eq!(solver.solve(), SolverResult::Unsat);
}

#[test]
fn pigeon_hole_3_into_2_is_unsat() {
    let mut solver = Solver::new();
    solver.add_formula(&pigeon_hole_formula(2));
    assert_eq!(solver.solve(), SolverResult::Unsat);
}

#[test]
fn odd_xor_cycle_is_unsat() {
    // The three rows sum to 0 = 1.
    for enable_gauss in &[false, true] {
        let mut solver = solver_for_dimacs("p cnf 3 3\nx 1 2 0\nx 2 3 0\nx 1 3 0\n");
        if *enable_gauss {
            solver.config(&gauss_config()).unwrap();
        }
        assert_eq!(solver.solve(), SolverResult::Unsat);
    }
}

#[test]
fn even_xor_cycle_is_sat() {
    // All right hand sides zero: any constant assignment works.
    for enable_gauss in &[false, true] {
        let mut solver = solver_for_dimacs("p cnf 3 3\nx -1 2 0\nx -2 3 0\nx -1 3 0\n");
        if *enable_gauss {
            solver.config(&gauss_config()).unwrap();
        }
        assert_eq!(solver.solve(), SolverResult::Sat);

        let model = solver.model().unwrap();
        let value = |number: isize| model.contains(&Lit::from_dimacs(number));
        assert_eq!(value(1) ^ value(2), false);
        assert_eq!(value(2) ^ value(3), false);
    }
}

#[test]
fn flipping_one_cycle_parity_is_unsat() {
    // Same cycle with the last right hand side flipped to 1.
    for enable_gauss in &[false, true] {
        let mut solver = solver_for_dimacs("p cnf 3 3\nx -1 2 0\nx -2 3 0\nx 1 3 0\n");
        if *enable_gauss {
            solver.config(&gauss_config()).unwrap();
        }
        assert_eq!(solver.solve(), SolverResult::Unsat);
    }
}

#[test]
fn gauss_handles_longer_chains() {
    // A chain of equalities forcing all variables equal plus a final
    // constraint that the ends differ; only row combinations expose the
    // contradiction before all variables are decided.
    let mut input = String::from("p cnf 8 8\n");
    for i in 1..8 {
        input.push_str(&format!("x -{} {} 0\n", i, i + 1));
    }
    input.push_str("x 1 8 0\n");

    for enable_gauss in &[false, true] {
        let mut solver = solver_for_dimacs(&input);
        if *enable_gauss {
            solver.config(&gauss_config()).unwrap();
        }
        assert_eq!(solver.solve(), SolverResult::Unsat);
    }
}

#[test]
fn mixed_cnf_and_xor() {
    let mut solver = solver_for_dimacs("p cnf 3 3\n1 2 0\nx 1 2 0\n-1 0\n");
    assert_eq!(solver.solve(), SolverResult::Sat);
    let model = solver.model().unwrap();
    assert!(model.contains(&Lit::from_dimacs(-1)));
    assert!(model.contains(&Lit::from_dimacs(2)));
}

#[test]
fn enumeration_finds_all_models() {
    let mut solver = Solver::new();
    let mut formula = CnfFormula::new();
    formula.set_var_count(2);
    solver.add_formula(&formula);

    let mut models = vec![];
    loop {
        match solver.solve() {
            SolverResult::Sat => {
                let model = solver.model().unwrap();
                // Every enumerated model differs from all previous ones.
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
fn blocked_model_is_never_repeated() {
    let mut solver = solver_for_dimacs("p cnf 3 1\n1 2 3 0\n");
    assert_eq!(solver.solve(), SolverResult::Sat);
    let first = solver.model().unwrap();
    solver.block_model();

    assert_eq!(solver.solve(), SolverResult::Sat);
    assert_ne!(solver.model().unwrap(), first);
}

#[test]
fn conflict_budget_returns_undetermined() {
    let mut solver = Solver::new();
    solver.add_formula(&pigeon_hole_formula(5));

    let mut update = SolverConfigUpdate::new();
    update.max_conflicts = Some(1);
    solver.config(&update).unwrap();

    assert_eq!(solver.solve(), SolverResult::Undetermined);

    // The solver drained to a coherent state; the learnt clauses can be
    // dumped and are not empty.
    let mut dump = tempfile::tempfile().unwrap();
    solver.write_learnts(&mut dump, usize::max_value()).unwrap();
    let mut contents = String::new();
    dump.seek(SeekFrom::Start(0)).unwrap();
    dump.read_to_string(&mut contents).unwrap();
    assert!(!contents.is_empty());
}

#[test]
fn restart_budget_returns_undetermined() {
    let mut solver = Solver::new();
    solver.add_formula(&pigeon_hole_formula(6));

    let mut update = SolverConfigUpdate::new();
    update.max_restarts = Some(1);
    update.restart_mode = Some(xorsat::config::RestartMode::Static);
    update.restart_scale = Some(1);
    solver.config(&update).unwrap();

    assert_eq!(solver.solve(), SolverResult::Undetermined);
}

#[test]
fn fixed_seed_runs_are_reproducible() {
    let run = || {
        let mut solver = Solver::new();
        let mut update = SolverConfigUpdate::new();
        update.seed = Some(12345);
        update.random_var_freq = Some(0.2);
        solver.config(&update).unwrap();
        solver.add_formula(&pigeon_hole_formula(4));
        let result = solver.solve();
        (result, solver.stats().conflicts, solver.stats().decisions)
    };

    assert_eq!(run(), run());
}

#[test]
fn dumped_formula_is_equisatisfiable() {
    let input = "p cnf 4 5\n1 2 3 4 0\n-1 -2 0\n-3 -4 0\nx 1 3 0\n-2 4 0\n";

    let mut solver = solver_for_dimacs(input);
    let original_result = solver.solve();

    let mut dump = tempfile::NamedTempFile::new().unwrap();
    solver.write_irredundant(dump.as_file_mut()).unwrap();
    dump.as_file_mut().seek(SeekFrom::Start(0)).unwrap();

    let mut contents = String::new();
    dump.as_file_mut().read_to_string(&mut contents).unwrap();

    let mut reread = Solver::new();
    reread.add_dimacs_cnf(contents.as_bytes()).unwrap();
    assert_eq!(reread.solve(), original_result);
}

#[test]
fn learnt_dump_rereads_without_changing_satisfiability() {
    let mut solver = Solver::new();
    solver.add_formula(&pigeon_hole_formula(4));

    let mut update = SolverConfigUpdate::new();
    update.max_conflicts = Some(20);
    solver.config(&update).unwrap();
    assert_eq!(solver.solve(), SolverResult::Undetermined);

    let mut buffer: Vec<u8> = vec![];
    solver.write_learnts(&mut buffer, usize::max_value()).unwrap();

    // Combining the original formula with its learnt clauses keeps it
    // unsatisfiable.
    let mut combined = Solver::new();
    combined.add_formula(&pigeon_hole_formula(4));
    combined.add_dimacs_cnf(&buffer[..]).unwrap();
    assert_eq!(combined.solve(), SolverResult::Unsat);
}

#[test]
fn restricted_branching_still_solves() {
    let mut solver = Solver::new();
    let mut update = SolverConfigUpdate::new();
    update.restrict_pick_branch = Some(3);
    solver.config(&update).unwrap();

    solver.add_formula(&pigeon_hole_formula(3));
    assert_eq!(solver.solve(), SolverResult::Unsat);

    let mut solver = Solver::new();
    solver.config(&update).unwrap();
    let mut formula = CnfFormula::new();
    formula.add_clause(&[Lit::from_dimacs(1), Lit::from_dimacs(2)]);
    formula.add_xor_clause(XorClause::new(
        vec![Var::from_dimacs(1), Var::from_dimacs(2)],
        true,
    ));
    solver.add_formula(&formula);
    assert_eq!(solver.solve(), SolverResult::Sat);
}

#[test]
fn polarity_modes_agree_on_satisfiability() {
    use xorsat::config::PolarityMode;

    for &mode in &[
        PolarityMode::True,
        PolarityMode::False,
        PolarityMode::Rnd,
        PolarityMode::Auto,
    ] {
        let mut solver = Solver::new();
        let mut update = SolverConfigUpdate::new();
        update.polarity_mode = Some(mode);
        solver.config(&update).unwrap();

        solver.add_dimacs_cnf("p cnf 3 3\n1 2 0\n-1 -2 0\nx 2 3 0\n".as_bytes()).unwrap();
        assert_eq!(solver.solve(), SolverResult::Sat);

        let model = solver.model().unwrap();
        let value = |number: isize| model.contains(&Lit::from_dimacs(number));
        assert!(value(1) ^ value(2));
        assert!(value(2) ^ value(3));
    }
}
