//! Formula generation strategies for tests.
use proptest::{collection, prelude::*, *};

use rand::distributions::Bernoulli;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cnf::{CnfFormula, ExtendFormula, XorClause};
use crate::lit::{Lit, Var};

/// Generate small hard unsat instances.
///
/// The sgen1 construction (http://www.cs.qub.ac.uk/~i.spence/sgen/) over
/// `4n + 1` variables: one shuffled partition into blocks of four bounds the
/// number of true literals, a second one bounds the number of false
/// literals, and the odd variable count makes both bounds unsatisfiable
/// together. Partitions are drawn randomly instead of sgen's fixed ones.
pub fn sgen_unsat_formula(
    blocks: impl Strategy<Value = usize>,
) -> impl Strategy<Value = CnfFormula> {
    blocks.prop_flat_map(|blocks| {
        collection::vec(bool::ANY, blocks * 4 + 1).prop_perturb(|polarity, mut rng| {
            let mut clauses: Vec<Vec<Lit>> = vec![];
            let mut lits = polarity
                .into_iter()
                .enumerate()
                .map(|(index, polarity)| Lit::from_index(index, polarity))
                .collect::<Vec<_>>();

            for &negate in [false, true].iter() {
                lits.shuffle(&mut rng);
                let round: Vec<Lit> = lits.iter().map(|&lit| lit ^ negate).collect();

                // Each block of four asserts that at most one of its
                // literals is false, as all triples within it.
                for block in round.chunks_exact(4) {
                    for a in 0..4 {
                        for b in 0..a {
                            for c in 0..b {
                                let mut clause = vec![block[a], block[b], block[c]];
                                clause.shuffle(&mut rng);
                                clauses.push(clause);
                            }
                        }
                    }
                }

                // The leftover literal forms triples with the first block.
                let &leftover = round.last().unwrap();
                for b in 0..4 {
                    for c in 0..b {
                        let mut clause = vec![leftover, round[b], round[c]];
                        clause.shuffle(&mut rng);
                        clauses.push(clause);
                    }
                }
            }

            clauses.shuffle(&mut rng);
            CnfFormula::from(clauses)
        })
    })
}

/// Generate an unsatisfiable mix of clauses and parity constraints.
///
/// A chain of two-variable XOR constraints over a random variable order
/// fixes every variable relative to a hidden flip pattern, leaving exactly
/// the pattern and its complement as solutions of the parity part. One
/// clause then demands the pattern and another its complement, so the
/// contradiction only surfaces after chaining parities together.
pub fn unsat_parity_formula(vars: impl Strategy<Value = usize>) -> impl Strategy<Value = CnfFormula> {
    vars.prop_flat_map(|vars| {
        let vars = vars.max(4);
        collection::vec(bool::ANY, vars).prop_perturb(move |flips, mut rng| {
            let mut formula = CnfFormula::new();
            formula.set_var_count(vars);

            let mut order: Vec<usize> = (0..vars).collect();
            order.shuffle(&mut rng);

            // x_i ⊕ x_j = f_i ⊕ f_j along the chain, so any model satisfies
            // x_k = c ⊕ f_k for a single free bit c.
            for link in order.windows(2) {
                formula.add_xor_clause(XorClause::new(
                    vec![Var::from_index(link[0]), Var::from_index(link[1])],
                    flips[link[0]] ^ flips[link[1]],
                ));
            }

            // One clause is satisfied only under c = 0, the other only under
            // c = 1.
            for &demand in [false, true].iter() {
                let mut picks: Vec<usize> = (0..vars).collect();
                picks.shuffle(&mut rng);
                let mut clause: Vec<Lit> = picks[..3]
                    .iter()
                    .map(|&index| Var::from_index(index).lit(flips[index] ^ demand))
                    .collect();
                clause.shuffle(&mut rng);
                formula.add_clause(&clause);
            }

            formula
        })
    })
}

/// Generate a sat instance.
///
/// This generates a random full assignment and then only generates clauses
/// compatible with that assignment.
pub fn sat_formula(
    vars: impl Strategy<Value = usize>,
    clause_count: impl Strategy<Value = usize>,
    density: impl Strategy<Value = f64>,
    polarity_dist: impl Strategy<Value = f64>,
) -> impl Strategy<Value = CnfFormula> {
    (vars, clause_count, density, polarity_dist).prop_flat_map(
        |(vars, clause_count, density, polarity_dist)| {
            let density = Bernoulli::new(density).unwrap();
            let polarity_dist = Bernoulli::new(polarity_dist).unwrap();

            collection::vec(bool::ANY, vars).prop_perturb(move |polarity, mut rng| {
                let mut clauses: Vec<Vec<Lit>> = vec![];
                let lits = polarity
                    .into_iter()
                    .enumerate()
                    .map(|(index, polarity)| Lit::from_index(index, polarity))
                    .collect::<Vec<_>>();

                for _ in 0..clause_count {
                    let &fixed_lit = lits.choose(&mut rng).unwrap();
                    let mut clause = vec![fixed_lit];
                    for &lit in lits.iter() {
                        if lit != fixed_lit && rng.sample(density) {
                            clause.push(lit ^ rng.sample(polarity_dist));
                        }
                    }
                    clause.shuffle(&mut rng);
                    clauses.push(clause);
                }

                clauses.shuffle(&mut rng);
                CnfFormula::from(clauses)
            })
        },
    )
}

/// Generate a satisfiable instance mixing clauses and XOR constraints.
///
/// Like [`sat_formula`] this draws a full assignment first and only emits
/// constraints that assignment satisfies, so the result is SAT by
/// construction.
pub fn sat_xor_formula(
    vars: impl Strategy<Value = usize>,
    clause_count: impl Strategy<Value = usize>,
    xor_count: impl Strategy<Value = usize>,
) -> impl Strategy<Value = CnfFormula> {
    (vars, clause_count, xor_count).prop_flat_map(|(vars, clause_count, xor_count)| {
        let vars = vars.max(3);
        collection::vec(bool::ANY, vars).prop_perturb(move |polarity, mut rng| {
            let lits = polarity
                .iter()
                .enumerate()
                .map(|(index, &polarity)| Lit::from_index(index, polarity))
                .collect::<Vec<_>>();

            let mut formula = CnfFormula::new();
            formula.set_var_count(vars);

            for _ in 0..clause_count {
                let len = rng.gen_range(1, 4.min(vars) + 1);
                let mut clause: Vec<Lit> = lits.choose_multiple(&mut rng, len).cloned().collect();
                // Flip all but one literal so the drawn assignment stays a model.
                for lit in clause[1..].iter_mut() {
                    if rng.gen() {
                        *lit = !*lit;
                    }
                }
                clause.shuffle(&mut rng);
                formula.add_clause(&clause);
            }

            for _ in 0..xor_count {
                let len = rng.gen_range(2, 5.min(vars) + 1);
                let xor_vars: Vec<Var> = (0..vars)
                    .map(Var::from_index)
                    .collect::<Vec<_>>()
                    .choose_multiple(&mut rng, len)
                    .cloned()
                    .collect();
                let rhs = xor_vars
                    .iter()
                    .fold(false, |acc, &var| acc ^ polarity[var.index()]);
                formula.add_xor_clause(XorClause::new(xor_vars, rhs));
            }

            formula
        })
    })
}

/// Generate an XOR cycle `v₁⊕v₂, v₂⊕v₃, …, vₖ⊕v₁`.
///
/// The cycle's left-hand sides sum to zero, so the instance is satisfiable
/// exactly when the chosen right-hand sides have even parity. Detecting the
/// odd case requires combining all rows, which exercises Gaussian reasoning.
pub fn xor_cycle_formula(
    len: impl Strategy<Value = usize>,
    satisfiable: bool,
) -> impl Strategy<Value = CnfFormula> {
    (len, collection::vec(bool::ANY, 64)).prop_map(move |(len, mut rhs_bits)| {
        let len = len.max(3).min(rhs_bits.len());
        let mut formula = CnfFormula::new();
        formula.set_var_count(len);

        let parity = rhs_bits[..len - 1].iter().fold(false, |acc, &b| acc ^ b);
        // Force the total parity: even for SAT, odd for UNSAT.
        rhs_bits[len - 1] = parity ^ !satisfiable;

        for i in 0..len {
            formula.add_xor_clause(XorClause::new(
                vec![Var::from_index(i), Var::from_index((i + 1) % len)],
                rhs_bits[i],
            ));
        }

        formula
    })
}
