//! Top-level entry point: wires the whole pipeline together.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::cell::CellId;
use crate::error::SolverError;
use crate::reduce::reduce_rules;
use crate::rule::Rule;
use crate::ruleset::permute_and_interfere;
use crate::supercell::condense_supercells;
use crate::tally::{cell_probabilities, enumerate_front_tally, MinePrevalence};

pub use crate::tally::TallyCell;

/// Solve a minesweeper board: given the constraint rules and a model of how
/// prevalent mines are, return each cell's exact mine probability.
///
/// `other_tag` is used as the output key representing every cell not
/// mentioned in any rule, if any such cells exist.
pub fn solve<C: CellId>(
    rules: &[Rule<C>],
    prevalence: &MinePrevalence,
    other_tag: C,
) -> Result<HashMap<C, f64>, SolverError> {
    let (condensed, all_cells) = condense_supercells(rules)?;
    let reduced = reduce_rules(condensed.into_iter().map(std::sync::Arc::new))?;

    let mut determined = Vec::new();
    let mut nontrivial = Vec::new();
    for rule in reduced {
        if rule.is_trivial() {
            determined.push(rule);
        } else {
            nontrivial.push(rule);
        }
    }

    let ruleset = permute_and_interfere(nontrivial)?;
    let fronts = ruleset.split_fronts();

    // A front can end up with exactly one rule without that rule being
    // cell-trivial (e.g. an isolated two-cell rule with no overlaps) --
    // only treat it as already-determined if it genuinely pins down a
    // single supercell.
    let (trivial_fronts, enumerable_fronts): (Vec<_>, Vec<_>) = fronts
        .into_iter()
        .partition(|front| front.is_trivial() && front.trivial_rule().is_trivial());
    for front in trivial_fronts {
        determined.push(front.trivial_rule());
    }

    // Fronts are independent sub-problems once partitioned, so their
    // (potentially expensive) enumeration and tallying can run in parallel;
    // the combination step afterwards doesn't care what order they arrive in.
    let mut stats = enumerable_fronts
        .par_iter()
        .map(enumerate_front_tally)
        .collect::<Result<Vec<_>, _>>()?;
    for rule in &determined {
        stats.push(rule.tally()?);
    }

    let cell_probs = cell_probabilities(stats, prevalence, &all_cells)?;
    Ok(expand_cells(cell_probs, other_tag))
}

/// Spread each supercell's expected mine count evenly across its member
/// cells, and fold the uncharted pseudo-cell's expectation onto `other_tag`.
fn expand_cells<C: CellId>(cell_probs: HashMap<TallyCell<C>, f64>, other_tag: C) -> HashMap<C, f64> {
    let mut out = HashMap::new();
    for (cell_, p) in cell_probs {
        let size = cell_.len();
        if size == 0 {
            continue;
        }
        let per_cell = p / size as f64;
        match cell_ {
            TallyCell::Super(supercell) => {
                for cell in supercell.iter() {
                    out.insert(cell.clone(), per_cell);
                }
            }
            TallyCell::Uncharted(_) => {
                out.insert(other_tag.clone(), per_cell);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ruleset_has_no_determined_cells() {
        let rules: Vec<Rule<String>> = vec![];
        let result = solve(&rules, &MinePrevalence::probability(0.1).unwrap(), "other".to_string()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn single_rule_determines_probability_for_shared_count() {
        // 1 mine among 2 cells, equal probability by symmetry.
        let rules = vec![Rule::new(1, ["a".to_string(), "b".to_string()])];
        let result = solve(&rules, &MinePrevalence::probability(0.2).unwrap(), "other".to_string()).unwrap();
        assert!((result["a"] - 0.5).abs() < 1e-9);
        assert!((result["b"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn trivially_determined_cell_is_certain() {
        let rules = vec![Rule::new(1, ["a".to_string()])];
        let result = solve(&rules, &MinePrevalence::probability(0.2).unwrap(), "other".to_string()).unwrap();
        assert!((result["a"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn inconsistent_ruleset_is_rejected() {
        let rules = vec![
            Rule::new(1, ["a".to_string()]),
            Rule::new(0, ["a".to_string()]),
        ];
        let result = solve(&rules, &MinePrevalence::probability(0.2).unwrap(), "other".to_string());
        assert!(matches!(result, Err(SolverError::Inconsistent(_))));
    }

    #[test]
    fn discrete_prevalence_accounts_for_uncharted_cells() {
        let rules = vec![Rule::new(1, ["a".to_string(), "b".to_string()])];
        let prevalence = MinePrevalence::discrete(10, 1);
        let result = solve(&rules, &prevalence, "other".to_string()).unwrap();
        assert!((result["a"] - 0.5).abs() < 1e-9);
        assert!((result["b"] - 0.5).abs() < 1e-9);
        assert!(result["other"].abs() < 1e-9);
    }

    #[test]
    fn classic_one_two_one_chain_is_fully_determined() {
        // {1,{a,b}}, {2,{a,b,c}}, {1,{b,c}} over exactly 3 cells and 2 mines.
        let rules = vec![
            Rule::new(1, ["a".to_string(), "b".to_string()]),
            Rule::new(2, ["a".to_string(), "b".to_string(), "c".to_string()]),
            Rule::new(1, ["b".to_string(), "c".to_string()]),
        ];
        let prevalence = MinePrevalence::discrete(3, 2);
        let result = solve(&rules, &prevalence, "other".to_string()).unwrap();
        assert!((result["a"] - 1.0).abs() < 1e-9);
        assert!((result["b"] - 0.0).abs() < 1e-9);
        assert!((result["c"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn chain_of_rules_propagates_determinism() {
        // a-b: 1 mine, b alone determined to have a mine -> a must be clear.
        let rules = vec![
            Rule::new(1, ["a".to_string(), "b".to_string()]),
            Rule::new(1, ["b".to_string()]),
        ];
        let result = solve(&rules, &MinePrevalence::probability(0.3).unwrap(), "other".to_string()).unwrap();
        assert!((result["a"] - 0.0).abs() < 1e-9);
        assert!((result["b"] - 1.0).abs() < 1e-9);
    }
}
