//! Supercell condensation: the first pipeline stage.
//!
//! Finds sets of cells that only ever appear together across the whole
//! ruleset and collapses each such set into a single supercell, so every
//! later stage works with far fewer, coarser units.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::cell::{CellId, SuperCell};
use crate::error::SolverError;
use crate::rule::{Rule, SuperRule};

/// Condense `rules` into their supercell form.
///
/// Returns the condensed rules plus the full set of supercells spanning the
/// input (including singleton supercells for cells that never shared a rule
/// with anything else) — the latter is needed later to size the "uncharted"
/// pseudo-cell.
pub fn condense_supercells<C: CellId>(
    rules: &[Rule<C>],
) -> Result<(Vec<SuperRule<C>>, BTreeSet<SuperCell<C>>), SolverError> {
    // cell -> set of indices of rules it appears in, used as that cell's
    // grouping signature.
    let mut cell_rule_indices: BTreeMap<C, BTreeSet<usize>> = BTreeMap::new();
    for (idx, rule) in rules.iter().enumerate() {
        for cell in &rule.cells {
            cell_rule_indices
                .entry(cell.clone())
                .or_default()
                .insert(idx);
        }
    }

    // group cells sharing an identical signature into one supercell.
    let mut signature_to_cells: HashMap<BTreeSet<usize>, BTreeSet<C>> = HashMap::new();
    for (cell, sig) in cell_rule_indices {
        signature_to_cells.entry(sig).or_default().insert(cell);
    }

    let mut rule_supercells: Vec<BTreeSet<SuperCell<C>>> = vec![BTreeSet::new(); rules.len()];
    let mut all_supercells: BTreeSet<SuperCell<C>> = BTreeSet::new();
    for (sig, cells) in signature_to_cells {
        let supercell: SuperCell<C> = Arc::new(cells);
        all_supercells.insert(supercell.clone());
        for idx in sig {
            rule_supercells[idx].insert(supercell.clone());
        }
    }

    let condensed = rules
        .iter()
        .zip(rule_supercells.into_iter())
        .map(|(rule, cells_)| SuperRule::new(rule.num_mines, cells_, rule.cells.len()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((condensed, all_supercells))
}
