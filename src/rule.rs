//! Rules: "N mines among this set of cells".
//!
//! `Rule<C>` is the raw caller-facing axiom. `SuperRule<C>` is the same
//! axiom re-expressed over supercells once [`crate::supercell::condense_supercells`]
//! has run, and is the form used by the rest of the pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cell::{CellId, SuperCell};
use crate::error::SolverError;
use crate::tally::FrontTally;

/// A reference-counted handle to a [`SuperRule`], since the same rule value
/// gets threaded through several owning collections (the active ruleset, the
/// cell/rule index, the permutation map) at once.
pub type RuleRef<C> = Arc<SuperRule<C>>;

/// `num_mines` mines are distributed among `cells`, no two cells the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<C: CellId> {
    pub num_mines: usize,
    pub cells: BTreeSet<C>,
}

impl<C: CellId> Rule<C> {
    pub fn new(num_mines: usize, cells: impl IntoIterator<Item = C>) -> Self {
        Rule {
            num_mines,
            cells: cells.into_iter().collect(),
        }
    }
}

/// The supercell-based form of a [`Rule`] used throughout the solver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuperRule<C: CellId> {
    pub num_mines: usize,
    pub num_cells: usize,
    pub cells_: BTreeSet<SuperCell<C>>,
}

impl<C: CellId> SuperRule<C> {
    /// Construct a rule, validating that the mine count is achievable.
    pub fn new(
        num_mines: usize,
        cells_: BTreeSet<SuperCell<C>>,
        num_cells: usize,
    ) -> Result<Self, SolverError> {
        if num_mines > num_cells {
            return Err(SolverError::Inconsistent(format!(
                "rule with {num_mines} mines over only {num_cells} cells"
            )));
        }
        Ok(SuperRule {
            num_mines,
            num_cells,
            cells_,
        })
    }

    /// Same as [`SuperRule::new`], but for call sites that have already
    /// derived the mine count from an already-valid rule and cannot fail
    /// this check short of a solver bug.
    pub(crate) fn new_unchecked(
        num_mines: usize,
        cells_: BTreeSet<SuperCell<C>>,
        num_cells: usize,
    ) -> Self {
        debug_assert!(num_mines <= num_cells);
        SuperRule {
            num_mines,
            num_cells,
            cells_,
        }
    }

    fn num_cells_of(cells_: &BTreeSet<SuperCell<C>>) -> usize {
        cells_.iter().map(|c| c.len()).sum()
    }

    /// If this rule is completely full or completely empty of mines, split
    /// it into one trivial sub-rule per supercell. A degenerate (cell-less)
    /// rule decomposes into nothing.
    pub fn decompose(self) -> Vec<SuperRule<C>> {
        if self.num_mines == 0 || self.num_mines == self.num_cells {
            let full = self.num_mines > 0;
            self.cells_
                .into_iter()
                .map(|cell_| {
                    let size = cell_.len();
                    SuperRule::new_unchecked(
                        if full { size } else { 0 },
                        BTreeSet::from([cell_]),
                        size,
                    )
                })
                .collect()
        } else {
            vec![self]
        }
    }

    /// If `subrule` is a sub-rule of this one, the rule covering the
    /// remaining cells and mines.
    pub fn subtract(&self, subrule: &SuperRule<C>) -> Result<SuperRule<C>, SolverError> {
        let cells_: BTreeSet<_> = self.cells_.difference(&subrule.cells_).cloned().collect();
        let num_mines = self.num_mines.checked_sub(subrule.num_mines).ok_or_else(|| {
            SolverError::Inconsistent("subtraction yields a negative mine count".to_string())
        })?;
        let num_cells = Self::num_cells_of(&cells_);
        SuperRule::new(num_mines, cells_, num_cells)
    }

    /// Whether this rule's cells are a subset of `parent`'s. Equivalent
    /// rules are sub-rules of each other.
    pub fn is_subrule_of(&self, parent: &SuperRule<C>) -> bool {
        self.cells_.is_subset(&parent.cells_)
    }

    /// A rule is trivial once it pins down a single supercell exactly.
    pub fn is_trivial(&self) -> bool {
        self.cells_.len() == 1
    }

    /// Build a [`FrontTally`] directly from this trivial rule.
    pub fn tally(&self) -> Result<FrontTally<C>, SolverError> {
        FrontTally::from_rule(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sc<C: CellId>(cells: impl IntoIterator<Item = C>) -> SuperCell<C> {
        Arc::new(cells.into_iter().collect())
    }

    #[test]
    fn decompose_noop_on_partial_rule() {
        let rule = SuperRule::new(1, BTreeSet::from([sc(['a']), sc(['b'])]), 2).unwrap();
        let out = rule.clone().decompose();
        assert_eq!(out, vec![rule]);
    }

    #[test]
    fn decompose_splits_full_rule() {
        let rule = SuperRule::new(3, BTreeSet::from([sc(['a', 'b']), sc(['c'])]), 3).unwrap();
        let mut out = rule.decompose();
        out.sort_by_key(|r| r.num_cells);
        assert_eq!(out[0].num_mines, 1);
        assert_eq!(out[0].num_cells, 1);
        assert_eq!(out[1].num_mines, 2);
        assert_eq!(out[1].num_cells, 2);
    }

    #[test]
    fn decompose_splits_empty_rule() {
        let rule = SuperRule::new(0, BTreeSet::from([sc(['a', 'b']), sc(['c'])]), 3).unwrap();
        let out = rule.decompose();
        assert!(out.iter().all(|r| r.num_mines == 0));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn subtract_removes_common_cells() {
        let a_b = sc(['a', 'b']);
        let c = sc(['c']);
        let whole = SuperRule::new(2, BTreeSet::from([a_b.clone(), c.clone()]), 3).unwrap();
        let part = SuperRule::new(1, BTreeSet::from([c]), 1).unwrap();
        let diff = whole.subtract(&part).unwrap();
        assert_eq!(diff.num_mines, 1);
        assert_eq!(diff.num_cells, 2);
        assert_eq!(diff.cells_, BTreeSet::from([a_b]));
    }

    #[test]
    fn subtract_negative_mines_is_inconsistent() {
        let a = sc(['a']);
        let whole = SuperRule::new(0, BTreeSet::from([a.clone()]), 1).unwrap();
        let part = SuperRule::new(1, BTreeSet::from([a]), 1).unwrap();
        assert!(whole.subtract(&part).is_err());
    }

    #[test]
    fn is_trivial_checks_single_supercell() {
        let rule = SuperRule::new(1, BTreeSet::from([sc(['a'])]), 1).unwrap();
        assert!(rule.is_trivial());
        let rule = SuperRule::new(1, BTreeSet::from([sc(['a']), sc(['b'])]), 2).unwrap();
        assert!(!rule.is_trivial());
    }

    #[test]
    fn new_rejects_too_many_mines() {
        assert!(SuperRule::new(2, BTreeSet::from([sc(['a'])]), 1).is_err());
    }
}
