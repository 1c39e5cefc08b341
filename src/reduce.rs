//! Logical reduction: subtract sub-rules from super-rules until no further
//! reduction applies, and partition a ruleset into independent fronts.

use std::collections::{HashMap, HashSet};

use crate::cell::{CellId, SuperCell};
use crate::error::SolverError;
use crate::rule::RuleRef;

/// Maps cells to the rules that mention them, and keeps the flat list of
/// active rules alongside it.
pub struct CellRulesMap<C: CellId> {
    pub rules: HashSet<RuleRef<C>>,
    by_cell: HashMap<SuperCell<C>, HashSet<RuleRef<C>>>,
}

impl<C: CellId> CellRulesMap<C> {
    pub fn new() -> Self {
        CellRulesMap {
            rules: HashSet::new(),
            by_cell: HashMap::new(),
        }
    }

    /// Index a rule. Returns `false` if this exact rule (by value) was
    /// already present, meaning the caller doesn't need to do further work
    /// for it — this is how duplicate rules get silently collapsed.
    pub fn add_rule(&mut self, rule: RuleRef<C>) -> bool {
        if !self.rules.insert(rule.clone()) {
            return false;
        }
        for cell_ in &rule.cells_ {
            self.by_cell
                .entry(cell_.clone())
                .or_default()
                .insert(rule.clone());
        }
        true
    }

    pub fn remove_rule(&mut self, rule: &RuleRef<C>) {
        self.rules.remove(rule);
        for cell_ in &rule.cells_ {
            if let Some(set) = self.by_cell.get_mut(cell_) {
                set.remove(rule);
            }
        }
    }

    /// Rules (other than `rule` itself) sharing at least one cell with it.
    pub fn overlapping_rules(&self, rule: &RuleRef<C>) -> HashSet<RuleRef<C>> {
        let mut out = HashSet::new();
        for cell_ in &rule.cells_ {
            if let Some(set) = self.by_cell.get(cell_) {
                out.extend(set.iter().cloned());
            }
        }
        out.remove(rule);
        out
    }

    /// Every overlapping rule pair, each direction listed separately.
    pub fn interference_edges(&self) -> HashSet<(RuleRef<C>, RuleRef<C>)> {
        let mut out = HashSet::new();
        for rule in &self.rules {
            for other in self.overlapping_rules(rule) {
                out.insert((rule.clone(), other));
            }
        }
        out
    }

    /// Split the ruleset into disjoint groups of mutually-reachable
    /// (through some chain of cell overlaps) rules.
    pub fn partition(&self) -> Vec<HashSet<RuleRef<C>>> {
        let related: HashMap<RuleRef<C>, HashSet<RuleRef<C>>> = self
            .rules
            .iter()
            .map(|rule| (rule.clone(), self.overlapping_rules(rule)))
            .collect();

        let mut remaining: HashSet<RuleRef<C>> = related.keys().cloned().collect();
        let mut partitions = Vec::new();
        while let Some(start) = remaining.iter().next().cloned() {
            let mut group = HashSet::new();
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if !group.insert(node.clone()) {
                    continue;
                }
                if let Some(neighbors) = related.get(&node) {
                    for neighbor in neighbors {
                        if !group.contains(neighbor) {
                            stack.push(neighbor.clone());
                        }
                    }
                }
            }
            for rule in &group {
                remaining.remove(rule);
            }
            partitions.push(group);
        }
        partitions
    }
}

impl<C: CellId> Default for CellRulesMap<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A candidate "subtract `subrule` from `superrule`" reduction.
#[derive(Clone)]
pub struct Reduceable<C: CellId> {
    pub superrule: RuleRef<C>,
    pub subrule: RuleRef<C>,
}

impl<C: CellId> PartialEq for Reduceable<C> {
    fn eq(&self, other: &Self) -> bool {
        self.superrule == other.superrule && self.subrule == other.subrule
    }
}
impl<C: CellId> Eq for Reduceable<C> {}
impl<C: CellId> std::hash::Hash for Reduceable<C> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.superrule.hash(state);
        self.subrule.hash(state);
    }
}

impl<C: CellId> Reduceable<C> {
    /// Favor reductions on bigger rules, and among same-sized rules, ones
    /// whose resulting mine count sits toward the extremes (fewer
    /// permutations to enumerate later).
    fn metric(&self) -> (usize, usize, f64) {
        let num_reduced_cells = self.superrule.num_cells - self.subrule.num_cells;
        let num_reduced_mines = self.superrule.num_mines as f64 - self.subrule.num_mines as f64;
        (
            self.superrule.num_cells,
            self.subrule.num_cells,
            (num_reduced_mines - 0.5 * num_reduced_cells as f64).abs(),
        )
    }

    pub fn reduce(&self) -> Result<crate::rule::SuperRule<C>, SolverError> {
        self.superrule.subtract(&self.subrule)
    }

    pub fn contains(&self, rule: &RuleRef<C>) -> bool {
        &self.superrule == rule || &self.subrule == rule
    }
}

fn metric_cmp<C: CellId>(a: &Reduceable<C>, b: &Reduceable<C>) -> std::cmp::Ordering {
    let (a0, a1, a2) = a.metric();
    let (b0, b1, b2) = b.metric();
    a0.cmp(&b0)
        .then(a1.cmp(&b1))
        .then(a2.partial_cmp(&b2).unwrap_or(std::cmp::Ordering::Equal))
}

/// Drives the logical-deduction phase: keeps an active ruleset, an index of
/// which rule overlaps which, and a pool of candidate reductions, applying
/// the best-scoring one repeatedly until none remain.
pub struct RuleReducer<C: CellId> {
    cell_rules_map: CellRulesMap<C>,
    candidate_reductions: HashSet<Reduceable<C>>,
}

impl<C: CellId> RuleReducer<C> {
    pub fn new() -> Self {
        RuleReducer {
            cell_rules_map: CellRulesMap::new(),
            candidate_reductions: HashSet::new(),
        }
    }

    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = RuleRef<C>>) {
        for rule in rules {
            self.add_rule(rule);
        }
    }

    /// Add a rule, first splitting it into trivial sub-rules if it's
    /// completely full or empty.
    pub fn add_rule(&mut self, rule: RuleRef<C>) {
        let rule = match std::sync::Arc::try_unwrap(rule) {
            Ok(r) => r,
            Err(arc) => (*arc).clone(),
        };
        for base_rule in rule.decompose() {
            self.add_base_rule(std::sync::Arc::new(base_rule));
        }
    }

    fn add_base_rule(&mut self, rule: RuleRef<C>) {
        if !self.cell_rules_map.add_rule(rule.clone()) {
            return;
        }
        self.update_reduceables(&rule);
    }

    fn update_reduceables(&mut self, rule: &RuleRef<C>) {
        for overlapping in self.cell_rules_map.overlapping_rules(rule) {
            if overlapping.is_subrule_of(rule) {
                self.candidate_reductions.insert(Reduceable {
                    superrule: rule.clone(),
                    subrule: overlapping,
                });
            } else if rule.is_subrule_of(&overlapping) {
                self.candidate_reductions.insert(Reduceable {
                    superrule: overlapping,
                    subrule: rule.clone(),
                });
            }
        }
    }

    fn remove_rule(&mut self, rule: &RuleRef<C>) {
        self.cell_rules_map.remove_rule(rule);
        self.candidate_reductions
            .retain(|reduc| !reduc.contains(rule));
    }

    fn pop_best_reduction(&mut self) -> Option<Reduceable<C>> {
        let best = self
            .candidate_reductions
            .iter()
            .max_by(|a, b| metric_cmp(a, b))
            .cloned()?;
        self.candidate_reductions.remove(&best);
        Some(best)
    }

    /// Reduce until fixpoint, consuming the reducer.
    pub fn reduce_all(mut self) -> Result<HashSet<RuleRef<C>>, SolverError> {
        while let Some(reduction) = self.pop_best_reduction() {
            let reduced = reduction.reduce()?;
            self.remove_rule(&reduction.superrule);
            self.add_rule(std::sync::Arc::new(reduced));
        }
        Ok(self.cell_rules_map.rules)
    }
}

impl<C: CellId> Default for RuleReducer<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the logical-deduction phase over a set of (already-condensed) rules.
pub fn reduce_rules<C: CellId>(
    rules: impl IntoIterator<Item = RuleRef<C>>,
) -> Result<HashSet<RuleRef<C>>, SolverError> {
    let mut reducer = RuleReducer::new();
    reducer.add_rules(rules);
    reducer.reduce_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::SuperRule;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn sc(cells: impl IntoIterator<Item = char>) -> SuperCell<char> {
        Arc::new(cells.into_iter().collect())
    }

    fn rule(num_mines: usize, cells: impl IntoIterator<Item = char>) -> RuleRef<char> {
        let cells_: BTreeSet<_> = cells.into_iter().map(|c| sc([c])).collect();
        let num_cells = cells_.len();
        Arc::new(SuperRule::new(num_mines, cells_, num_cells).unwrap())
    }

    #[test]
    fn duplicate_rules_collapse() {
        let rules = vec![rule(1, ['a']), rule(1, ['a'])];
        let reduced = reduce_rules(rules).unwrap();
        assert_eq!(reduced.len(), 1);
    }

    #[test]
    fn subrule_reduces_superrule() {
        // 1 mine in {a,b}, 1 mine in {a} => 0 mines in {b}
        let rules = vec![rule(1, ['a', 'b']), rule(1, ['a'])];
        let reduced = reduce_rules(rules).unwrap();
        let b_rule = reduced
            .iter()
            .find(|r| r.cells_ == BTreeSet::from([sc(['b'])]))
            .unwrap();
        assert_eq!(b_rule.num_mines, 0);
    }

    #[test]
    fn partition_splits_disjoint_groups() {
        let mut map = CellRulesMap::new();
        map.add_rule(rule(1, ['a', 'b']));
        map.add_rule(rule(1, ['c', 'd']));
        let parts = map.partition();
        assert_eq!(parts.len(), 2);
    }
}
