//! The permuted ruleset: rules paired with their surviving permutation
//! sets, cross-eliminated against each other and split into independent
//! fronts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cell::CellId;
use crate::error::SolverError;
use crate::permutation::PermutationSet;
use crate::reduce::CellRulesMap;
use crate::rule::RuleRef;

pub struct PermutedRuleset<C: CellId> {
    cell_rules_map: CellRulesMap<C>,
    permu_map: HashMap<RuleRef<C>, PermutationSet<C>>,
}

impl<C: CellId> PermutedRuleset<C> {
    pub fn new(rules: impl IntoIterator<Item = RuleRef<C>>) -> Self {
        let mut cell_rules_map = CellRulesMap::new();
        let mut permu_map = HashMap::new();
        for rule in rules {
            cell_rules_map.add_rule(rule.clone());
            let permu_set = PermutationSet::from_rule(&rule);
            permu_map.insert(rule, permu_set);
        }
        PermutedRuleset {
            cell_rules_map,
            permu_map,
        }
    }

    fn filter(&self, rule_subset: impl IntoIterator<Item = RuleRef<C>>) -> PermutedRuleset<C> {
        let mut cell_rules_map = CellRulesMap::new();
        let mut permu_map = HashMap::new();
        for rule in rule_subset {
            cell_rules_map.add_rule(rule.clone());
            let permu_set = self.permu_map[&rule].clone();
            permu_map.insert(rule, permu_set);
        }
        PermutedRuleset {
            cell_rules_map,
            permu_map,
        }
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleRef<C>> {
        self.permu_map.keys()
    }

    pub fn permutations(&self) -> &HashMap<RuleRef<C>, PermutationSet<C>> {
        &self.permu_map
    }

    pub fn overlapping_rules(&self, rule: &RuleRef<C>) -> HashSet<RuleRef<C>> {
        self.cell_rules_map.overlapping_rules(rule)
    }

    /// Narrow each rule's permutation set down to only what's consistent
    /// with every overlapping rule, cascading until a fixpoint.
    pub fn cross_eliminate(&mut self) -> Result<(), SolverError> {
        let mut interferences = self.cell_rules_map.interference_edges();

        while let Some((r, r_ov)) = pop_any(&mut interferences) {
            let mut changed = false;
            let candidates: Vec<_> = self.permu_map[&r].iter().cloned().collect();
            for permu in candidates {
                let compatible = self.permu_map[&r_ov].compatible(&permu);
                if compatible.is_empty() {
                    self.permu_map.get_mut(&r).unwrap().remove(&permu);
                    changed = true;
                }
            }

            if self.permu_map[&r].is_empty() {
                return Err(SolverError::Inconsistent(
                    "rule is constrained such that it has no valid mine permutations".to_string(),
                ));
            } else if changed {
                for other in self.cell_rules_map.overlapping_rules(&r) {
                    interferences.insert((other, r.clone()));
                }
            }
        }
        Ok(())
    }

    /// Re-derive rules from any permutation set that turns out to be a
    /// Cartesian product of smaller sets, potentially splitting what was
    /// one front into several.
    pub fn rereduce(&mut self) {
        let mut superseded = Vec::new();
        let mut decompositions = HashMap::new();
        for (rule, permu_set) in &self.permu_map {
            let decomp = permu_set.clone().decompose();
            if decomp.len() > 1 {
                superseded.push(rule.clone());
                for dc in decomp {
                    decompositions.insert(dc.cells_.clone(), dc);
                }
            }
        }

        for rule in superseded {
            self.remove_rule(&rule);
        }
        for (_, permu_set) in decompositions {
            self.add_permu_set(permu_set);
        }
    }

    fn remove_rule(&mut self, rule: &RuleRef<C>) {
        self.cell_rules_map.remove_rule(rule);
        self.permu_map.remove(rule);
    }

    fn add_permu_set(&mut self, permu_set: crate::permutation::PermutationSet<C>) {
        let rule = Arc::new(permu_set.to_rule());
        self.cell_rules_map.add_rule(rule.clone());
        self.permu_map.insert(rule, permu_set);
    }

    pub fn split_fronts(self) -> Vec<PermutedRuleset<C>> {
        let partitions = self.cell_rules_map.partition();
        partitions
            .into_iter()
            .map(|subset| self.filter(subset))
            .collect()
    }

    pub fn is_trivial(&self) -> bool {
        self.permu_map.len() == 1
    }

    /// The singleton rule of a trivial (one-rule) ruleset. Note this rule is
    /// not necessarily cell-trivial itself -- an isolated multi-cell rule
    /// with no overlaps also forms a one-rule front.
    pub fn trivial_rule(&self) -> RuleRef<C> {
        self.permu_map.keys().next().expect("trivial ruleset is non-empty").clone()
    }
}

fn pop_any<T: Clone + Eq + std::hash::Hash>(set: &mut HashSet<T>) -> Option<T> {
    let item = set.iter().next().cloned()?;
    set.remove(&item);
    Some(item)
}

/// Cross-eliminate and re-reduce a condensed, already-logically-reduced
/// ruleset.
pub fn permute_and_interfere<C: CellId>(
    rules: impl IntoIterator<Item = RuleRef<C>>,
) -> Result<PermutedRuleset<C>, SolverError> {
    let mut ruleset = PermutedRuleset::new(rules);
    ruleset.cross_eliminate()?;
    ruleset.rereduce();
    Ok(ruleset)
}
