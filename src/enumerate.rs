//! Exhaustive enumeration of every consistent mine configuration for a
//! single front.
//!
//! Implemented with an explicit work stack rather than the recursive
//! fixed/free-set generator this is modeled on, per the solver's preference
//! for stack-based traversal when recursion depth would otherwise track
//! input size directly.

use std::collections::{HashMap, HashSet};

use crate::cell::CellId;
use crate::permutation::Permutation;
use crate::rule::RuleRef;
use crate::ruleset::PermutedRuleset;

type CompatIndex<C> = HashMap<(Permutation<C>, RuleRef<C>), HashSet<Permutation<C>>>;

fn build_compat_index<C: CellId>(ruleset: &PermutedRuleset<C>) -> CompatIndex<C> {
    let mut index = HashMap::new();
    for (rule, permu_set) in ruleset.permutations() {
        for permu in permu_set.iter() {
            for rule_ov in ruleset.overlapping_rules(rule) {
                let compatible: HashSet<_> = ruleset.permutations()[&rule_ov]
                    .iter()
                    .filter(|p| p.compatible(permu))
                    .cloned()
                    .collect();
                index.insert((permu.clone(), rule_ov), compatible);
            }
        }
    }
    index
}

type FreeMap<C> = HashMap<RuleRef<C>, HashSet<Permutation<C>>>;

/// Fix `rule` to `permu`, cascading the narrowing to every rule it overlaps
/// (and transitively, any rule those in turn pin down). Returns the new
/// fixed/free state, or `None` if the cascade hits a contradiction.
fn propagate<C: CellId>(
    ruleset: &PermutedRuleset<C>,
    compat_index: &CompatIndex<C>,
    fixed: &[Permutation<C>],
    free: &FreeMap<C>,
    rule: RuleRef<C>,
    permu: Permutation<C>,
) -> Option<(Vec<Permutation<C>>, FreeMap<C>)> {
    let mut fixed = fixed.to_vec();
    let mut free = free.clone();

    let mut queue = vec![(rule, permu)];
    while let Some((rule, permu)) = queue.pop() {
        if !free.contains_key(&rule) {
            // already fixed via some other path in this cascade
            continue;
        }
        free.remove(&rule);
        fixed.push(permu.clone());

        for related in ruleset.overlapping_rules(&rule) {
            let Some(candidates) = free.get(&related) else {
                continue;
            };
            let compatible = &compat_index[&(permu.clone(), related.clone())];
            let narrowed: HashSet<_> = candidates.intersection(compatible).cloned().collect();

            if narrowed.is_empty() {
                return None;
            }
            if narrowed.len() == 1 {
                let only = narrowed.into_iter().next().unwrap();
                free.remove(&related);
                queue.push((related, only));
            } else {
                free.insert(related, narrowed);
            }
        }
    }

    Some((fixed, free))
}

/// Every mine configuration consistent with every rule in the front.
pub fn enumerate_front<C: CellId>(ruleset: &PermutedRuleset<C>) -> Vec<Permutation<C>> {
    let compat_index = build_compat_index(ruleset);

    let initial_free: FreeMap<C> = ruleset
        .permutations()
        .iter()
        .map(|(rule, permu_set)| (rule.clone(), permu_set.iter().cloned().collect()))
        .collect();

    let mut results = Vec::new();
    let mut stack = vec![(Vec::new(), initial_free)];

    while let Some((fixed, free)) = stack.pop() {
        if free.is_empty() {
            let config = fixed
                .into_iter()
                .reduce(|a, b| a.combine(&b))
                .expect("a front with no rules never reaches enumeration");
            results.push(config);
            continue;
        }

        let rule = free.keys().next().unwrap().clone();
        let candidates: Vec<_> = free[&rule].iter().cloned().collect();
        for permu in candidates {
            if let Some(state) = propagate(ruleset, &compat_index, &fixed, &free, rule.clone(), permu) {
                stack.push(state);
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::SuperRule;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn sc(cells: impl IntoIterator<Item = char>) -> crate::cell::SuperCell<char> {
        Arc::new(cells.into_iter().collect())
    }

    fn rule(num_mines: usize, cells: impl IntoIterator<Item = char>) -> RuleRef<char> {
        let cells_: BTreeSet<_> = cells.into_iter().map(|c| sc([c])).collect();
        let num_cells = cells_.len();
        Arc::new(SuperRule::new(num_mines, cells_, num_cells).unwrap())
    }

    #[test]
    fn two_cell_one_mine_front_has_two_configs() {
        let ruleset = PermutedRuleset::new(vec![rule(1, ['a', 'b'])]);
        let configs = enumerate_front(&ruleset);
        assert_eq!(configs.len(), 2);
        assert!(configs.iter().all(|c| c.k() == 1));
    }

    #[test]
    fn chained_rules_narrow_to_consistent_configs() {
        // a-b: 1 mine, b-c: 1 mine -- b is shared.
        let rules = vec![rule(1, ['a', 'b']), rule(1, ['b', 'c'])];
        let mut ruleset = PermutedRuleset::new(rules);
        ruleset.cross_eliminate().unwrap();
        ruleset.rereduce();
        let configs = enumerate_front(&ruleset);
        assert!(!configs.is_empty());
        for config in &configs {
            let total: usize = config.iter().map(|(_, &n)| n).sum();
            assert_eq!(total, config.k());
        }
    }
}
