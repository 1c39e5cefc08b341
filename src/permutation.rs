//! Permutations of mines among a fixed set of (super)cells, and sets
//! thereof.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use itertools::Itertools;

use crate::cell::{CellId, SuperCell};
use crate::combinatorics::choose;
use crate::rule::SuperRule;

/// One assignment of mine counts to a fixed set of supercells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permutation<C: CellId> {
    mapping: BTreeMap<SuperCell<C>, usize>,
}

impl<C: CellId> Permutation<C> {
    pub fn new(mapping: BTreeMap<SuperCell<C>, usize>) -> Self {
        Permutation { mapping }
    }

    /// Total number of mines across this permutation.
    pub fn k(&self) -> usize {
        self.mapping.values().sum()
    }

    pub fn cells(&self) -> BTreeSet<SuperCell<C>> {
        self.mapping.keys().cloned().collect()
    }

    /// The sub-permutation restricted to `subcells`. Every cell in
    /// `subcells` must be a key of this permutation.
    pub fn subset(&self, subcells: &BTreeSet<SuperCell<C>>) -> Permutation<C> {
        let mapping = subcells
            .iter()
            .map(|c| (c.clone(), self.mapping[c]))
            .collect();
        Permutation { mapping }
    }

    /// Whether this permutation agrees with `other` on every cell they
    /// share.
    pub fn compatible(&self, other: &Permutation<C>) -> bool {
        let overlap: BTreeSet<_> = self.cells().intersection(&other.cells()).cloned().collect();
        self.subset(&overlap) == other.subset(&overlap)
    }

    /// Merge two (assumed compatible) permutations over disjoint-or-agreeing
    /// cell sets into one spanning both.
    pub fn combine(&self, other: &Permutation<C>) -> Permutation<C> {
        let mut mapping = self.mapping.clone();
        mapping.extend(other.mapping.iter().map(|(c, n)| (c.clone(), *n)));
        Permutation { mapping }
    }

    /// The number of base-cell configurations this permutation represents
    /// once every supercell is broken back into its individual cells.
    pub fn multiplicity(&self) -> f64 {
        self.mapping
            .iter()
            .map(|(cell_, &k)| choose(cell_.len(), k))
            .product()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SuperCell<C>, &usize)> {
        self.mapping.iter()
    }
}

/// Canonical ordering over permutations, used to compare two *sets* of
/// permutations for content-equality without requiring `Permutation` itself
/// to implement `Ord`.
fn permu_cmp<C: CellId>(a: &Permutation<C>, b: &Permutation<C>) -> std::cmp::Ordering {
    let av: Vec<_> = a.iter().map(|(c, &n)| (c.clone(), n)).collect();
    let bv: Vec<_> = b.iter().map(|(c, &n)| (c.clone(), n)).collect();
    av.cmp(&bv)
}

/// Generate every way to place `count` mines among `cells`, ported from the
/// recursive generator this solver's mine-prevalence weighting was derived
/// from: picks a multiplicity for the first cell (descending, so dense
/// solutions surface before sparse ones) and recurses on the rest.
pub fn permute<C: CellId>(count: usize, cells: &[SuperCell<C>]) -> Vec<Permutation<C>> {
    permute_rec(count, cells, BTreeMap::new())
}

fn permute_rec<C: CellId>(
    count: usize,
    cells: &[SuperCell<C>],
    partial: BTreeMap<SuperCell<C>, usize>,
) -> Vec<Permutation<C>> {
    if count == 0 {
        let mut mapping = partial;
        for cell in cells {
            mapping.insert(cell.clone(), 0);
        }
        return vec![Permutation::new(mapping)];
    }

    let remaining_size: usize = cells.iter().map(|c| c.len()).sum();
    if remaining_size == count {
        let mut mapping = partial;
        for cell in cells {
            mapping.insert(cell.clone(), cell.len());
        }
        return vec![Permutation::new(mapping)];
    }
    if remaining_size < count {
        return vec![];
    }

    let (first, rest) = cells.split_first().expect("remaining_size >= count > 0 implies cells is non-empty");
    let mut out = Vec::new();
    let max_here = count.min(first.len());
    for multiplicity in (0..=max_here).rev() {
        let mut partial_here = partial.clone();
        partial_here.insert(first.clone(), multiplicity);
        out.extend(permute_rec(count - multiplicity, rest, partial_here));
    }
    out
}

/// A set of permutations sharing the same cell set and mine count. May be
/// every possible permutation of that rule, or a subset narrowed by outside
/// constraints.
#[derive(Debug, Clone)]
pub struct PermutationSet<C: CellId> {
    pub cells_: BTreeSet<SuperCell<C>>,
    pub k: usize,
    permus: HashSet<Permutation<C>>,
    /// `true` once permutations have been removed due to an outside
    /// conflict; accurate only for sets that started as the full set.
    pub constrained: bool,
}

impl<C: CellId> PermutationSet<C> {
    pub fn from_rule(rule: &SuperRule<C>) -> Self {
        let cells: Vec<_> = rule.cells_.iter().cloned().collect();
        let permus = permute(rule.num_mines, &cells).into_iter().collect();
        PermutationSet {
            cells_: rule.cells_.clone(),
            k: rule.num_mines,
            permus,
            constrained: false,
        }
    }

    fn new(cells_: BTreeSet<SuperCell<C>>, k: usize, permus: HashSet<Permutation<C>>) -> Self {
        PermutationSet {
            cells_,
            k,
            permus,
            constrained: false,
        }
    }

    /// Reconstruct a rule from this set's cell set and mine count. Note the
    /// round trip `to_rule().from_rule()` does not recover a constrained
    /// set, since it cannot account for permutations removed due to
    /// conflicts.
    pub fn to_rule(&self) -> SuperRule<C> {
        let num_cells = self.cells_.iter().map(|c| c.len()).sum();
        SuperRule::new_unchecked(self.k, self.cells_.clone(), num_cells)
    }

    pub fn remove(&mut self, permu: &Permutation<C>) {
        self.permus.remove(permu);
        self.constrained = true;
    }

    pub fn is_empty(&self) -> bool {
        self.permus.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permutation<C>> {
        self.permus.iter()
    }

    pub fn len(&self) -> usize {
        self.permus.len()
    }

    /// The permutations in this set compatible with `permu`.
    pub fn compatible(&self, permu: &Permutation<C>) -> PermutationSet<C> {
        let permus = self
            .permus
            .iter()
            .filter(|p| p.compatible(permu))
            .cloned()
            .collect();
        PermutationSet::new(self.cells_.clone(), self.k, permus)
    }

    /// Project every permutation down to `cell_subset`. Errors if the
    /// result doesn't share a single mine count (i.e. this isn't actually a
    /// valid cell subset to project onto).
    fn subset(&self, cell_subset: &BTreeSet<SuperCell<C>>) -> Result<PermutationSet<C>, ()> {
        let projected: HashSet<Permutation<C>> =
            self.permus.iter().map(|p| p.subset(cell_subset)).collect();
        let ks: HashSet<usize> = projected.iter().map(|p| p.k()).collect();
        if ks.len() > 1 {
            return Err(());
        }
        let k = *ks.iter().next().ok_or(())?;
        Ok(PermutationSet::new(cell_subset.clone(), k, projected))
    }

    /// Split into the permutation set projected onto `cell_subset`, and the
    /// set over the remaining cells — but only if `cell_subset` is a valid
    /// Cartesian divisor of this set (every sub-permutation pairs with the
    /// exact same remainder set).
    fn split(
        &self,
        cell_subset: &BTreeSet<SuperCell<C>>,
    ) -> Result<(PermutationSet<C>, PermutationSet<C>), ()> {
        let cell_remainder: BTreeSet<_> =
            self.cells_.difference(cell_subset).cloned().collect();
        let permu_subset = self.subset(cell_subset)?;

        let mut by_sub: HashMap<Permutation<C>, HashSet<Permutation<C>>> = HashMap::new();
        for p in &self.permus {
            by_sub
                .entry(p.subset(cell_subset))
                .or_default()
                .insert(p.subset(&cell_remainder));
        }

        // `cell_subset` is a valid Cartesian divisor only if every
        // sub-permutation pairs with the *same* remainder set -- not merely
        // if there's only one sub-permutation. Compare remainder sets by
        // content (a canonical sorted vec), not by how many distinct
        // sub-permutations produced them.
        let mut remainder_sets = by_sub.into_values();
        let first = remainder_sets.next().ok_or(())?;
        let mut first_sorted: Vec<_> = first.iter().cloned().collect();
        first_sorted.sort_by(permu_cmp);
        for other in remainder_sets {
            let mut other_sorted: Vec<_> = other.iter().cloned().collect();
            other_sorted.sort_by(permu_cmp);
            if other_sorted != first_sorted {
                return Err(());
            }
        }

        let remainder_set =
            PermutationSet::new(cell_remainder, self.k - permu_subset.k, first);
        Ok((permu_subset, remainder_set))
    }

    /// If this set can be expressed as the Cartesian product of several
    /// smaller sets, return that decomposition; otherwise return this set
    /// unchanged, as a singleton vec. Skips the search entirely for
    /// unconstrained sets, since a full permutation set always decomposes
    /// to itself.
    pub fn decompose(self) -> Vec<PermutationSet<C>> {
        if self.constrained {
            self.decompose_from(1)
        } else {
            vec![self]
        }
    }

    fn decompose_from(self, k_floor: usize) -> Vec<PermutationSet<C>> {
        let max_k = self.cells_.len() / 2;
        for k in k_floor..=max_k {
            for combo in self.cells_.iter().cloned().combinations(k) {
                let cell_subset: BTreeSet<_> = combo.into_iter().collect();
                if let Ok((permu_subset, remainder)) = self.split(&cell_subset) {
                    let mut divisors = vec![permu_subset];
                    divisors.extend(remainder.decompose_from(k));
                    return divisors;
                }
            }
        }
        vec![self]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sc(cells: impl IntoIterator<Item = char>) -> SuperCell<char> {
        Arc::new(cells.into_iter().collect())
    }

    #[test]
    fn permute_zero_mines_is_all_zero() {
        let cells = vec![sc(['a']), sc(['b'])];
        let permus = permute(0, &cells);
        assert_eq!(permus.len(), 1);
        assert_eq!(permus[0].k(), 0);
    }

    #[test]
    fn permute_full_mines_fills_every_cell() {
        let cells = vec![sc(['a', 'b']), sc(['c'])];
        let permus = permute(3, &cells);
        assert_eq!(permus.len(), 1);
        assert_eq!(permus[0].k(), 3);
    }

    #[test]
    fn permute_one_mine_among_two_singletons() {
        let cells = vec![sc(['a']), sc(['b'])];
        let permus = permute(1, &cells);
        assert_eq!(permus.len(), 2);
        assert!(permus.iter().all(|p| p.k() == 1));
    }

    #[test]
    fn permute_impossible_count_is_empty() {
        let cells = vec![sc(['a'])];
        assert!(permute(5, &cells).is_empty());
    }

    #[test]
    fn compatible_and_combine_agree_on_overlap() {
        let a = sc(['a']);
        let b = sc(['b']);
        let p1 = Permutation::new(BTreeMap::from([(a.clone(), 1), (b.clone(), 0)]));
        let p2 = Permutation::new(BTreeMap::from([(a.clone(), 1)]));
        assert!(p1.compatible(&p2));
        let combined = p1.combine(&p2);
        assert_eq!(combined.k(), 1);
    }

    #[test]
    fn multiplicity_matches_choose() {
        let cell = sc(['a', 'b', 'c']);
        let p = Permutation::new(BTreeMap::from([(cell, 2)]));
        assert_eq!(p.multiplicity(), 3.0);
    }

    fn super_rule(num_mines: usize, groups: &[&str]) -> SuperRule<char> {
        let cells_: BTreeSet<_> = groups.iter().map(|g| sc(g.chars())).collect();
        let num_cells = cells_.iter().map(|c| c.len()).sum();
        SuperRule::new(num_mines, cells_, num_cells).unwrap()
    }

    /// Parses fixtures like `"a1b0c1d0"` or `"ab2c0d0"` into a `Permutation`:
    /// a run of letters names one supercell, followed by its mine count.
    fn permu(spec: &str) -> Permutation<char> {
        let mut mapping = BTreeMap::new();
        let mut chars = spec.chars().peekable();
        while chars.peek().is_some() {
            let mut group = BTreeSet::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    break;
                }
                group.insert(c);
                chars.next();
            }
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    digits.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            mapping.insert(Arc::new(group), digits.parse().unwrap());
        }
        Permutation::new(mapping)
    }

    /// A canonical, order-independent fingerprint of a permutation set's
    /// cells, mine count and exact permutation contents.
    fn decompose_key(
        ps: &PermutationSet<char>,
    ) -> (BTreeSet<SuperCell<char>>, usize, BTreeSet<Vec<(SuperCell<char>, usize)>>) {
        let permus = ps
            .iter()
            .map(|p| {
                let mut v: Vec<_> = p.iter().map(|(c, &n)| (c.clone(), n)).collect();
                v.sort();
                v
            })
            .collect();
        (ps.cells_.clone(), ps.k, permus)
    }

    fn assert_decomposes_to(got: Vec<PermutationSet<char>>, expected: Vec<PermutationSet<char>>) {
        let mut got_keys: Vec<_> = got.iter().map(decompose_key).collect();
        let mut expected_keys: Vec<_> = expected.iter().map(decompose_key).collect();
        got_keys.sort();
        expected_keys.sort();
        assert_eq!(got_keys, expected_keys);
    }

    #[test]
    fn decompose_matches_reference_fixture() {
        let mut pset = PermutationSet::from_rule(&super_rule(2, &["a", "b", "c", "d"]));
        assert_decomposes_to(pset.clone().decompose(), vec![pset.clone()]);

        pset.remove(&permu("a1b1c0d0"));
        assert_decomposes_to(pset.clone().decompose(), vec![pset.clone()]);

        // Removing the complementary pair a1b1c0d0/a0b0c1d1 leaves a set
        // that cleanly factors as R(1:a,b) x R(1:c,d): projecting onto
        // {a,b} gives two distinct sub-permutations that both pair with the
        // same remainder set {c1d0, c0d1}.
        pset.remove(&permu("a0b0c1d1"));
        assert_decomposes_to(
            pset.clone().decompose(),
            vec![
                PermutationSet::from_rule(&super_rule(1, &["a", "b"])),
                PermutationSet::from_rule(&super_rule(1, &["c", "d"])),
            ],
        );

        // One more removal breaks that clean factorization.
        pset.remove(&permu("a1b0c0d1"));
        assert_decomposes_to(pset.clone().decompose(), vec![pset.clone()]);

        pset.remove(&permu("a0b1c0d1"));
        assert_decomposes_to(
            pset.clone().decompose(),
            vec![
                PermutationSet::from_rule(&super_rule(1, &["a", "b"])),
                PermutationSet::from_rule(&super_rule(1, &["c"])),
                PermutationSet::from_rule(&super_rule(0, &["d"])),
            ],
        );

        pset.remove(&permu("a0b1c1d0"));
        assert_decomposes_to(
            pset.decompose(),
            vec![
                PermutationSet::from_rule(&super_rule(1, &["a"])),
                PermutationSet::from_rule(&super_rule(0, &["b"])),
                PermutationSet::from_rule(&super_rule(1, &["c"])),
                PermutationSet::from_rule(&super_rule(0, &["d"])),
            ],
        );
    }

    #[test]
    fn decompose_splits_multi_cell_groups_and_stays_stable_once_constrained() {
        let mut pset = PermutationSet::from_rule(&super_rule(4, &["ab", "c", "d", "ef", "g", "h"]));
        let mut subset1 = PermutationSet::from_rule(&super_rule(2, &["ab", "c", "d"]));
        let mut subset2 = PermutationSet::from_rule(&super_rule(2, &["ef", "g", "h"]));

        let originally_in_pset: Vec<Permutation<char>> = pset.iter().cloned().collect();
        for p in &originally_in_pset {
            if !subset1.iter().any(|sp| p.compatible(sp)) {
                pset.remove(p);
            }
        }
        assert_decomposes_to(pset.clone().decompose(), vec![subset1.clone(), subset2.clone()]);

        // Decomposed rulesets can still have constrained permutation sets.
        subset1.remove(&permu("ab2c0d0"));
        let current: Vec<Permutation<char>> = pset.iter().cloned().collect();
        let target = permu("ab2c0d0");
        for p in &current {
            if p.compatible(&target) {
                pset.remove(p);
            }
        }
        assert_decomposes_to(pset.clone().decompose(), vec![subset1.clone(), subset2.clone()]);

        subset2.remove(&permu("ef1g0h1"));
        let current: Vec<Permutation<char>> = pset.iter().cloned().collect();
        let target = permu("ef1g0h1");
        for p in &current {
            if p.compatible(&target) {
                pset.remove(p);
            }
        }
        assert_decomposes_to(pset.decompose(), vec![subset1, subset2]);
    }
}
