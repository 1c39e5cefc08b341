//! The tally/weighter: turns enumerated front configurations (and trivial
//! determined rules) into per-cell mine probabilities, folding in the
//! mine-prevalence model.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;

use crate::cell::{CellId, SuperCell};
use crate::combinatorics::{choose, fact_div};
use crate::enumerate::enumerate_front;
use crate::error::SolverError;
use crate::permutation::Permutation;
use crate::rule::SuperRule;
use crate::ruleset::PermutedRuleset;

/// A unit a tally can attribute mine-probability mass to: either a real
/// supercell, or the synthetic "everything not mentioned in any rule"
/// pseudo-cell (identified by its size, since there's at most one per
/// board).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TallyCell<C: CellId> {
    Super(SuperCell<C>),
    Uncharted(usize),
}

impl<C: CellId> TallyCell<C> {
    pub fn len(&self) -> usize {
        match self {
            TallyCell::Super(cell_) => cell_.len(),
            TallyCell::Uncharted(size) => *size,
        }
    }
}

/// Mine-count distribution and per-cell expectation within one bucket (a
/// fixed number of mines `k`) of a front.
#[derive(Debug, Clone)]
struct FrontSubtally<C: CellId> {
    total: f64,
    tally: HashMap<TallyCell<C>, f64>,
}

impl<C: CellId> FrontSubtally<C> {
    fn new() -> Self {
        FrontSubtally {
            total: 0.0,
            tally: HashMap::new(),
        }
    }

    fn mk(total: f64, tally: HashMap<TallyCell<C>, f64>) -> Self {
        FrontSubtally { total, tally }
    }

    fn add(&mut self, config: &Permutation<C>) {
        let mult = config.multiplicity();
        self.total += mult;
        for (cell_, &n) in config.iter() {
            *self
                .tally
                .entry(TallyCell::Super(cell_.clone()))
                .or_insert(0.0) += n as f64 * mult;
        }
    }

    fn finalize(&mut self) {
        for value in self.tally.values_mut() {
            *value /= self.total;
        }
    }

    fn collapse(&self) -> Vec<(TallyCell<C>, f64)> {
        self.tally
            .iter()
            .map(|(cell_, expected)| (cell_.clone(), self.total * expected))
            .collect()
    }
}

/// All mine configurations for a single front, bucketed by total mine
/// count.
#[derive(Debug, Clone)]
pub struct FrontTally<C: CellId> {
    subtallies: HashMap<usize, FrontSubtally<C>>,
}

impl<C: CellId> FrontTally<C> {
    fn new() -> Self {
        FrontTally {
            subtallies: HashMap::new(),
        }
    }

    /// Enumerate `front` and tally every resulting configuration.
    pub fn tally_front(front: &PermutedRuleset<C>) -> Result<Self, SolverError> {
        let mut out = FrontTally::new();
        for config in enumerate_front(front) {
            out.subtallies
                .entry(config.k())
                .or_insert_with(FrontSubtally::new)
                .add(&config);
        }
        if out.subtallies.is_empty() {
            return Err(SolverError::Inconsistent(
                "mine front has no possible configurations".to_string(),
            ));
        }
        out.finalize();
        Ok(out)
    }

    fn finalize(&mut self) {
        for subtally in self.subtallies.values_mut() {
            subtally.finalize();
        }
    }

    pub fn min_mines(&self) -> usize {
        *self.subtallies.keys().min().expect("tally always has at least one bucket")
    }

    pub fn max_mines(&self) -> usize {
        *self.subtallies.keys().max().expect("tally always has at least one bucket")
    }

    pub fn is_static(&self) -> bool {
        self.subtallies.len() == 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &FrontSubtally<C>)> {
        self.subtallies.iter()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (&usize, &mut FrontSubtally<C>)> {
        self.subtallies.iter_mut()
    }

    fn normalize(&mut self) {
        let total: f64 = self.subtallies.values().map(|s| s.total).sum();
        for subtally in self.subtallies.values_mut() {
            subtally.total /= total;
        }
    }

    fn collapse(&mut self) -> HashMap<TallyCell<C>, f64> {
        self.normalize();
        let mut out: HashMap<TallyCell<C>, f64> = HashMap::new();
        for subtally in self.subtallies.values() {
            for (cell_, contribution) in subtally.collapse() {
                *out.entry(cell_).or_insert(0.0) += contribution;
            }
        }
        out
    }

    /// Build a tally directly from a trivial (single-supercell) rule,
    /// without going through enumeration.
    pub fn from_rule(rule: &SuperRule<C>) -> Result<Self, SolverError> {
        if !rule.is_trivial() {
            return Err(SolverError::InvalidArgument(
                "can only tally a trivial rule directly".to_string(),
            ));
        }
        let cell_ = rule.cells_.iter().next().expect("trivial rule has exactly one supercell");
        let subtally = FrontSubtally::mk(
            choose(rule.num_cells, rule.num_mines),
            HashMap::from([(TallyCell::Super(cell_.clone()), rule.num_mines as f64)]),
        );
        Ok(FrontTally {
            subtallies: HashMap::from([(rule.num_mines, subtally)]),
        })
    }

    /// A synthetic tally for the "other" uncharted cells, one bucket per
    /// possible free-mine count.
    fn for_other(num_uncharted_cells: usize, mine_totals: &HashMap<usize, f64>) -> Self {
        let subtallies = mine_totals
            .iter()
            .map(|(&num_mines, &k)| {
                let subtally = FrontSubtally::mk(
                    k,
                    HashMap::from([(TallyCell::Uncharted(num_uncharted_cells), num_mines as f64)]),
                );
                (num_mines, subtally)
            })
            .collect();
        FrontTally { subtallies }
    }
}

/// Enumerate a front and tally it.
pub fn enumerate_front_tally<C: CellId>(
    front: &PermutedRuleset<C>,
) -> Result<FrontTally<C>, SolverError> {
    FrontTally::tally_front(front)
}

/// How many mines are expected to exist overall.
pub enum MinePrevalence {
    Discrete { total_cells: usize, total_mines: usize },
    NonDiscrete(f64),
}

impl MinePrevalence {
    pub fn discrete(total_cells: usize, total_mines: usize) -> Self {
        MinePrevalence::Discrete {
            total_cells,
            total_mines,
        }
    }

    pub fn probability(p: f64) -> Result<Self, SolverError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(SolverError::InvalidArgument(format!(
                "mine probability {p} is outside [0, 1]"
            )));
        }
        Ok(MinePrevalence::NonDiscrete(p))
    }
}

fn possible_mine_limits<C: CellId>(stats: &[FrontTally<C>]) -> (usize, usize) {
    (
        stats.iter().map(|s| s.min_mines()).sum(),
        stats.iter().map(|s| s.max_mines()).sum(),
    )
}

fn check_count_consistency<C: CellId>(
    stats: &[FrontTally<C>],
    total_cells: usize,
    total_mines: usize,
    all_cells: &BTreeSet<SuperCell<C>>,
) -> Result<usize, SolverError> {
    let (min_possible, max_possible) = possible_mine_limits(stats);
    let num_uncharted_cells = total_cells - all_cells.iter().map(|c| c.len()).sum::<usize>();

    if min_possible > total_mines {
        return Err(SolverError::Inconsistent(
            "minimum possible number of mines is more than the supplied mine count".to_string(),
        ));
    }
    if total_mines > max_possible + num_uncharted_cells {
        return Err(SolverError::Inconsistent(
            "maximum possible number of mines on board is less than the supplied mine count"
                .to_string(),
        ));
    }

    Ok(num_uncharted_cells)
}

fn discrete_relative_likelihood(n: usize, k: usize, k0: usize) -> Result<f64, SolverError> {
    if k > n || k0 > n {
        return Err(SolverError::InvalidArgument(
            "k, k0 must be within [0, n]".to_string(),
        ));
    }
    Ok(fact_div(k0, k) * fact_div(n - k0, n - k))
}

fn nondiscrete_relative_likelihood(p: f64, k: usize, k0: usize) -> Result<f64, SolverError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(SolverError::InvalidArgument(
            "p must be within [0, 1]".to_string(),
        ));
    }
    let exp = k as f64 - k0 as f64;
    Ok((p / (1.0 - p)).powf(exp))
}

/// Combine every dynamic (non-static) front's bucket weights so that, taken
/// together with the fixed total mine count, only combinations summing to
/// the right number of at-large mines survive. Returns the adjusted stats
/// plus the synthetic tally for the uncharted cells.
fn combine_fronts<C: CellId>(
    stats: Vec<FrontTally<C>>,
    num_uncharted_cells: usize,
    at_large_mines: usize,
) -> Result<(Vec<FrontTally<C>>, FrontTally<C>), SolverError> {
    let (min_possible_mines, _) = possible_mine_limits(&stats);
    let max_free_mines = at_large_mines
        .saturating_sub(min_possible_mines)
        .min(num_uncharted_cells);

    let mut stats = stats;
    let bucket_lists: Vec<Vec<(usize, f64)>> = stats
        .iter()
        .map(|st| st.iter().map(|(&k, sub)| (k, sub.total)).collect())
        .collect();

    let mut grand_totals: Vec<HashMap<usize, f64>> = vec![HashMap::new(); stats.len()];
    let mut uncharted_total: HashMap<usize, f64> = HashMap::new();

    for combination in bucket_lists.iter().map(|v| v.iter()).multi_cartesian_product() {
        let sum_mines: usize = combination.iter().map(|e| e.0).sum();
        let num_free_mines = at_large_mines as isize - sum_mines as isize;

        let weight = if num_free_mines < 0 || num_free_mines as usize > num_uncharted_cells {
            0.0
        } else {
            let free_factor = discrete_relative_likelihood(
                num_uncharted_cells,
                num_free_mines as usize,
                max_free_mines,
            )?;
            free_factor * combination.iter().map(|e| e.1).product::<f64>()
        };

        for (front_total, e) in grand_totals.iter_mut().zip(combination.iter()) {
            *front_total.entry(e.0).or_insert(0.0) += weight;
        }
        let free_key = if num_free_mines < 0 {
            0
        } else {
            num_free_mines as usize
        };
        *uncharted_total.entry(free_key).or_insert(0.0) += weight;
    }

    for (st, front_total) in stats.iter_mut().zip(grand_totals.into_iter()) {
        for (k, subtally) in st.iter_mut() {
            if let Some(&total) = front_total.get(k) {
                subtally.total = total;
            }
        }
    }

    Ok((stats, FrontTally::for_other(num_uncharted_cells, &uncharted_total)))
}

/// Combine every front's tally with the mine-prevalence model into final
/// per-cell probabilities.
pub fn cell_probabilities<C: CellId>(
    stats: Vec<FrontTally<C>>,
    prevalence: &MinePrevalence,
    all_cells: &BTreeSet<SuperCell<C>>,
) -> Result<HashMap<TallyCell<C>, f64>, SolverError> {
    let mut out = HashMap::new();

    match prevalence {
        MinePrevalence::Discrete {
            total_cells,
            total_mines,
        } => {
            let num_uncharted_cells =
                check_count_consistency(&stats, *total_cells, *total_mines, all_cells)?;

            let mut dyn_stats = Vec::new();
            let mut static_stats = Vec::new();
            for st in stats {
                if st.is_static() {
                    static_stats.push(st);
                } else {
                    dyn_stats.push(st);
                }
            }

            let num_static_mines: usize = static_stats.iter().map(|s| s.max_mines()).sum();
            let at_large_mines = total_mines.saturating_sub(num_static_mines);

            let (mut dyn_stats, other_stat) =
                combine_fronts(dyn_stats, num_uncharted_cells, at_large_mines)?;
            dyn_stats.push(other_stat);

            for mut st in static_stats.into_iter().chain(dyn_stats.into_iter()) {
                for (cell_, p) in st.collapse() {
                    *out.entry(cell_).or_insert(0.0) += p;
                }
            }
        }
        MinePrevalence::NonDiscrete(p) => {
            let mut stats = stats;
            for st in &mut stats {
                if !st.is_static() {
                    let k0 = st.min_mines();
                    for (&k, subtally) in st.iter_mut() {
                        subtally.total *= nondiscrete_relative_likelihood(*p, k, k0)?;
                    }
                }
            }
            for mut st in stats {
                for (cell_, prob) in st.collapse() {
                    *out.entry(cell_).or_insert(0.0) += prob;
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_div_based_likelihoods_match_direct_ratio() {
        let r = discrete_relative_likelihood(10, 3, 5).unwrap();
        let expected = choose(10, 3) / choose(10, 5);
        assert!((r - expected).abs() < 1e-9);
    }

    #[test]
    fn nondiscrete_likelihood_is_one_at_k0() {
        let r = nondiscrete_relative_likelihood(0.2, 4, 4).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn probability_rejects_out_of_range() {
        assert!(MinePrevalence::probability(1.5).is_err());
        assert!(MinePrevalence::probability(-0.1).is_err());
        assert!(MinePrevalence::probability(0.5).is_ok());
    }
}
