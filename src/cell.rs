//! Cell identifiers and supercells.
//!
//! A cell is whatever opaque, hashable tag the caller uses to name a board
//! square. Internally the solver only ever deals in *supercells*: sets of
//! cells that appear in exactly the same rules, and are treated as a single
//! atomic unit for the rest of the pipeline.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Blanket bound for anything usable as a cell identifier: cheap to clone,
/// comparable, hashable, and orderable so it can be sorted into the
/// canonical form a supercell needs to be hashable itself.
pub trait CellId: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync {}

impl<T: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync> CellId for T {}

/// A set of cells that only ever appear together in the input ruleset.
///
/// Shared via `Arc` so cloning a supercell (which happens constantly while
/// threading it through rules, permutations, and tallies) is a refcount
/// bump rather than a set copy.
pub type SuperCell<C> = Arc<BTreeSet<C>>;
