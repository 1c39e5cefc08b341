//! Exact mine-probability solver for partially revealed Minesweeper
//! positions.
//!
//! Given a set of rules -- each asserting that N mines lie among some set
//! of cells -- plus a model of how prevalent mines are overall, [`solve`]
//! computes the exact probability that each cell holds a mine.

pub mod cell;
pub mod combinatorics;
pub mod enumerate;
pub mod error;
pub mod json;
pub mod permutation;
pub mod reduce;
pub mod rule;
pub mod ruleset;
pub mod solve;
pub mod supercell;
pub mod tally;

pub use cell::{CellId, SuperCell};
pub use error::SolverError;
pub use rule::{Rule, RuleRef, SuperRule};
pub use solve::solve;
pub use tally::{MinePrevalence, TallyCell};
