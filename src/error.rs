use thiserror::Error;

/// The two failure modes a caller can actually hit.
///
/// Everything else the solver can hit is an internal assertion failure
/// (a bug in the solver, not a bad caller input) and is signalled with
/// `debug_assert!`/`assert!` instead of this type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// The ruleset, possibly combined with the mine-prevalence model, has
    /// no satisfying mine assignment.
    #[error("inconsistent ruleset: {0}")]
    Inconsistent(String),

    /// A programmer error: a prevalence probability outside `[0, 1]`, or an
    /// attempt to tally a non-trivial rule.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
