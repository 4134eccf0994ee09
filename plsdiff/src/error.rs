//! Types d'erreurs pour plsdiff

/// Hunks that cannot be turned into a mutation plan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("hunk {hunk} is not contiguous with the previous one")]
    NotContiguous { hunk: usize },

    #[error("hunk {hunk} is a copy with unequal lengths")]
    UnbalancedCopy { hunk: usize },

    #[error("hunks cover {covered} desired tokens but {available} were supplied")]
    DesiredLength { covered: usize, available: usize },
}

/// Failure while applying a plan to a live collection
///
/// Mutations applied before the failing step stay applied.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("collection holds {actual} tokens, the plan was computed for {expected}")]
    Stale { expected: usize, actual: usize },

    #[error("mutation {step} rejected after {applied} applied: {source}")]
    Rejected {
        step: usize,
        applied: usize,
        #[source]
        source: E,
    },
}

impl<E> ReconcileError<E>
where
    E: std::error::Error + 'static,
{
    /// Number of mutations the collection accepted before the failure
    pub fn applied(&self) -> usize {
        match self {
            ReconcileError::Rejected { applied, .. } => *applied,
            _ => 0,
        }
    }
}
