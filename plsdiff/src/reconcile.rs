//! Réconciliation d'une collection vivante avec une liste désirée
//!
//! # Index convention
//!
//! Each non-copy hunk is applied at `original_start + inserted - removed`,
//! where `inserted` and `removed` count the tokens already scheduled by the
//! previous hunks of the same pass. Within a hunk, the removal is issued
//! before the insertion, at the same index.
//!
//! Because the hunks partition both sequences and are applied in order,
//! every token before the current hunk already matches the desired list,
//! so the adjusted index is always the hunk's `modified_start`.

use tracing::{debug, warn};

use crate::{
    error::{PlanError, ReconcileError},
    hunk::{Hunk, HunkKind},
};

/// Mutable ordered sequence driven by the reconciler.
pub trait OrderedCollection {
    type Token;
    type Error: std::error::Error + 'static;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&Self::Token>;

    /// Inserts `tokens` so that the first one ends up at `index`.
    fn insert_at(&mut self, index: usize, tokens: Vec<Self::Token>) -> Result<(), Self::Error>;

    /// Removes the tokens at `indices` (all relative to the numbering before the call).
    fn remove_at(&mut self, indices: &[usize]) -> Result<(), Self::Error>;

    /// True while mutations issued earlier have not been confirmed.
    fn has_pending_changes(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    Remove { indices: Vec<usize> },
    Insert { index: usize, tokens: Vec<T> },
}

impl<T> Mutation<T> {
    fn weight(&self) -> usize {
        match self {
            Mutation::Remove { indices } => indices.len(),
            Mutation::Insert { tokens, .. } => tokens.len(),
        }
    }
}

/// Ordered list of mutations derived from a hunk list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan<T> {
    original_len: usize,
    mutations: Vec<Mutation<T>>,
}

/// Summary of a fully applied plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedPlan {
    pub mutations: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl<T: Clone> MutationPlan<T> {
    /// Translates `hunks` into mutations, copying the inserted tokens out of
    /// `desired`.
    pub fn from_hunks(hunks: &[Hunk], desired: &[T]) -> Result<Self, PlanError> {
        let mut mutations = Vec::new();
        let mut original = 0usize;
        let mut modified = 0usize;
        let mut inserted = 0usize;
        let mut removed = 0usize;

        for (i, hunk) in hunks.iter().enumerate() {
            if hunk.original_start != original || hunk.modified_start != modified {
                return Err(PlanError::NotContiguous { hunk: i });
            }
            original += hunk.original_length;
            modified += hunk.modified_length;

            if hunk.kind == HunkKind::Copy {
                if hunk.original_length != hunk.modified_length {
                    return Err(PlanError::UnbalancedCopy { hunk: i });
                }
                continue;
            }

            let index = hunk.original_start + inserted - removed;
            debug_assert_eq!(index, hunk.modified_start);

            if hunk.original_length > 0 {
                mutations.push(Mutation::Remove {
                    indices: (index..index + hunk.original_length).collect(),
                });
                removed += hunk.original_length;
            }
            if hunk.modified_length > 0 {
                let tokens = desired
                    .get(hunk.modified_start..hunk.modified_end())
                    .ok_or(PlanError::DesiredLength {
                        covered: hunk.modified_end(),
                        available: desired.len(),
                    })?;
                mutations.push(Mutation::Insert {
                    index,
                    tokens: tokens.to_vec(),
                });
                inserted += hunk.modified_length;
            }
        }

        if modified != desired.len() {
            return Err(PlanError::DesiredLength {
                covered: modified,
                available: desired.len(),
            });
        }

        Ok(Self {
            original_len: original,
            mutations,
        })
    }
}

impl<T> MutationPlan<T> {
    pub fn mutations(&self) -> &[Mutation<T>] {
        &self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Length the target collection must have for the plan to apply
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Issues every mutation in order, stopping at the first rejection.
    ///
    /// Nothing is rolled back: on `Rejected`, the collection reflects the
    /// `applied` mutations that preceded the failing step.
    pub fn apply<C>(self, collection: &mut C) -> Result<AppliedPlan, ReconcileError<C::Error>>
    where
        C: OrderedCollection<Token = T> + ?Sized,
    {
        if collection.len() != self.original_len {
            return Err(ReconcileError::Stale {
                expected: self.original_len,
                actual: collection.len(),
            });
        }

        let mut summary = AppliedPlan::default();
        for (step, mutation) in self.mutations.into_iter().enumerate() {
            let weight = mutation.weight();
            let result = match mutation {
                Mutation::Remove { indices } => {
                    debug!(step, count = indices.len(), first = ?indices.first(), "removing tokens");
                    collection.remove_at(&indices).map(|()| summary.removed += weight)
                }
                Mutation::Insert { index, tokens } => {
                    debug!(step, count = tokens.len(), index, "inserting tokens");
                    collection.insert_at(index, tokens).map(|()| summary.inserted += weight)
                }
            };
            if let Err(source) = result {
                warn!(step, applied = summary.mutations, "mutation rejected, plan aborted");
                return Err(ReconcileError::Rejected {
                    step,
                    applied: summary.mutations,
                    source,
                });
            }
            summary.mutations += 1;
        }
        Ok(summary)
    }
}

/// Plans and applies `hunks` against `collection` in one go.
pub fn reconcile<C>(
    collection: &mut C,
    hunks: &[Hunk],
    desired: &[C::Token],
) -> Result<AppliedPlan, ReconcileError<C::Error>>
where
    C: OrderedCollection + ?Sized,
    C::Token: Clone,
{
    let plan = MutationPlan::from_hunks(hunks, desired)?;
    plan.apply(collection)
}
