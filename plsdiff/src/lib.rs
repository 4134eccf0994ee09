//! # plsdiff - Diff de séquences et réconciliation de playlists
//!
//! This crate compares two ordered token sequences and turns the result
//! into mutations of a live collection:
//!
//! - **Token** : unité opaque comparée uniquement par égalité de sa forme canonique
//! - **diff** : consomme deux flux une seule fois et produit des [`Hunk`]s
//!   qui partitionnent les deux séquences
//! - **unified** : rendu texte façon `diff -u` pour la prévisualisation
//! - **reconcile** : applique les hunks à une [`OrderedCollection`]
//!
//! # Exemple
//!
//! ```
//! use plsdiff::{diff, HunkKind};
//!
//! let hunks = diff(["a", "b", "c"], ["a", "x", "c"]);
//! let kinds: Vec<_> = hunks.iter().map(|h| h.kind).collect();
//! assert_eq!(kinds, [HunkKind::Copy, HunkKind::Replace, HunkKind::Copy]);
//! ```

mod engine;
mod error;
mod hunk;
mod reconcile;
mod token;
mod unified;

pub use engine::{diff, diff_tokens};
pub use error::{PlanError, ReconcileError};
pub use hunk::{Hunk, HunkKind};
pub use reconcile::{AppliedPlan, Mutation, MutationPlan, OrderedCollection, reconcile};
pub use token::{CollectionStream, Token};
pub use unified::{UnifiedOptions, unified};
