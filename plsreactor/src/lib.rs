//! # plsreactor - Continuations et pont de boucle d'événements
//!
//! Building blocks of the single-threaded reactor that drives playlist
//! requests:
//!
//! - **ContinuationRegistry** : table de continuations one-shot, indexées par
//!   ressource et condition, déclenchées exactement une fois
//! - **EventLoopBridge** : draine le service sous-jacent quand il signale du
//!   travail (via [`WakeSignal`]) ou quand sa minuterie expire
//!
//! The registry is `!Send` and lives on the reactor thread; [`WakeSignal`]
//! is the only piece meant to cross threads.

mod bridge;
mod error;
mod registry;

pub use bridge::{EventLoopBridge, EventProcessor, Wake, WakeSignal};
pub use error::{RegistryError, Result};
pub use registry::{
    Callback, ContinuationHandle, ContinuationRegistry, ContinuationState, Readiness, Registration,
};
