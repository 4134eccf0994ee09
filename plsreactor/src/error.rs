//! Types d'erreurs pour plsreactor

/// Misuse of a continuation that already reached a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("continuation {0} already fired")]
    AlreadyFired(u64),

    #[error("continuation {0} already cancelled")]
    AlreadyCancelled(u64),

    #[error("continuation {0} is not owned by this registry")]
    UnknownHandle(u64),
}

/// Type Result spécialisé pour plsreactor
pub type Result<T> = std::result::Result<T, RegistryError>;
