use std::{fmt, str::FromStr, time::Duration};

use crate::error::Error;

/// What a patch does when the playlist still has changes in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchPolicy {
    /// Wait for the pending changes to settle, then diff against the
    /// settled state. Queued patches run in arrival order.
    #[default]
    Queue,
    /// Fail at once with [`Error::PatchInFlight`].
    Reject,
}

impl FromStr for PatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(PatchPolicy::Queue),
            "reject" => Ok(PatchPolicy::Reject),
            other => Err(Error::BadParameter(format!(
                "patch policy must be 'queue' or 'reject', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchPolicy::Queue => write!(f, "queue"),
            PatchPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Réglages du réacteur et des requêtes
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Bound of the command channel between clients and the reactor
    pub command_capacity: usize,
    pub max_drain_rounds: usize,
    pub patch_policy: PatchPolicy,
    /// Past this delay a request is cancelled and fails with `Timeout`
    pub request_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            command_capacity: 256,
            max_drain_rounds: 64,
            patch_policy: PatchPolicy::Queue,
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_policy_parsing() {
        assert_eq!("queue".parse::<PatchPolicy>().unwrap(), PatchPolicy::Queue);
        assert_eq!(" Reject ".parse::<PatchPolicy>().unwrap(), PatchPolicy::Reject);
        assert!(matches!(
            "merge".parse::<PatchPolicy>(),
            Err(Error::BadParameter(_))
        ));
        assert_eq!(PatchPolicy::Reject.to_string(), "reject");
    }
}
