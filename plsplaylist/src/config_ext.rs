//! Extension de plsconfig pour le service de playlists

use std::{path::PathBuf, time::Duration};

use plssession::MemorySettings;
use tracing::warn;

use crate::settings::{PatchPolicy, ServiceSettings};

/// Trait d'extension pour plsconfig::Config
pub trait PlaylistConfigExt {
    /// Réglages du réacteur; invalid values fall back to the defaults.
    fn service_settings(&self) -> ServiceSettings;

    /// Réglages de la session mémoire, catalog stored in the settings
    /// directory.
    fn memory_settings(&self) -> anyhow::Result<MemorySettings>;
}

impl PlaylistConfigExt for plsconfig::Config {
    fn service_settings(&self) -> ServiceSettings {
        let defaults = ServiceSettings::default();

        let patch_policy = match self.get_patch_policy() {
            Ok(policy) => policy.parse().unwrap_or_else(|err| {
                warn!("{}, using '{}'", err, PatchPolicy::default());
                PatchPolicy::default()
            }),
            Err(_) => PatchPolicy::default(),
        };

        ServiceSettings {
            command_capacity: self
                .get_reactor_command_capacity()
                .unwrap_or(defaults.command_capacity),
            max_drain_rounds: self
                .get_reactor_max_drain_rounds()
                .unwrap_or(defaults.max_drain_rounds),
            patch_policy,
            request_timeout: self
                .get_request_timeout_secs()
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.request_timeout),
        }
    }

    fn memory_settings(&self) -> anyhow::Result<MemorySettings> {
        let settings_dir = self.get_session_settings_dir()?;
        let millis = |ms: usize| Duration::from_millis(ms as u64);

        Ok(MemorySettings {
            user_agent: self.get_session_user_agent()?,
            catalog_path: Some(PathBuf::from(settings_dir).join("catalog.json")),
            load_latency: millis(self.get_session_load_latency_ms()?),
            commit_latency: millis(self.get_session_commit_latency_ms()?),
            poll_interval: millis(self.get_session_poll_interval_ms()?),
            process_batch_size: self.get_session_process_batch_size()?,
            max_playlist_tracks: self.get_session_max_playlist_tracks()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plsconfig::Config;
    use std::fs;

    #[test]
    fn test_settings_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "session:\n  poll_interval_ms: 250\n  max_playlist_tracks: 50\nplaylists:\n  patch_policy: reject\nhost:\n  request_timeout_secs: 5\n",
        )
        .unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        let service = config.service_settings();
        assert_eq!(service.patch_policy, PatchPolicy::Reject);
        assert_eq!(service.request_timeout, Duration::from_secs(5));
        assert_eq!(service.max_drain_rounds, 64);

        let memory = config.memory_settings().unwrap();
        assert_eq!(memory.poll_interval, Duration::from_millis(250));
        assert_eq!(memory.max_playlist_tracks, 50);
        let catalog = memory.catalog_path.unwrap();
        assert!(catalog.ends_with("catalog.json"));
        assert!(catalog.parent().unwrap().is_dir());
    }

    #[test]
    fn test_unknown_patch_policy_falls_back_to_queue() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "playlists:\n  patch_policy: merge\n",
        )
        .unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.service_settings().patch_policy, PatchPolicy::Queue);
    }
}
