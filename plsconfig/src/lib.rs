//! # PLSServer Configuration Module
//!
//! This module provides configuration management for PLSServer, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use plsconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let port = config.get_http_port();
//! let policy = config.get_patch_policy()?;
//!
//! // Update configuration values
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::info;

// Module de chiffrement des mots de passe
pub mod encryption;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("plsserver.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PLSServer configuration"));
}

const ENV_CONFIG_DIR: &str = "PLSSERVER_CONFIG";
const ENV_PREFIX: &str = "PLSSERVER_CONFIG__";

// Default values for configuration
const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: u16 = 1337;
const DEFAULT_REQUEST_TIMEOUT_SECS: usize = 60;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_USER_AGENT: &str = "plsserver";
const DEFAULT_SETTINGS_LOCATION: &str = ".settings";
const DEFAULT_POLL_INTERVAL_MS: usize = 1000;
const DEFAULT_PROCESS_BATCH_SIZE: usize = 16;
const DEFAULT_LOAD_LATENCY_MS: usize = 20;
const DEFAULT_COMMIT_LATENCY_MS: usize = 20;
const DEFAULT_MAX_PLAYLIST_TRACKS: usize = 10_000;
const DEFAULT_COMMAND_CAPACITY: usize = 256;
const DEFAULT_MAX_DRAIN_ROUNDS: usize = 64;
const DEFAULT_PATCH_POLICY: &str = "queue";

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => match n.as_u64() {
                    Some(v) => Ok(v as usize),
                    None => Ok($default),
                },
                Ok(Value::String(s)) => Ok(s.trim().parse::<usize>().unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: usize) -> Result<()> {
            let n = Number::from(value as u64);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Configuration manager for PLSServer
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters/setters for configuration values
///
/// # Examples
///
/// ```no_run
/// use plsconfig::get_config;
///
/// let config = get_config();
/// let port = config.get_http_port();
/// println!("HTTP port: {}", port);
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.lock_data().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".plsserver").exists() {
            return ".plsserver".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".plsserver");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".plsserver".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("Le chemin spécifié n'est pas un répertoire"));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PLSSERVER_CONFIG` environment variable
    /// 3. `.plsserver` in the current directory
    /// 4. `.plsserver` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for read/write permissions.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        // Merger avec la config par défaut
        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    fn lock_data(&self) -> MutexGuard<'_, Value> {
        // Un panic pendant une écriture laisse une valeur YAML cohérente
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the directory holding `config.yaml`
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = {
            let data = self.lock_data();
            serde_yaml::to_string(&*data)?
        };
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock_data();
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock_data();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        new_map.insert(Value::String(s.to_lowercase()), Self::lower_keys_value(v));
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Résout un chemin relatif au répertoire de configuration et le crée si besoin
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<String> {
        let path = Path::new(dir_path);

        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        };

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory=%absolute_path.display(), "Created managed directory");
        }

        Ok(absolute_path.to_string_lossy().to_string())
    }

    /// Récupère un répertoire géré par la configuration
    ///
    /// Le répertoire peut être absolu ou relatif au répertoire de
    /// configuration. Il sera créé s'il n'existe pas.
    ///
    /// ```no_run
    /// use plsconfig::get_config;
    ///
    /// let config = get_config();
    /// let settings_dir = config.get_managed_dir(&["session", "settings_location"], ".settings")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let dir_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_value(path, Value::String(default.to_string()))?;
                default.to_string()
            }
        };
        self.resolve_and_create_dir(&dir_path)
    }

    /// Gets the address the HTTP listener binds to
    pub fn get_http_host(&self) -> String {
        match self.get_value(&["host", "http_host"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(_) => {
                tracing::warn!("HTTP host is not a string or empty, using {}", DEFAULT_HTTP_HOST);
                DEFAULT_HTTP_HOST.to_string()
            }
            Err(err) => {
                tracing::warn!("Failed to get HTTP host: {}, using {}", err, DEFAULT_HTTP_HOST);
                DEFAULT_HTTP_HOST.to_string()
            }
        }
    }

    pub fn set_http_host(&self, host: String) -> Result<()> {
        self.set_value(&["host", "http_host"], Value::String(host))
    }

    /// Gets the HTTP port from configuration
    ///
    /// Returns the configured HTTP port, or the default port (1337) if not configured or invalid.
    pub fn get_http_port(&self) -> u16 {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    tracing::warn!(
                        "HTTP port {} out of range, using default {}",
                        n,
                        DEFAULT_HTTP_PORT
                    );
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(Value::String(s)) => match s.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!(
                        "Invalid HTTP port '{}', using default {}",
                        s,
                        DEFAULT_HTTP_PORT
                    );
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(_) => {
                tracing::warn!(
                    "HTTP port not a number or string, using default {}",
                    DEFAULT_HTTP_PORT
                );
                DEFAULT_HTTP_PORT
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to get HTTP port: {}, using default {}",
                    err,
                    DEFAULT_HTTP_PORT
                );
                DEFAULT_HTTP_PORT
            }
        }
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        let n = Number::from(port);
        self.set_value(&["host", "http_port"], Value::Number(n))
    }

    impl_usize_config!(
        get_request_timeout_secs,
        set_request_timeout_secs,
        &["host", "request_timeout_secs"],
        DEFAULT_REQUEST_TIMEOUT_SECS
    );

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    impl_string_config!(
        get_session_username,
        set_session_username,
        &["session", "username"],
        ""
    );

    impl_string_config!(
        get_session_user_agent,
        set_session_user_agent,
        &["session", "user_agent"],
        DEFAULT_USER_AGENT
    );

    /// Répertoire des réglages persistants de la session (créé si nécessaire)
    pub fn get_session_settings_dir(&self) -> Result<String> {
        self.get_managed_dir(&["session", "settings_location"], DEFAULT_SETTINGS_LOCATION)
    }

    /// Mot de passe de la session, déchiffré s'il est stocké sous forme `encrypted:`
    pub fn get_session_password(&self) -> Result<String> {
        match self.get_value(&["session", "password"]) {
            Ok(Value::String(s)) => encryption::get_password(&s),
            _ => Ok(String::new()),
        }
    }

    /// Stocke le mot de passe chiffré avec la clé dérivée de la machine
    pub fn set_session_password(&self, password: &str) -> Result<()> {
        let encrypted = encryption::encrypt_password(password)?;
        self.set_value(&["session", "password"], Value::String(encrypted))
    }

    impl_usize_config!(
        get_session_poll_interval_ms,
        set_session_poll_interval_ms,
        &["session", "poll_interval_ms"],
        DEFAULT_POLL_INTERVAL_MS
    );

    impl_usize_config!(
        get_session_process_batch_size,
        set_session_process_batch_size,
        &["session", "process_batch_size"],
        DEFAULT_PROCESS_BATCH_SIZE
    );

    impl_usize_config!(
        get_session_load_latency_ms,
        set_session_load_latency_ms,
        &["session", "load_latency_ms"],
        DEFAULT_LOAD_LATENCY_MS
    );

    impl_usize_config!(
        get_session_commit_latency_ms,
        set_session_commit_latency_ms,
        &["session", "commit_latency_ms"],
        DEFAULT_COMMIT_LATENCY_MS
    );

    impl_usize_config!(
        get_session_max_playlist_tracks,
        set_session_max_playlist_tracks,
        &["session", "max_playlist_tracks"],
        DEFAULT_MAX_PLAYLIST_TRACKS
    );

    impl_usize_config!(
        get_reactor_command_capacity,
        set_reactor_command_capacity,
        &["reactor", "command_capacity"],
        DEFAULT_COMMAND_CAPACITY
    );

    impl_usize_config!(
        get_reactor_max_drain_rounds,
        set_reactor_max_drain_rounds,
        &["reactor", "max_drain_rounds"],
        DEFAULT_MAX_DRAIN_ROUNDS
    );

    impl_string_config!(
        get_patch_policy,
        set_patch_policy,
        &["playlists", "patch_policy"],
        DEFAULT_PATCH_POLICY
    );
}

/// Returns the global configuration instance
///
/// This function provides access to the singleton configuration instance,
/// which is lazily loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &tempfile::TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults_from_embedded_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(config.get_http_host(), "127.0.0.1");
        assert_eq!(config.get_http_port(), 1337);
        assert_eq!(config.get_request_timeout_secs().unwrap(), 60);
        assert_eq!(config.get_patch_policy().unwrap(), "queue");
        assert_eq!(config.get_reactor_max_drain_rounds().unwrap(), 64);
        assert_eq!(config.get_session_process_batch_size().unwrap(), 16);
        assert!(config.get_log_enable_console().unwrap());
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_external_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "host:\n  HTTP_PORT: 8088\nplaylists:\n  patch_policy: reject\n",
        )
        .unwrap();

        let config = load_in(&dir);
        assert_eq!(config.get_http_port(), 8088);
        assert_eq!(config.get_patch_policy().unwrap(), "reject");
        // Les clés absentes du fichier gardent leur valeur par défaut
        assert_eq!(config.get_http_host(), "127.0.0.1");
    }

    #[test]
    fn test_set_value_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config.set_http_port(4242).unwrap();
        config.set_session_username("alice".to_string()).unwrap();

        let reloaded = load_in(&dir);
        assert_eq!(reloaded.get_http_port(), 4242);
        assert_eq!(reloaded.get_session_username().unwrap(), "alice");
    }

    #[test]
    fn test_invalid_port_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config
            .set_value(&["host", "http_port"], Value::String("not-a-port".into()))
            .unwrap();
        assert_eq!(config.get_http_port(), DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        assert!(config.get_value(&["nope", "missing"]).is_err());
    }

    #[test]
    fn test_merge_yaml_replaces_scalars() {
        let mut base: Value = serde_yaml::from_str("a: 1\nb:\n  c: 2\n  d: 3\n").unwrap();
        let ext: Value = serde_yaml::from_str("b:\n  c: 20\ne: 5\n").unwrap();
        merge_yaml(&mut base, &ext);

        let expected: Value = serde_yaml::from_str("a: 1\nb:\n  c: 20\n  d: 3\ne: 5\n").unwrap();
        assert_eq!(base, expected);
    }
}
