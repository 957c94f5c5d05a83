//! # Radio Configuration Module
//!
//! This module provides configuration management for the radio backend, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Process-wide handle initialised once at startup
//!
//! ## Usage
//!
//! ```no_run
//! use radioconfig::{get_config, init_config};
//!
//! // Initialise the process-wide configuration
//! init_config("")?;
//!
//! let config = get_config();
//! let port = config.get_http_port();
//! let interval = config.get_poll_interval()?;
//!
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, OnceLock},
    time::Duration,
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("radio.yaml");

static CONFIG: OnceLock<Arc<Config>> = OnceLock::new();

const ENV_CONFIG_DIR: &str = "RADIO_CONFIG";
const ENV_PREFIX: &str = "RADIO_CONFIG__";
const CONFIG_DIR_NAME: &str = ".radio";

// Default values for configuration
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_HTTP_DIR: &str = "/srv/http";
const DEFAULT_MUSIC_DIR: &str = "/srv/radio/music";
const DEFAULT_CHANNELS_FILE: &str = "channels.json";
const DEFAULT_USERS_DATABASE: &str = "users.json";
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_MPD_TIMEOUT_SECS: u64 = 3;
const DEFAULT_STALE_AFTER_SECS: u64 = 60;
const DEFAULT_PLAYLIST_BEFORE: usize = 5;
const DEFAULT_PLAYLIST_AFTER: usize = 5;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
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

/// Macro to generate getter/setter for durations stored as whole seconds
///
/// A zero value is rejected: every interval it configures must make progress.
macro_rules! impl_secs_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<Duration> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => match n.as_u64() {
                    Some(0) => Err(anyhow!("{} must be greater than zero", $path.join("."))),
                    Some(secs) => Ok(Duration::from_secs(secs)),
                    None => Err(anyhow!("{} must be a positive integer", $path.join("."))),
                },
                Ok(Value::Null) | Err(_) => Ok(Duration::from_secs($default)),
                Ok(other) => Err(anyhow!(
                    "{} must be a number of seconds, got {:?}",
                    $path.join("."),
                    other
                )),
            }
        }

        pub fn $setter(&self, value: Duration) -> Result<()> {
            let n = Number::from(value.as_secs());
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Configuration of the radio backend
///
/// The YAML tree is kept in memory behind a mutex and written back to
/// `config.yaml` after every change.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Config {
    /// First usable candidate: the argument, `$RADIO_CONFIG`, then an
    /// existing `.radio` in the working or home directory
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Config directory taken from env");
            return env_path;
        }

        let home = home_dir().map(|home| home.join(CONFIG_DIR_NAME));
        [Some(PathBuf::from(CONFIG_DIR_NAME)), home]
            .into_iter()
            .flatten()
            .find(|candidate| candidate.is_dir())
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_else(|| CONFIG_DIR_NAME.to_string())
    }

    /// Creates `path` if needed and checks that it can hold the database files
    fn validate_config_dir(path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let probe = path.join(".radio_write_probe");
        fs::write(&probe, b"")?;
        fs::remove_file(&probe)?;
        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// See [`Config::find_config_dir`] for the lookup order. The directory is
    /// created when missing.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))
            .map_err(|e| anyhow!("Invalid configuration directory {}: {}", dir_path, e))?;
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

        let default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        // Essayer de charger le fichier de configuration
        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)
            .map_err(|e| anyhow!("Malformed configuration file {}: {}", path, e))?;
        let mut config_value = Self::lower_keys_value(default_value);
        merge_yaml(&mut config_value, &Self::lower_keys_value(external_value));

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Directory holding `config.yaml`
    pub fn dir(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data())?;
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
            let mut data = self.data();
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
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        Self::get_value_internal(&self.data(), path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                if let Some(next) = map.get(&Value::String(key.to_lowercase())) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
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

    fn get_string(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => default.to_string(),
        }
    }

    /// Résout un chemin relatif par rapport au répertoire de configuration
    fn resolve_in_config_dir(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        }
    }

    /// HTTP port, or 8080 when the configured one is not in 1..=65535
    pub fn get_http_port(&self) -> u16 {
        let port = match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Ok(Value::String(s)) => s.trim().parse::<u16>().ok(),
            _ => None,
        };
        match port {
            Some(port) if port > 0 => port,
            _ => {
                tracing::warn!(default = DEFAULT_HTTP_PORT, "Invalid or missing host.http_port");
                DEFAULT_HTTP_PORT
            }
        }
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_value(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    /// Directory of the static web files
    pub fn get_http_dir(&self) -> String {
        self.get_string(&["host", "http_dir"], DEFAULT_HTTP_DIR)
    }

    pub fn set_http_dir(&self, dir: &str) -> Result<()> {
        self.set_value(&["host", "http_dir"], Value::String(dir.to_string()))
    }

    /// Directory of the music files, holding the `transitions` jingles
    pub fn get_music_dir(&self) -> String {
        self.get_string(&["host", "music_dir"], DEFAULT_MUSIC_DIR)
    }

    /// Path of the channel configuration file
    ///
    /// Relative paths are kept as-is and therefore resolve against the
    /// working directory of the process.
    pub fn get_channels_file(&self) -> String {
        self.get_string(&["radio", "channels_file"], DEFAULT_CHANNELS_FILE)
    }

    pub fn set_channels_file(&self, file: &str) -> Result<()> {
        self.set_value(&["radio", "channels_file"], Value::String(file.to_string()))
    }

    /// Path of the user directory file, resolved against the config directory
    pub fn get_users_database(&self) -> PathBuf {
        let file = self.get_string(&["users", "database"], DEFAULT_USERS_DATABASE);
        self.resolve_in_config_dir(&file)
    }

    impl_secs_config!(
        get_poll_interval,
        set_poll_interval,
        &["radio", "poll_interval_secs"],
        DEFAULT_POLL_INTERVAL_SECS
    );

    impl_secs_config!(
        get_mpd_timeout,
        set_mpd_timeout,
        &["radio", "mpd_timeout_secs"],
        DEFAULT_MPD_TIMEOUT_SECS
    );

    impl_secs_config!(
        get_stale_after,
        set_stale_after,
        &["radio", "stale_after_secs"],
        DEFAULT_STALE_AFTER_SECS
    );

    impl_usize_config!(
        get_playlist_before,
        set_playlist_before,
        &["radio", "playlist", "before"],
        DEFAULT_PLAYLIST_BEFORE
    );

    impl_usize_config!(
        get_playlist_after,
        set_playlist_after,
        &["radio", "playlist", "after"],
        DEFAULT_PLAYLIST_AFTER
    );

    impl_usize_config!(
        get_log_cache_size,
        set_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self.get_string(&["host", "logger", "min_level"], DEFAULT_LOG_MIN_LEVEL))
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Loads the process-wide configuration from `directory`
///
/// Must be called once at startup, before any `get_config()`; a second call
/// returns the already loaded instance.
pub fn init_config(directory: &str) -> Result<Arc<Config>> {
    if let Some(config) = CONFIG.get() {
        return Ok(config.clone());
    }
    let config = Arc::new(Config::load_config(directory)?);
    Ok(CONFIG.get_or_init(|| config).clone())
}

/// Returns the global configuration instance
///
/// Falls back to loading the default locations when `init_config` was not
/// called.
///
/// # Panics
///
/// Panics if no configuration directory can be prepared.
pub fn get_config() -> Arc<Config> {
    CONFIG
        .get_or_init(|| {
            Arc::new(Config::load_config("").expect("Failed to load radio configuration"))
        })
        .clone()
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
        // pour les scalaires ou séquences, on remplace
        (d, e) => *d = e.clone(),
    }
}
