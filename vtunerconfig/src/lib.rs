//! # VTuner Configuration Module
//!
//! This module provides configuration management for VTuner, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Typed getters and setters for configuration values
//!
//! ## Usage
//!
//! ```no_run
//! use vtunerconfig::get_config;
//!
//! let config = get_config()?;
//! let port = config.get_http_port();
//! config.set_log_min_level("DEBUG".to_string())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_yaml::{Mapping, Number, Value};
use std::{env, fs, path::Path, sync::Arc};
use tracing::info;
use uuid::Uuid;
use vtunerutils::advertise_host;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("vtuner.yaml");

static CONFIG: OnceCell<Arc<Config>> = OnceCell::new();

const ENV_CONFIG_DIR: &str = "VTUNER_CONFIG";
const ENV_PREFIX: &str = "VTUNER_CONFIG__";
const DEFAULT_DIR_NAME: &str = ".vtuner";

// Default values for configuration
const DEFAULT_HTTP_PORT: u16 = 6077;
const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path)? {
                Value::Number(n) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
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
            match self.get_value($path)? {
                Value::Bool(b) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration manager for VTuner
///
/// Holds the merged YAML tree and the file it is persisted to. Every setter
/// writes the whole tree back to disk, except for in-memory configurations
/// built with [`Config::from_yaml_str`].
///
/// # Examples
///
/// ```no_run
/// use vtunerconfig::get_config;
///
/// let config = get_config()?;
/// println!("HTTP port: {}", config.get_http_port());
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(self.data.lock().clone()),
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
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(DEFAULT_DIR_NAME).exists() {
            return DEFAULT_DIR_NAME.to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(DEFAULT_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        DEFAULT_DIR_NAME.to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
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
    /// 2. The `VTUNER_CONFIG` environment variable
    /// 3. `.vtuner` in the current directory
    /// 4. `.vtuner` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for
    /// read/write permissions.
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
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path, "Loaded config file");
                let external_value: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut config_value, &lower_keys_value(external_value));
            }
            Err(_) => {
                info!(config_file = %path, "Config file not found, using default embedded config");
            }
        }

        let mut config_value = lower_keys_value(config_value);
        apply_overrides(&mut config_value, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Builds a configuration that lives in memory only.
    ///
    /// `yaml` is merged over the embedded defaults; environment variables are
    /// not consulted and setters never touch the disk.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if !yaml.trim().is_empty() {
            let external_value: Value = serde_yaml::from_str(yaml)?;
            merge_yaml(&mut config_value, &lower_keys_value(external_value));
        }

        Ok(Config {
            config_dir: String::new(),
            path: String::new(),
            data: Mutex::new(lower_keys_value(config_value)),
        })
    }

    /// Directory holding `config.yaml`, empty for in-memory configurations.
    pub fn dir(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        if self.path.is_empty() {
            return Ok(());
        }
        let yaml = serde_yaml::to_string(&*self.data.lock())?;
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
            let mut data = self.data.lock();
            set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock();
        get_value_internal(&data, path)
    }

    /// Gets a configuration value and deserializes it into `T`.
    pub fn get_typed<T: serde::de::DeserializeOwned>(&self, path: &[&str]) -> Result<T> {
        let value = self.get_value(path)?;
        serde_yaml::from_value(value)
            .map_err(|e| anyhow!("Invalid value at {}: {}", path.join("."), e))
    }

    /// Gets the host advertised to clients
    ///
    /// Returns the configured base URL, or the host derived from the listen
    /// address (the local IP address for a wildcard) if not configured.
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Ok(_) => advertise_host(&self.get_listen_address()),
            Err(err) => {
                tracing::warn!("Failed to get base URL: {}, guessing local address", err);
                advertise_host(&self.get_listen_address())
            }
        }
    }

    /// Gets the address the HTTP server binds to
    pub fn get_listen_address(&self) -> String {
        match self.get_value(&["host", "listen_address"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => DEFAULT_LISTEN_ADDRESS.to_string(),
        }
    }

    /// Gets the HTTP port from configuration
    ///
    /// Returns the configured HTTP port, or the default port (6077) if not
    /// configured or invalid.
    pub fn get_http_port(&self) -> u16 {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    tracing::warn!("Invalid HTTP port {}, using default {}", n, DEFAULT_HTTP_PORT);
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

    /// Gets the device UUID, generating and persisting one if it doesn't exist
    ///
    /// A leading `uuid:` is stripped so the value can be used both as SSDP
    /// USN prefix and UPnP UDN.
    pub fn get_device_uuid(&self) -> Result<String> {
        let path = &["discovery", "device", "uuid"];
        match self.get_value(path) {
            Ok(Value::String(uuid)) if !uuid.trim().is_empty() => {
                let trimmed = uuid.trim();
                Ok(trimmed.strip_prefix("uuid:").unwrap_or(trimmed).to_string())
            }
            _ => {
                let new_uuid = Uuid::new_v4().to_string();
                info!(uuid = %new_uuid, "Generated device UUID");
                self.set_value(path, Value::String(new_uuid.clone()))?;
                Ok(new_uuid)
            }
        }
    }

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

    /// Gets the minimum log level
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"])? {
            Value::String(s) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    /// Sets the minimum log level
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Returns the global configuration instance
///
/// The configuration is loaded from the default directory on first access.
/// Components should receive the values they need from the caller instead
/// of calling this themselves.
pub fn get_config() -> Result<Arc<Config>> {
    CONFIG
        .get_or_try_init(|| Config::load_config("").map(Arc::new))
        .cloned()
}

/// Loads the global configuration from `directory`.
///
/// Has no effect when the global configuration is already loaded.
pub fn init_config(directory: &str) -> Result<Arc<Config>> {
    CONFIG
        .get_or_try_init(|| Config::load_config(directory).map(Arc::new))
        .cloned()
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
            set_value_internal(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        if let Value::Mapping(map) = current {
            match map.get(&Value::String(key.to_lowercase())) {
                Some(next) => current = next,
                None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
            }
        } else {
            return Err(anyhow!("Path {} is not a map", path[..i].join(".")));
        }
    }
    Ok(current.clone())
}

/// Applies `VTUNER_CONFIG__SECTION__KEY=value` pairs onto the tree.
fn apply_overrides(config: &mut Value, vars: impl Iterator<Item = (String, String)>) {
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let key_path = stripped.split("__").collect::<Vec<_>>();
            let yaml_value = convert_env_value(&value);
            if let Err(e) = set_value_internal(config, &key_path, yaml_value) {
                tracing::warn!(variable = %key, "Ignoring config override: {}", e);
            }
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(key, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
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
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_embedded() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.get_http_port(), 6077);
        assert_eq!(config.get_listen_address(), "0.0.0.0");
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
        assert_eq!(config.get_log_cache_size().unwrap(), 1000);
        assert!(config.get_log_enable_console().unwrap());
    }

    #[test]
    fn test_external_values_override_defaults() {
        let config = Config::from_yaml_str(
            "host:\n  http_port: 7000\n  base_url: tuner.lan\n",
        )
        .unwrap();
        assert_eq!(config.get_http_port(), 7000);
        assert_eq!(config.get_base_url(), "tuner.lan");
        // sibling keys survive the merge
        assert_eq!(config.get_listen_address(), "0.0.0.0");
    }

    #[test]
    fn test_keys_are_lowercased() {
        let config = Config::from_yaml_str("Host:\n  HTTP_Port: 7001\n").unwrap();
        assert_eq!(config.get_http_port(), 7001);
        assert_eq!(config.get_log_cache_size().unwrap(), 1000);
    }

    #[test]
    fn test_env_overrides() {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        let vars = vec![
            ("VTUNER_CONFIG__HOST__HTTP_PORT".to_string(), "9999".to_string()),
            ("VTUNER_CONFIG__IPTV__FFMPEG".to_string(), "/usr/bin/ffmpeg".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        apply_overrides(&mut value, vars.into_iter());

        assert_eq!(
            get_value_internal(&value, &["host", "http_port"]).unwrap(),
            Value::Number(Number::from(9999))
        );
        assert_eq!(
            get_value_internal(&value, &["iptv", "ffmpeg"]).unwrap(),
            Value::String("/usr/bin/ffmpeg".into())
        );
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let config = Config::from_yaml_str("host:\n  http_port: 700000\n").unwrap();
        assert_eq!(config.get_http_port(), DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_device_uuid_is_generated_once() {
        let config = Config::from_yaml_str("").unwrap();
        let first = config.get_device_uuid().unwrap();
        let second = config.get_device_uuid().unwrap();
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_device_uuid_prefix_is_stripped() {
        let config = Config::from_yaml_str(
            "discovery:\n  device:\n    uuid: uuid:0a1b2c3d-0000-4000-8000-000000000000\n",
        )
        .unwrap();
        assert_eq!(
            config.get_device_uuid().unwrap(),
            "0a1b2c3d-0000-4000-8000-000000000000"
        );
    }

    #[test]
    fn test_load_config_persists_merged_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_string_lossy().to_string();
        fs::write(dir.path().join("config.yaml"), "host:\n  http_port: 6100\n").unwrap();

        let config = Config::load_config(&dir_path).unwrap();
        assert_eq!(config.get_http_port(), 6100);
        config.set_log_min_level("DEBUG".into()).unwrap();

        let reloaded = Config::load_config(&dir_path).unwrap();
        assert_eq!(reloaded.get_http_port(), 6100);
        assert_eq!(reloaded.get_log_min_level().unwrap(), "DEBUG");
        // defaults were written alongside the user values
        assert!(reloaded.get_value(&["discovery", "device", "friendly_name"]).is_ok());
    }
}
