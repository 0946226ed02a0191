//! Host configuration access and the merged-configuration machinery
//!
//! The loader reads two well-known keys from the host configuration: the
//! module-name list under [`MODULE_LIST_KEY`] and the optional result-cache
//! settings under [`CACHE_CONFIG_KEY`]. Module configuration contributions
//! are deep-merged into one nested tree: maps merge key-by-key recursively,
//! while scalars and arrays from later modules overwrite earlier values.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ModuleError;

/// Host config key holding the ordered module-name list.
pub const MODULE_LIST_KEY: &str = "modules";

/// Host config key holding the result-cache settings.
pub const CACHE_CONFIG_KEY: &str = "module_cache";

/// Cache key used when the host configures none, and the fallback key when
/// a configured key fails adapter-side validation.
pub const DEFAULT_CACHE_KEY: &str = "modules.merged_config";

/// Default TTL for the cached merged configuration, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Name of the built-in in-memory cache adapter.
pub const DEFAULT_CACHE_ADAPTER: &str = "memory";

/// Read-only host configuration the loader consults at load time.
pub trait ConfigSource {
    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<Value>;

    /// Full configuration tree; seeds the merged configuration before any
    /// module contributes.
    fn snapshot(&self) -> Value;
}

/// JSON-object backed configuration source.
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    root: serde_json::Map<String, Value>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object.
    pub fn from_value(value: Value) -> Result<Self, ModuleError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ModuleError::InvalidConfig(format!(
                "host configuration must be an object, got {other}"
            ))),
        }
    }

    /// Parse a TOML document into a configuration source.
    pub fn from_toml_str(contents: &str) -> Result<Self, ModuleError> {
        let parsed: toml::Value = toml::from_str(contents)
            .map_err(|e| ModuleError::InvalidConfig(format!("failed to parse TOML: {e}")))?;
        let value = serde_json::to_value(parsed)
            .map_err(|e| ModuleError::InvalidConfig(format!("failed to convert TOML: {e}")))?;
        Self::from_value(value)
    }

    /// Load a TOML config file from disk.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ModuleError::InvalidConfig(format!(
                "failed to read config file {:?}: {e}",
                path.as_ref()
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.root.insert(key.into(), value);
    }
}

impl ConfigSource for MapConfigSource {
    fn has(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.root.get(key).cloned()
    }

    fn snapshot(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

/// Deep-merge `incoming` into `base`.
///
/// Objects merge key-by-key recursively so two modules can each contribute
/// nested settings under the same root key. Anything else - scalars, arrays,
/// nulls - overwrites the base value wholesale.
pub fn deep_merge(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, incoming_value),
                    None => {
                        base_map.insert(key.clone(), incoming_value.clone());
                    }
                }
            }
        }
        (base_slot, incoming_value) => {
            *base_slot = incoming_value.clone();
        }
    }
}

/// Result-cache settings read from [`CACHE_CONFIG_KEY`]. Every field is
/// optional with a documented default.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_key")]
    pub key: String,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_adapter")]
    pub adapter: String,
}

fn default_cache_key() -> String {
    DEFAULT_CACHE_KEY.to_string()
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_cache_adapter() -> String {
    DEFAULT_CACHE_ADAPTER.to_string()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key: default_cache_key(),
            ttl_secs: default_cache_ttl(),
            adapter: default_cache_adapter(),
        }
    }
}

impl CacheSettings {
    /// Read settings from the host configuration, falling back to defaults
    /// when the key is absent.
    pub fn from_source(config: &dyn ConfigSource) -> Result<Self, ModuleError> {
        match config.get(CACHE_CONFIG_KEY) {
            None => Ok(Self::default()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                ModuleError::InvalidConfig(format!("malformed {CACHE_CONFIG_KEY} settings: {e}"))
            }),
        }
    }

    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_secs)
    }
}
