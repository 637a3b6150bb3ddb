//! Configuration management for Trellis
//!
//! [`ConfigManager`] is a flat key/value store of `serde_json::Value`s filled
//! from environment variables, `.env` files and JSON/TOML documents. Later
//! loads overwrite earlier ones key by key. [`RouterSettings`] is the typed
//! view the route builder reads.
//!
//! ```
//! use trellis_config::{ConfigManager, FileFormat, RouterSettings};
//!
//! let config = ConfigManager::new();
//! config
//!     .load_str(r#"{"debug": false, "resource_param": "slug"}"#, FileFormat::Json)
//!     .unwrap();
//!
//! let settings = RouterSettings::from_config(&config).unwrap();
//! assert!(!settings.debug);
//! assert_eq!(settings.member_segment(), "/:slug");
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::RouterSettings;
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared configuration store
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager whose env loads only read `PREFIX_*` variables
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;

        let mut config = self.config.write();
        for (key, value) in env_vars {
            config.insert(key, serde_json::Value::String(value));
        }

        Ok(())
    }

    /// Load a `.env` file into the process environment, then the environment.
    ///
    /// With no path a missing `.env` in the working directory is ignored.
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::Load {
                    source_name: path.to_string(),
                    message: e.to_string(),
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    pub fn load_file(&self, path: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    /// Load a file, picking the format from its extension.
    pub fn load_file_auto(&self, path: &str) -> Result<()> {
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.merge_value(data);
        Ok(())
    }

    fn merge_value(&self, data: serde_json::Value) {
        if let serde_json::Value::Object(map) = data {
            let mut config = self.config.write();
            config.extend(map);
        }
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value =
            serde_json::to_value(value).map_err(|e| ConfigError::Serialization(e.to_string()))?;

        self.config.write().insert(key.to_string(), json_value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .config
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|_| ConfigError::Type {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Boolean value; string forms `true`/`false`/`1`/`0`/`yes`/`no` are accepted.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let value: serde_json::Value = self.get(key)?;
        match value {
            serde_json::Value::Bool(b) => Ok(b),
            serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" | "" => Ok(false),
                _ => Err(ConfigError::Type {
                    key: key.to_string(),
                    expected: "bool",
                }),
            },
            _ => Err(ConfigError::Type {
                key: key.to_string(),
                expected: "bool",
            }),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.config.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy every key from `other`, overwriting existing values.
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.config, &other.config) {
            return;
        }
        let other_config = other.config.read().clone();
        self.config.write().extend(other_config);
    }

    /// Deserialize the whole store into `T` and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let json_value = serde_json::Value::Object(
            self.config
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let validated: T = serde_json::from_value(json_value).map_err(|_| ConfigError::Type {
            key: "<root>".to_string(),
            expected: std::any::type_name::<T>(),
        })?;

        validated.validate()?;
        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("resource_param", "slug").unwrap();

        let value: String = manager.get("resource_param").unwrap();
        assert_eq!(value, "slug");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();
        let value: String = manager.get_or("missing_key", "id".to_string());
        assert_eq!(value, "id");
    }

    #[test]
    fn test_missing_key() {
        let manager = ConfigManager::new();
        assert!(matches!(
            manager.get_string("nope"),
            Err(ConfigError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_bool_coercion() {
        let manager = ConfigManager::new();
        manager.set("a", true).unwrap();
        manager.set("b", "FALSE").unwrap();
        manager.set("c", "1").unwrap();
        manager.set("d", "maybe").unwrap();
        manager.set("e", 3).unwrap();

        assert!(manager.get_bool("a").unwrap());
        assert!(!manager.get_bool("b").unwrap());
        assert!(manager.get_bool("c").unwrap());
        assert!(matches!(manager.get_bool("d"), Err(ConfigError::Type { .. })));
        assert!(manager.get_bool("e").is_err());
    }

    #[test]
    fn test_later_loads_overwrite() {
        let manager = ConfigManager::new();
        manager
            .load_str(r#"{"debug": true, "resource_param": "id"}"#, FileFormat::Json)
            .unwrap();
        manager.load_str("resource_param = \"slug\"", FileFormat::Toml).unwrap();

        assert_eq!(manager.get_string("resource_param").unwrap(), "slug");
        assert_eq!(manager.keys(), vec!["debug", "resource_param"]);
    }

    #[test]
    fn test_merge() {
        let a = ConfigManager::new();
        let b = ConfigManager::new();
        a.set("debug", true).unwrap();
        b.set("debug", false).unwrap();
        b.set("resource_param", "uuid").unwrap();

        a.merge(&b);
        a.merge(&a.clone());
        assert!(!a.get_bool("debug").unwrap());
        assert!(a.has("resource_param"));
    }

    #[test]
    fn test_load_validated() {
        let manager = ConfigManager::new();
        manager.set("resource_param", "2bad").unwrap();
        assert!(manager.load_validated::<RouterSettings>().is_err());

        manager.set("resource_param", "slug").unwrap();
        let settings: RouterSettings = manager.load_validated().unwrap();
        assert_eq!(settings.resource_param, "slug");
        assert!(settings.debug);
    }
}
