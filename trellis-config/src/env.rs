// Prefixed environment variable source

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Reads `PREFIX_NAME` variables as lowercase `name` keys.
///
/// With prefix `TRELLIS`, `TRELLIS_RESOURCE_PARAM=slug` becomes the key
/// `resource_param`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Collect every matching variable from the process environment.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.filter(env::vars()))
    }

    /// Apply the prefix rule to an arbitrary set of variables.
    pub fn filter<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| self.strip(&key).map(|k| (k, value)))
            .collect()
    }

    fn strip(&self, key: &str) -> Option<String> {
        match &self.prefix {
            Some(prefix) => {
                let rest = key.strip_prefix(prefix.as_str())?.strip_prefix('_')?;
                (!rest.is_empty()).then(|| rest.to_lowercase())
            }
            None => Some(key.to_lowercase()),
        }
    }

    /// Read one variable, applying the prefix.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::Env)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
