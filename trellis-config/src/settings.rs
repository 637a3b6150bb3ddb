//! Typed settings consumed by the route builder

use crate::{ConfigManager, ConfigValidator, Result, Validate};
use serde::{Deserialize, Serialize};

/// Route builder settings.
///
/// | key              | env var                  | default |
/// |------------------|--------------------------|---------|
/// | `debug`          | `TRELLIS_DEBUG`          | `true`  |
/// | `resource_param` | `TRELLIS_RESOURCE_PARAM` | `id`    |
///
/// `debug` enables the `Route : METHOD\tpath` line for every registered route.
/// `resource_param` names the member segment resources use when a declaration
/// does not override it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    pub debug: bool,
    pub resource_param: String,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            debug: true,
            resource_param: "id".to_string(),
        }
    }
}

impl RouterSettings {
    /// Read settings from a manager, falling back to defaults per key.
    ///
    /// `debug` accepts booleans or the strings `true`/`false`/`1`/`0`, since
    /// environment sources only produce strings.
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        let defaults = Self::default();

        let debug = if config.has("debug") {
            config.get_bool("debug")?
        } else {
            defaults.debug
        };

        let resource_param = if config.has("resource_param") {
            config.get_string("resource_param")?
        } else {
            defaults.resource_param
        };

        let settings = Self {
            debug,
            resource_param: resource_param.trim().to_string(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load `TRELLIS_*` variables (and `.env` when present) into fresh settings.
    pub fn from_env() -> Result<Self> {
        let config = ConfigManager::with_prefix("TRELLIS");
        config.load_dotenv(None)?;
        Self::from_config(&config)
    }

    /// `/:param` member segment for resource routes
    pub fn member_segment(&self) -> String {
        format!("/:{}", self.resource_param)
    }
}

impl Validate for RouterSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.resource_param, "resource_param")?;
        ConfigValidator::is_identifier(&self.resource_param, "resource_param")
    }
}
