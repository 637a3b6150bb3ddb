// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
            FileFormat::Env => "env",
        }
    }
}

/// Parses a configuration document into a JSON object
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file extension.
    pub fn auto(path: &str) -> Result<Self> {
        let ext = Path::new(path)
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::Load {
                source_name: path.to_string(),
                message: "no file extension".to_string(),
            })?;

        let format = FileFormat::from_extension(ext).ok_or_else(|| ConfigError::Load {
            source_name: path.to_string(),
            message: format!("unsupported format `{}`", ext),
        })?;

        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: &str) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Load {
            source_name: path.to_string(),
            message: e.to_string(),
        })?;

        self.parse(&content)
    }

    /// Parse a document. The top level must be a table/object.
    pub fn parse(&self, content: &str) -> Result<Value> {
        let value = match self.format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| self.parse_error(e))?,
            FileFormat::Toml => {
                let table: toml::Table = toml::from_str(content).map_err(|e| self.parse_error(e))?;
                serde_json::to_value(table)
                    .map_err(|e| ConfigError::Serialization(e.to_string()))?
            }
            FileFormat::Env => parse_env(content),
        };

        if !value.is_object() {
            return Err(ConfigError::Parse {
                format: self.format.as_str(),
                message: "top level must be an object".to_string(),
            });
        }
        Ok(value)
    }

    fn parse_error(&self, e: impl std::fmt::Display) -> ConfigError {
        ConfigError::Parse {
            format: self.format.as_str(),
            message: e.to_string(),
        }
    }
}

/// `KEY=value` lines; keys are lowercased, quotes stripped, `#` starts a comment.
fn parse_env(content: &str) -> Value {
    let mut map = serde_json::Map::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            map.insert(key.trim().to_lowercase(), Value::String(value.to_string()));
        }
    }

    Value::Object(map)
}
