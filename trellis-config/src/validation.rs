// Configuration validation

use crate::{ConfigError, Result};

/// Implemented by typed settings that check themselves after loading.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::validation(field, "cannot be empty"));
        }
        Ok(())
    }

    /// ASCII letter or underscore first, then letters, digits or underscores.
    pub fn is_identifier(value: &str, field: &str) -> Result<()> {
        let mut chars = value.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if !valid {
            return Err(ConfigError::validation(
                field,
                format!("`{}` is not a valid identifier", value),
            ));
        }
        Ok(())
    }

    pub fn one_of<T: PartialEq + std::fmt::Debug>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            return Err(ConfigError::validation(
                field,
                format!("{:?} is not one of {:?}", value, allowed),
            ));
        }
        Ok(())
    }
}
