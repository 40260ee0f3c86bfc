use std::collections::HashMap;
use std::str::FromStr;

use crate::error::PropertyError;

/// String properties of one plugin, from its `[plugins.<name>]` config section.
#[derive(Debug, Clone, Default)]
pub struct PropertyParser {
    plugin: String,
    properties: HashMap<String, String>,
}

impl PropertyParser {
    pub fn new(plugin: &str, properties: HashMap<String, String>) -> Self {
        PropertyParser {
            plugin: plugin.to_string(),
            properties,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn get_required(&self, key: &str) -> Result<&str, PropertyError> {
        self.get(key)
            .ok_or_else(|| PropertyError::Missing(format!("{}.{}", self.plugin, key)))
    }

    pub fn parse_as<T: FromStr>(&self, key: &str) -> Result<T, PropertyError> {
        let raw = self.get_required(key)?;
        raw.trim().parse().map_err(|_| PropertyError::Invalid {
            key: format!("{}.{}", self.plugin, key),
            value: raw.to_string(),
        })
    }

    /// Like [`parse_as`](Self::parse_as), but an absent property is not an error.
    pub fn parse_as_or_default<T: FromStr>(&self, key: &str, default: T) -> Result<T, PropertyError> {
        match self.get(key) {
            Some(_) => self.parse_as(key),
            None => Ok(default),
        }
    }
}
