//! Runtime configuration
//!
//! Hosts usually embed a `[phpval]` style TOML table in their own config
//! file and hand the body to [`Config::from_toml_str`]. Every field has a
//! default, so an empty document is valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default bound on how many reference cells a dereference will follow
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 64;

/// Default number of slots preallocated for a symbol table
pub const DEFAULT_SYMBOL_TABLE_CAPACITY: usize = 32;

/// Configuration shared by a [`SymbolTable`](crate::SymbolTable) and the
/// values it hands out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of reference cells followed before a chain is
    /// reported as `ReferenceDepth`
    pub max_reference_depth: usize,
    /// Initial slot capacity of the symbol table
    pub symbol_table_capacity: usize,
}

impl Config {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
            symbol_table_capacity: DEFAULT_SYMBOL_TABLE_CAPACITY,
        }
    }

    pub fn with_max_reference_depth(mut self, depth: usize) -> Self {
        self.max_reference_depth = depth;
        self
    }

    pub fn with_symbol_table_capacity(mut self, capacity: usize) -> Self {
        self.symbol_table_capacity = capacity;
        self
    }

    /// Parse a TOML document, filling absent fields with defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_reference_depth == 0 {
            return Err(ConfigError::invalid(
                "max_reference_depth must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_reference_depth, DEFAULT_MAX_REFERENCE_DEPTH);
        assert_eq!(config.symbol_table_capacity, DEFAULT_SYMBOL_TABLE_CAPACITY);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str("max_reference_depth = 4").unwrap();
        assert_eq!(config.max_reference_depth, 4);
        assert_eq!(config.symbol_table_capacity, DEFAULT_SYMBOL_TABLE_CAPACITY);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = Config::from_toml_str("max_reference_depth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = Config::from_toml_str("max_reference_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .with_max_reference_depth(2)
            .with_symbol_table_capacity(8);
        assert_eq!(config.max_reference_depth, 2);
        assert_eq!(config.symbol_table_capacity, 8);
    }
}
