//! Builder configuration.
//!
//! Configuration is immutable once built and is handed to the
//! [`AstBuilder`](crate::builder::AstBuilder) at construction. Frontends that
//! want to ship settings next to a grammar can load them from JSON.
//!
//! # Example
//!
//! ```rust
//! use yyast::config::BuilderConfig;
//!
//! let config = BuilderConfig::builder().tab_width(4).build();
//! assert_eq!(config.tab_width, 4);
//! assert_eq!(config.document_name, "yyast");
//!
//! let config = BuilderConfig::from_json_str(r#"{ "tab_width": 2 }"#).unwrap();
//! assert_eq!(config.tab_width, 2);
//! assert_eq!(config.file_table_capacity, 65536);
//! ```

use serde::{Deserialize, Serialize};

/// Settings for building one tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Columns between tab stops.
    pub tab_width: u32,
    /// Maximum number of distinct file names recorded.
    pub file_table_capacity: usize,
    /// Name of the document node wrapping the tree.
    pub document_name: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            tab_width: 8,
            file_table_capacity: 65536,
            document_name: "yyast".to_string(),
        }
    }
}

impl BuilderConfig {
    /// Create a new builder for `BuilderConfig`.
    pub fn builder() -> BuilderConfigBuilder {
        BuilderConfigBuilder::default()
    }

    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Builder for `BuilderConfig`.
#[derive(Debug, Default)]
pub struct BuilderConfigBuilder {
    config: BuilderConfig,
}

impl BuilderConfigBuilder {
    /// Set the tab width.
    pub fn tab_width(mut self, value: u32) -> Self {
        self.config.tab_width = value;
        self
    }

    /// Set the file table capacity.
    pub fn file_table_capacity(mut self, value: usize) -> Self {
        self.config.file_table_capacity = value;
        self
    }

    /// Set the document node name.
    pub fn document_name(mut self, value: impl Into<String>) -> Self {
        self.config.document_name = value.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> BuilderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuilderConfig::default();
        assert_eq!(config.tab_width, 8);
        assert_eq!(config.file_table_capacity, 65536);
        assert_eq!(config.document_name, "yyast");
    }

    #[test]
    fn test_builder() {
        let config = BuilderConfig::builder()
            .tab_width(4)
            .file_table_capacity(2)
            .document_name("tree")
            .build();

        assert_eq!(config.tab_width, 4);
        assert_eq!(config.file_table_capacity, 2);
        assert_eq!(config.document_name, "tree");
    }

    #[test]
    fn test_from_json() {
        let config = BuilderConfig::from_json_str(r#"{"document_name": "ast"}"#).unwrap();
        assert_eq!(config.document_name, "ast");
        assert_eq!(config.tab_width, 8);

        assert!(BuilderConfig::from_json_str("{ tab_width: 1 }").is_err());
    }

    #[test]
    fn test_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BuilderConfig>();
    }
}
