//! Adapter configuration.
//!
//! Settings are plain fields on [`AdapterConfig`], threaded into each
//! component at construction. Nothing here is global: two adapters can run
//! with different settings side by side.

use pgdialect_sql::BinaryEscape;
use serde::Deserialize;

use crate::{Error, Result};

/// PostgreSQL's historical maximum number of indexed columns.
pub const DEFAULT_MULTI_COLUMN_INDEX_LIMIT: usize = 32;

/// Precision reported for `money` columns (enough for its 8-byte range).
pub const DEFAULT_MONEY_PRECISION: u32 = 19;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    /// Precision reported for `money` columns.
    pub money_precision: u32,

    /// How many key positions index reconstruction considers. Zero is
    /// rejected by [`AdapterConfig::validate`] and treated as one by the
    /// adapter.
    pub multi_column_index_limit: usize,

    /// Comma-separated schemas searched for indexes. When unset, the
    /// server's `search_path` is used.
    pub schema_search_path: Option<String>,

    /// Backslash style for bytea literals.
    pub binary_escape: BinaryEscapeMode,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            money_precision: DEFAULT_MONEY_PRECISION,
            multi_column_index_limit: DEFAULT_MULTI_COLUMN_INDEX_LIMIT,
            schema_search_path: None,
            binary_escape: BinaryEscapeMode::Standard,
        }
    }
}

/// Serializable mirror of [`BinaryEscape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryEscapeMode {
    #[default]
    Standard,
    Legacy,
}

impl From<BinaryEscapeMode> for BinaryEscape {
    fn from(mode: BinaryEscapeMode) -> Self {
        match mode {
            BinaryEscapeMode::Standard => BinaryEscape::Standard,
            BinaryEscapeMode::Legacy => BinaryEscape::Legacy,
        }
    }
}

impl AdapterConfig {
    /// Parse a TOML document, e.g.
    ///
    /// ```toml
    /// money_precision = 10
    /// multi_column_index_limit = 16
    /// schema_search_path = "app, public"
    /// binary_escape = "legacy"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.multi_column_index_limit == 0 {
            return Err(Error::Config(
                "multi_column_index_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_money_precision(mut self, precision: u32) -> Self {
        self.money_precision = precision;
        self
    }

    pub fn with_multi_column_index_limit(mut self, limit: usize) -> Self {
        self.multi_column_index_limit = limit;
        self
    }

    pub fn with_schema_search_path(mut self, path: impl Into<String>) -> Self {
        self.schema_search_path = Some(path.into());
        self
    }

    pub fn with_binary_escape(mut self, mode: BinaryEscapeMode) -> Self {
        self.binary_escape = mode;
        self
    }

    pub fn binary_escape(&self) -> BinaryEscape {
        self.binary_escape.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.money_precision, 19);
        assert_eq!(config.multi_column_index_limit, 32);
        assert_eq!(config.schema_search_path, None);
        assert_eq!(config.binary_escape(), BinaryEscape::Standard);
    }

    #[test]
    fn test_from_toml() {
        let config = AdapterConfig::from_toml_str(
            r#"
            money_precision = 10
            schema_search_path = "app, public"
            binary_escape = "legacy"
            "#,
        )
        .unwrap();
        assert_eq!(config.money_precision, 10);
        assert_eq!(config.multi_column_index_limit, 32);
        assert_eq!(config.schema_search_path.as_deref(), Some("app, public"));
        assert_eq!(config.binary_escape(), BinaryEscape::Legacy);
    }

    #[test]
    fn test_from_toml_rejects_bad_input() {
        assert!(matches!(
            AdapterConfig::from_toml_str("multi_column_index_limit = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            AdapterConfig::from_toml_str("no_such_setting = true"),
            Err(Error::Config(_))
        ));
    }
}
