use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Static pipeline configuration. Every section has a built-in default, so an
/// empty TOML document yields `ReconConfig::default()`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub join: JoinConfig,
    #[serde(default = "default_columns")]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub catalog: CatalogColumns,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            join: JoinConfig::default(),
            columns: default_columns(),
            catalog: CatalogColumns::default(),
            output: OutputConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JoinConfig {
    /// Identifier column in the stock export. "EAN" is the usual alternative.
    #[serde(default = "default_stock_column")]
    pub stock_column: String,
    #[serde(default = "default_catalog_column")]
    pub catalog_column: String,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            stock_column: default_stock_column(),
            catalog_column: default_catalog_column(),
        }
    }
}

fn default_stock_column() -> String {
    "Code".into()
}

fn default_catalog_column() -> String {
    "product_sku".into()
}

// ---------------------------------------------------------------------------
// Output schema
// ---------------------------------------------------------------------------

/// One output column: which stock column feeds it, what it is called in the
/// feed, and how its values are coerced.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ColumnSpec {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub coerce: Coercion,
}

impl ColumnSpec {
    pub fn new(source: &str, target: &str, coerce: Coercion) -> Self {
        Self { source: source.into(), target: target.into(), coerce }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Display string, passed through unchanged.
    #[default]
    Text,
    /// Non-negative integer; unparsable values become 0.
    Quantity,
    /// Float; unparsable values become 0.
    Decimal,
}

impl std::fmt::Display for Coercion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Quantity => write!(f, "quantity"),
            Self::Decimal => write!(f, "decimal"),
        }
    }
}

fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("Code", "product_sku", Coercion::Text),
        ColumnSpec::new("Omschrijving", "name", Coercion::Text),
        ColumnSpec::new("Voorraad", "quantity", Coercion::Quantity),
    ]
}

// ---------------------------------------------------------------------------
// Catalog columns used by the delta report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogColumns {
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_price_column")]
    pub price_column: String,
    /// Quantity as last published; the "before" side of the delta.
    #[serde(default = "default_quantity_column")]
    pub quantity_column: String,
    #[serde(default = "default_placeholder_name")]
    pub placeholder_name: String,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            name_column: default_name_column(),
            price_column: default_price_column(),
            quantity_column: default_quantity_column(),
            placeholder_name: default_placeholder_name(),
        }
    }
}

fn default_name_column() -> String {
    "name".into()
}

fn default_price_column() -> String {
    "price".into()
}

fn default_quantity_column() -> String {
    "quantity".into()
}

fn default_placeholder_name() -> String {
    "no name".into()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default)]
    pub format: FeedFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            file_prefix: default_file_prefix(),
            format: FeedFormat::default(),
        }
    }
}

fn default_delimiter() -> char {
    ';'
}

fn default_file_prefix() -> String {
    "Gefilterde_Stocklijst".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    #[default]
    Csv,
    Xlsx,
}

impl FeedFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

impl std::fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Byte-level substitutions applied to the workbook's styles part, before
    /// the read when a `find` token is present and otherwise after a failed
    /// direct read.
    #[serde(default = "default_repairs")]
    pub repairs: Vec<TokenRepair>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { repairs: default_repairs() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenRepair {
    pub find: String,
    pub replace: String,
}

fn default_repairs() -> Vec<TokenRepair> {
    vec![TokenRepair { find: "xfid=".into(), replace: "xfId=".into() }]
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.join.stock_column.trim().is_empty() || self.join.catalog_column.trim().is_empty() {
            return Err(ReconError::ConfigValidation("join columns must not be empty".into()));
        }

        if self.columns.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one output column is required".into(),
            ));
        }

        let mut targets = HashSet::new();
        for col in &self.columns {
            if col.source.is_empty() || col.target.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "column source and target must not be empty".into(),
                ));
            }
            if !targets.insert(col.target.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate output column '{}'",
                    col.target
                )));
            }
        }

        // The feed must carry the identifier so the delta step can join on it
        if self.identifier_column().is_none() {
            return Err(ReconError::ConfigValidation(format!(
                "join column '{}' must be listed as a column source",
                self.join.stock_column
            )));
        }

        let quantities = self.columns.iter().filter(|c| c.coerce == Coercion::Quantity).count();
        if quantities > 1 {
            return Err(ReconError::ConfigValidation(format!(
                "at most one quantity column is allowed, found {quantities}"
            )));
        }

        let d = self.output.delimiter;
        if !d.is_ascii() || matches!(d, '"' | '\n' | '\r') {
            return Err(ReconError::ConfigValidation(format!(
                "output delimiter must be a single ASCII character other than quote or newline, got {d:?}"
            )));
        }

        if self.output.file_prefix.trim().is_empty() {
            return Err(ReconError::ConfigValidation("output file_prefix must not be empty".into()));
        }

        if self.ingest.repairs.iter().any(|r| r.find.is_empty()) {
            return Err(ReconError::ConfigValidation("repair 'find' token must not be empty".into()));
        }

        Ok(())
    }

    /// Output column carrying the join identifier.
    pub fn identifier_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.source == self.join.stock_column)
    }

    /// Output column holding the (new) stock quantity, if any.
    pub fn quantity_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.coerce == Coercion::Quantity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[join]
stock_column = "EAN"
catalog_column = "sku"

[[columns]]
source = "EAN"
target = "sku"

[[columns]]
source = "Naam"
target = "title"

[[columns]]
source = "Aantal"
target = "stock"
coerce = "quantity"

[[columns]]
source = "Prijs"
target = "price"
coerce = "decimal"

[catalog]
name_column = "title"
price_column = "price_incl"
quantity_column = "stock"

[output]
delimiter = ","
file_prefix = "feed"
format = "xlsx"

[[ingest.repairs]]
find = "biltinId="
replace = "builtinId="
"#;

    #[test]
    fn empty_document_is_default() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config, ReconConfig::default());
        assert_eq!(config.join.stock_column, "Code");
        assert_eq!(config.join.catalog_column, "product_sku");
        assert_eq!(config.output.delimiter, ';');
        assert_eq!(config.output.format, FeedFormat::Csv);
        assert_eq!(config.catalog.placeholder_name, "no name");
        assert_eq!(config.ingest.repairs.len(), 1);
    }

    #[test]
    fn parse_full_config() {
        let config = ReconConfig::from_toml(FULL).unwrap();
        assert_eq!(config.join.stock_column, "EAN");
        assert_eq!(config.columns.len(), 4);
        assert_eq!(config.columns[1].coerce, Coercion::Text);
        assert_eq!(config.quantity_column().unwrap().target, "stock");
        assert_eq!(config.identifier_column().unwrap().target, "sku");
        assert_eq!(config.catalog.price_column, "price_incl");
        assert_eq!(config.catalog.placeholder_name, "no name");
        assert_eq!(config.output.format, FeedFormat::Xlsx);
        assert_eq!(config.ingest.repairs[0].find, "biltinId=");
    }

    #[test]
    fn default_config_roundtrips_through_toml() {
        let text = ReconConfig::default().to_toml().unwrap();
        assert!(text.contains("[[columns]]"));
        let parsed = ReconConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, ReconConfig::default());
    }

    #[test]
    fn reject_unknown_coercion() {
        let input = r#"
[[columns]]
source = "Code"
target = "sku"
coerce = "integer"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_missing_identifier_column() {
        let input = r#"
[[columns]]
source = "Naam"
target = "name"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("join column 'Code'"));
    }

    #[test]
    fn reject_duplicate_targets() {
        let input = r#"
[[columns]]
source = "Code"
target = "sku"

[[columns]]
source = "EAN"
target = "sku"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("duplicate output column 'sku'"));
    }

    #[test]
    fn reject_two_quantity_columns() {
        let input = r#"
[[columns]]
source = "Code"
target = "sku"

[[columns]]
source = "A"
target = "a"
coerce = "quantity"

[[columns]]
source = "B"
target = "b"
coerce = "quantity"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("at most one quantity column"));
    }

    #[test]
    fn reject_non_ascii_delimiter() {
        let input = r#"
[output]
delimiter = "§"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("output delimiter"));
    }
}
