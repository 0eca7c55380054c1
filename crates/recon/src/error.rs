use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column list, duplicate targets, etc.).
    ConfigValidation(String),
    /// Required columns absent from an input table. Lists every missing
    /// column at once, in config order.
    Schema { table: String, missing: Vec<String> },
}

impl ReconError {
    pub fn schema(table: impl Into<String>, missing: Vec<String>) -> Self {
        Self::Schema { table: table.into(), missing }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Schema { table, missing } => {
                let quoted: Vec<String> = missing.iter().map(|c| format!("'{c}'")).collect();
                write!(
                    f,
                    "{table}: missing column{} {}",
                    if missing.len() == 1 { "" } else { "s" },
                    quoted.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ReconError {}
