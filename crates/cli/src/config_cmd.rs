//! `stockfeed config`: print and check reconciliation configs.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use stockfeed_recon::config::Coercion;
use stockfeed_recon::ReconConfig;

use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective config as TOML (built-in defaults unless --config is given)
    #[command(after_help = "\
Examples:
  stockfeed config show > stockfeed.toml
  stockfeed config show --config ean.toml")]
    Show {
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  stockfeed config validate stockfeed.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Show { config } => {
            let config = load_config(config.as_deref())?;
            let text = config.to_toml().map_err(|e| CliError::general(e.to_string()))?;
            print!("{text}");
            Ok(())
        }
        ConfigCommands::Validate { config } => {
            let parsed = load_config(Some(&config))?;
            println!("{}: ok", config.display());
            println!(
                "  join: {} -> {}",
                parsed.join.stock_column, parsed.join.catalog_column
            );
            for col in &parsed.columns {
                let coerce = match col.coerce {
                    Coercion::Text => String::new(),
                    other => format!(" ({other})"),
                };
                println!("  column: {} -> {}{}", col.source, col.target, coerce);
            }
            println!(
                "  output: {}_<date>.{} (delimiter {:?})",
                parsed.output.file_prefix,
                parsed.output.format.extension(),
                parsed.output.delimiter
            );
            Ok(())
        }
    }
}

/// Built-in defaults, or the given TOML file parsed and validated.
pub fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read config {}: {e}", path.display())))?;
    let config = ReconConfig::from_toml(&text)
        .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}
