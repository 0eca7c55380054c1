// stockfeed CLI - filter a stock export down to catalog products

mod config_cmd;
mod exit_codes;
mod run;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stockfeed_cli::pipeline::PipelineError;
use stockfeed_io::IngestError;

use exit_codes::{pipeline_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_OUTPUT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stockfeed")]
#[command(about = "Reconcile a warehouse stock export against a product catalog")]
#[command(version)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the stock export to catalog products and write the feed
    #[command(after_help = "\
Exit codes: 0 ok, 2 usage, 3 unreadable input, 4 missing columns, 5 bad config,
6 feed not written, 7 delta failed (feed was written).

Examples:
  stockfeed run voorraad.xlsx catalog.csv
  stockfeed run voorraad.xlsx catalog.csv --diff
  stockfeed run voorraad.xlsx catalog.csv --previous last-week.csv --json
  stockfeed run voorraad.xlsx catalog.csv --format xlsx --out-dir feeds/
  curl -s https://shop.example/catalog.csv | stockfeed run voorraad.xlsx - --diff
  stockfeed run voorraad.xlsx catalog.csv --config ean.toml -o - > feed.csv")]
    Run(run::RunArgs),

    /// Inspect or check reconciliation configs
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let quiet = matches!(&cli.command, Commands::Run(args) if args.quiet);
    init_logging(cli.verbose, quiet);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Config { command } => config_cmd::cmd_config(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Info by default, warnings only with `--quiet`, debug with `--verbose`.
/// `RUST_LOG` replaces the default unless `--verbose` is given.
fn init_logging(verbose: bool, quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));
    builder.format_timestamp(None);
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self { code: EXIT_OUTPUT, message: msg.into(), hint: None }
    }

    /// Create error from a pipeline failure with the matching exit code.
    pub fn pipeline(err: PipelineError) -> Self {
        let code = pipeline_exit_code(&err);
        let hint = match &err {
            PipelineError::Ingest(IngestError::Unreadable { .. }) => {
                Some("re-export the stock list as .xlsx from the inventory system".to_string())
            }
            PipelineError::Ingest(IngestError::Catalog { .. }) => {
                Some("the catalog must be comma- or semicolon-separated text with a header row".to_string())
            }
            PipelineError::Ingest(IngestError::NotSeekable(_)) => Some(
                "stdin can only be read once; save the catalog to a file or use --diff".to_string(),
            ),
            PipelineError::Recon(stockfeed_recon::ReconError::Schema { table, .. }) if table == "stock" => {
                Some("column names are matched exactly; check [[columns]] source names in the config".to_string())
            }
            PipelineError::Recon(stockfeed_recon::ReconError::Schema { table, .. }) if table == "catalog" => {
                Some("the catalog header must contain the [join] catalog_column; check the catalog's first line".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
