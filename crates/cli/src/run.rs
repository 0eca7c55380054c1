//! `stockfeed run`: ingest, reconcile, write the feed, report the delta.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde::Serialize;
use stockfeed_cli::pipeline::{feed_file_name, run_pipeline, DeltaRequest, PipelineError};
use stockfeed_cli::progress::BarProgress;
use stockfeed_cli::render::{render_delta, render_summary};
use stockfeed_io::{encode_feed, CatalogSource, IngestError};
use stockfeed_recon::config::FeedFormat;
use stockfeed_recon::{DeltaReport, ReconSummary};

use crate::config_cmd::load_config;
use crate::exit_codes::EXIT_DELTA;
use crate::CliError;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for FeedFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => FeedFormat::Csv,
            FormatArg::Xlsx => FeedFormat::Xlsx,
        }
    }
}

/// `--json` output. Key order is part of the contract.
#[derive(Serialize)]
struct RunReport<'a> {
    feed: FeedReport<'a>,
    delta: Option<&'a DeltaReport>,
}

#[derive(Serialize)]
struct FeedReport<'a> {
    path: Option<String>,
    format: &'static str,
    sheet: &'a str,
    recovered: bool,
    columns: &'a [String],
    rows: usize,
    summary: &'a ReconSummary,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stock export spreadsheet (xlsx, xls, ods)
    pub stock: PathBuf,

    /// Catalog text file, or - for stdin
    pub catalog: String,

    /// TOML config (defaults are built in; see `stockfeed config show`)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report quantity changes against the loaded catalog
    #[arg(long, conflicts_with = "previous")]
    pub diff: bool,

    /// Report quantity changes against another catalog snapshot (path, or - to read the catalog source again)
    #[arg(long, value_name = "CATALOG")]
    pub previous: Option<String>,

    /// Feed format (overrides the config)
    #[arg(long, short = 'f', value_enum)]
    pub format: Option<FormatArg>,

    /// Feed destination file, or - for stdout
    #[arg(long, short = 'o', conflicts_with = "out_dir")]
    pub output: Option<String>,

    /// Directory for the dated feed file (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Date stamp for the feed file name (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Print a JSON run report (summary + delta) on stdout
    #[arg(long)]
    pub json: bool,

    /// Only print errors
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(format) = args.format {
        config.output.format = format.into();
    }
    let format = config.output.format;

    let to_stdout = args.output.as_deref() == Some("-");
    if to_stdout && args.json {
        return Err(CliError::usage("--json and --output - both write to stdout")
            .with_hint("write the feed to a file with --output <FILE> or --out-dir <DIR>"));
    }
    if args.stock.as_os_str() == "-" {
        return Err(CliError::usage("the stock export must be a file")
            .with_hint("only the catalog can be read from stdin"));
    }

    let stock = std::fs::read(&args.stock)
        .map_err(|e| CliError::usage(format!("cannot read stock export {}: {e}", args.stock.display())))?;

    let mut catalog = CatalogSource::from_arg(&args.catalog);
    // `--previous -` always means the catalog source, never a second stdin
    let delta = match (args.diff, args.previous.as_deref()) {
        (true, _) => DeltaRequest::Snapshot,
        (false, Some("-")) => DeltaRequest::Reread,
        (false, Some(previous)) => DeltaRequest::Against(CatalogSource::from_arg(previous)),
        (false, None) => DeltaRequest::Skip,
    };
    if matches!(delta, DeltaRequest::Reread) && !catalog.is_rereadable() {
        log::warn!("{} can only be read once; the delta report will fail", catalog.describe());
    }

    let mut progress = if args.quiet || args.json { BarProgress::hidden() } else { BarProgress::new() };
    let output = run_pipeline(&config, &stock, &mut catalog, delta, &mut progress).map_err(CliError::pipeline)?;

    // config.validate() guarantees an ASCII delimiter
    let bytes = encode_feed(&output.feed.table, format, config.output.delimiter as u8)
        .map_err(|e| CliError::output(format!("cannot encode feed: {e}")))?;

    let written_to = if to_stdout {
        std::io::stdout()
            .write_all(&bytes)
            .map_err(|e| CliError::output(format!("cannot write feed to stdout: {e}")))?;
        None
    } else {
        let path = match args.output {
            Some(path) => PathBuf::from(path),
            None => {
                let date = args.date.unwrap_or_else(|| chrono::Local::now().date_naive());
                let dir = args.out_dir.unwrap_or_else(|| PathBuf::from("."));
                dir.join(feed_file_name(&config.output, format, date))
            }
        };
        write_feed(&path, &bytes)?;
        Some(path)
    };

    if !args.quiet && !args.json {
        eprintln!("{}", render_summary(&output.feed.summary));
        if let Some(path) = &written_to {
            eprintln!("wrote {}", path.display());
        }
    }

    let (report, delta_error) = match output.delta {
        None => (None, None),
        Some(Ok(report)) => (Some(report), None),
        Some(Err(e)) => (None, Some(e)),
    };

    if args.json {
        let doc = RunReport {
            feed: FeedReport {
                path: written_to.as_ref().map(|p| p.display().to_string()),
                format: format.extension(),
                sheet: &output.sheet,
                recovered: output.recovered,
                columns: output.feed.table.headers(),
                rows: output.feed.table.len(),
                summary: &output.feed.summary,
            },
            delta: report.as_ref(),
        };
        let text = serde_json::to_string_pretty(&doc)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{text}");
    } else if let Some(report) = &report {
        let text = render_delta(report);
        // Keep stdout clean when it carries the feed
        if to_stdout {
            eprint!("{text}");
        } else {
            print!("{text}");
        }
    }

    match delta_error {
        Some(e) => Err(delta_failed(e)),
        None => Ok(()),
    }
}

fn write_feed(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| CliError::output(format!("cannot create {}: {e}", dir.display())))?;
    }
    std::fs::write(path, bytes).map_err(|e| CliError::output(format!("cannot write {}: {e}", path.display())))
}

/// The feed is already written; report the delta failure under its own code.
fn delta_failed(err: PipelineError) -> CliError {
    let hint = match &err {
        PipelineError::Ingest(IngestError::NotSeekable(_)) => Some(
            "stdin can only be read once; use --diff to compare against the catalog already loaded".to_string(),
        ),
        _ => None,
    };
    CliError { code: EXIT_DELTA, message: format!("delta report failed (feed was written): {err}"), hint }
}
