//! Ingest -> load catalog -> reconcile -> optional diff.
//!
//! The catalog is read and parsed once and shared by both stages unless the
//! caller explicitly asks for a second read.

use std::fmt;

use chrono::NaiveDate;
use stockfeed_io::csv::{read_catalog, CatalogTable};
use stockfeed_io::xlsx::ingest_stock;
use stockfeed_io::{CatalogSource, IngestError};
use stockfeed_recon::config::{FeedFormat, OutputConfig};
use stockfeed_recon::{diff, reconcile, DeltaReport, Progress, ReconConfig, ReconError, ReconResult, Stage};

/// What the delta step compares the feed against.
#[derive(Debug)]
pub enum DeltaRequest {
    /// No delta report.
    Skip,
    /// The catalog already loaded for reconciliation.
    Snapshot,
    /// A separate catalog snapshot.
    Against(CatalogSource),
    /// Read the primary catalog source again. Fails for one-shot sources.
    Reread,
}

impl DeltaRequest {
    pub fn is_requested(&self) -> bool {
        !matches!(self, Self::Skip)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Ingest(IngestError),
    Recon(ReconError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest(e) => write!(f, "{e}"),
            Self::Recon(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<IngestError> for PipelineError {
    fn from(e: IngestError) -> Self {
        Self::Ingest(e)
    }
}

impl From<ReconError> for PipelineError {
    fn from(e: ReconError) -> Self {
        Self::Recon(e)
    }
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub feed: ReconResult,
    /// Sheet the stock rows came from.
    pub sheet: String,
    /// Whether the stock export needed the styles repair.
    pub recovered: bool,
    pub catalog_delimiter: u8,
    /// `None` when no delta was requested. A delta failure never discards the feed.
    pub delta: Option<Result<DeltaReport, PipelineError>>,
}

/// Run the whole pipeline on an in-memory stock export.
pub fn run_pipeline(
    config: &ReconConfig,
    stock: &[u8],
    catalog_source: &mut CatalogSource,
    delta: DeltaRequest,
    progress: &mut dyn Progress,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    progress.milestone(Stage::Started);

    let ingested = ingest_stock(stock, &config.ingest)?;
    if ingested.recovered {
        log::warn!(
            "stock export needed styles repair ({} replacement(s))",
            ingested.repairs_applied
        );
    }
    progress.milestone(Stage::Ingested);

    let catalog = load_catalog(catalog_source, config)?;
    progress.milestone(Stage::CatalogLoaded);

    let feed = reconcile(&ingested.table, &catalog.table, config)?;
    log::debug!(
        "{} of {} stock rows matched the catalog ({} dropped)",
        feed.summary.matched_rows,
        feed.summary.stock_rows,
        feed.summary.dropped_rows
    );
    progress.milestone(Stage::Reconciled);

    let delta = if delta.is_requested() {
        let report = run_delta(&feed, &catalog, catalog_source, delta, config);
        if let Err(e) = &report {
            log::warn!("delta report failed: {e}");
        }
        progress.milestone(Stage::Diffed);
        Some(report)
    } else {
        None
    };

    progress.milestone(Stage::Finished);

    Ok(PipelineOutput {
        feed,
        sheet: ingested.sheet,
        recovered: ingested.recovered,
        catalog_delimiter: catalog.delimiter,
        delta,
    })
}

fn run_delta(
    feed: &ReconResult,
    catalog: &CatalogTable,
    catalog_source: &mut CatalogSource,
    request: DeltaRequest,
    config: &ReconConfig,
) -> Result<DeltaReport, PipelineError> {
    let report = match request {
        DeltaRequest::Skip | DeltaRequest::Snapshot => diff(feed, &catalog.table, config)?,
        DeltaRequest::Against(mut previous) => {
            let previous = load_catalog(&mut previous, config)?;
            diff(feed, &previous.table, config)?
        }
        DeltaRequest::Reread => {
            let reread = load_catalog(catalog_source, config)?;
            diff(feed, &reread.table, config)?
        }
    };
    log::debug!(
        "delta: {} changed of {} compared, total loss {:.2}",
        report.summary.changed,
        report.summary.compared,
        report.summary.total_loss
    );
    Ok(report)
}

fn load_catalog(source: &mut CatalogSource, config: &ReconConfig) -> Result<CatalogTable, IngestError> {
    let bytes = source.read_bytes()?;
    log::debug!("read {} catalog bytes from {}", bytes.len(), source.describe());
    read_catalog(&bytes, &config.join.catalog_column)
}

/// `<prefix>_<YYYY-MM-DD>.<ext>`
pub fn feed_file_name(output: &OutputConfig, format: FeedFormat, date: NaiveDate) -> String {
    format!("{}_{}.{}", output.file_prefix, date.format("%Y-%m-%d"), format.extension())
}
