// File I/O: stock spreadsheets in, catalog text in, feed out

pub mod csv;
pub mod error;
pub mod repair;
pub mod source;
pub mod xlsx;

pub use error::IngestError;
pub use source::CatalogSource;

use stockfeed_recon::config::FeedFormat;
use stockfeed_recon::Table;

/// Worksheet name used for xlsx feeds.
pub const FEED_SHEET_NAME: &str = "Stocklijst";

/// Encode a feed table in the requested format.
pub fn encode_feed(table: &Table, format: FeedFormat, delimiter: u8) -> Result<Vec<u8>, String> {
    match format {
        FeedFormat::Csv => csv::export_feed(table, delimiter),
        FeedFormat::Xlsx => xlsx::export_feed(table, FEED_SHEET_NAME),
    }
}
