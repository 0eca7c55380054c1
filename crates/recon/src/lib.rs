//! `stockfeed-recon`: stock-to-catalog reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the filtered feed
//! and the optional delta report. No CLI or IO dependencies.

pub mod coerce;
pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod model;
pub mod progress;
pub mod schema;
pub mod table;

pub use config::ReconConfig;
pub use delta::diff;
pub use engine::reconcile;
pub use error::ReconError;
pub use model::{DeltaReport, DeltaRow, ReconResult, ReconSummary};
pub use progress::{NoProgress, Progress, Stage};
pub use table::{Table, Value};
