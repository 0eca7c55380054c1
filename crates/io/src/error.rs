use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// Zero input bytes.
    EmptySource,
    /// Workbook opened but lists no sheets.
    NoSheets,
    /// First sheet has no header row.
    NoHeader,
    /// Header present, no data rows below it.
    NoDataRows,
    /// Both the direct read and the repair-then-read attempt failed.
    Unreadable { direct: String, repair: String },
    /// Catalog text could not be parsed with any candidate delimiter.
    Catalog { attempts: Vec<String> },
    /// A one-shot source was asked for its bytes a second time.
    NotSeekable(String),
    /// IO error reading a source.
    Read(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySource => write!(f, "stock export is empty"),
            Self::NoSheets => write!(f, "stock export contains no sheets"),
            Self::NoHeader => write!(f, "stock export has no header row"),
            Self::NoDataRows => write!(f, "stock export has a header but no data rows"),
            Self::Unreadable { direct, repair } => {
                write!(f, "cannot read stock export: {direct} (after style repair: {repair})")
            }
            Self::Catalog { attempts } => {
                write!(f, "cannot parse catalog: {}", attempts.join("; "))
            }
            Self::NotSeekable(what) => {
                write!(f, "{what} cannot be read a second time (source is not seekable)")
            }
            Self::Read(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for IngestError {}
