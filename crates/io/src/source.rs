//! Where catalog bytes come from.
//!
//! Files and in-memory buffers can be read any number of times. A stream
//! (stdin) hands out its bytes exactly once; asking again is
//! `IngestError::NotSeekable`.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use crate::error::IngestError;

pub enum CatalogSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    /// One-shot reader. `None` once consumed.
    Stream { label: String, reader: Option<Box<dyn Read>> },
}

impl CatalogSource {
    /// `-` means stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::stdin()
        } else {
            Self::Path(PathBuf::from(arg))
        }
    }

    pub fn stdin() -> Self {
        Self::Stream { label: "stdin".into(), reader: Some(Box::new(std::io::stdin())) }
    }

    pub fn stream(label: impl Into<String>, reader: impl Read + 'static) -> Self {
        Self::Stream { label: label.into(), reader: Some(Box::new(reader)) }
    }

    /// Read the whole source into memory.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, IngestError> {
        match self {
            Self::Path(path) => std::fs::read(&*path)
                .map_err(|e| IngestError::Read(format!("{}: {e}", path.display()))),
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Stream { label, reader } => {
                let mut r = reader.take().ok_or_else(|| IngestError::NotSeekable(label.clone()))?;
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)
                    .map_err(|e| IngestError::Read(format!("{label}: {e}")))?;
                Ok(buf)
            }
        }
    }

    /// Whether `read_bytes` can be called again after the first read.
    pub fn is_rereadable(&self) -> bool {
        !matches!(self, Self::Stream { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
            Self::Stream { label, .. } => label.clone(),
        }
    }
}

impl fmt::Debug for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream { label, reader } => f
                .debug_struct("Stream")
                .field("label", label)
                .field("consumed", &reader.is_none())
                .finish(),
            other => f.write_str(&other.describe()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_dash_is_stdin() {
        let source = CatalogSource::from_arg("-");
        assert!(!source.is_rereadable());
        assert_eq!(source.describe(), "stdin");

        let source = CatalogSource::from_arg("catalog.csv");
        assert!(source.is_rereadable());
        assert_eq!(source.describe(), "catalog.csv");
    }

    #[test]
    fn test_stream_reads_once() {
        let mut source = CatalogSource::stream("pipe", Cursor::new(b"product_sku\nA1\n".to_vec()));
        assert_eq!(source.read_bytes().unwrap(), b"product_sku\nA1\n");
        assert_eq!(source.read_bytes().unwrap_err(), IngestError::NotSeekable("pipe".into()));
    }

    #[test]
    fn test_bytes_and_path_reread() {
        let mut source = CatalogSource::Bytes(b"abc".to_vec());
        assert_eq!(source.read_bytes().unwrap(), b"abc");
        assert_eq!(source.read_bytes().unwrap(), b"abc");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        std::fs::write(&path, "product_sku\nA1\n").unwrap();
        let mut source = CatalogSource::Path(path);
        assert_eq!(source.read_bytes().unwrap(), source.read_bytes().unwrap());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let mut source = CatalogSource::from_arg("/definitely/not/here.csv");
        assert!(matches!(source.read_bytes(), Err(IngestError::Read(_))));
    }
}
