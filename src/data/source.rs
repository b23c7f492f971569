use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::AppError;

/// A record stream that can be opened more than once.
///
/// Ingestion reads the stream twice (count, then sample), so sources hand out
/// a fresh reader per pass instead of rewinding a shared handle.
pub trait RecordSource: Send + Sync {
    fn open(&self) -> Result<Box<dyn Read + Send>, AppError>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// CSV file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for FileSource {
    fn open(&self) -> Result<Box<dyn Read + Send>, AppError> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AppError::FileNotFound(self.path.display().to_string()),
            _ => AppError::StreamRead(format!("{}: {}", self.path.display(), e)),
        })?;
        Ok(Box::new(BufReader::with_capacity(256 * 1024, file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory CSV bytes, e.g. an uploaded body.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { bytes: bytes.into() }
    }
}

impl RecordSource for MemorySource {
    fn open(&self) -> Result<Box<dyn Read + Send>, AppError> {
        Ok(Box::new(Cursor::new(SharedBytes(self.bytes.clone()))))
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.bytes.len())
    }
}

struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Re-invokes a producer closure for every pass.
pub struct ProducerSource<F> {
    label: String,
    produce: F,
}

impl<F, R> ProducerSource<F>
where
    F: Fn() -> io::Result<R> + Send + Sync,
    R: Read + Send + 'static,
{
    pub fn new(label: impl Into<String>, produce: F) -> Self {
        Self {
            label: label.into(),
            produce,
        }
    }
}

impl<F, R> RecordSource for ProducerSource<F>
where
    F: Fn() -> io::Result<R> + Send + Sync,
    R: Read + Send + 'static,
{
    fn open(&self) -> Result<Box<dyn Read + Send>, AppError> {
        let reader = (self.produce)().map_err(|e| AppError::StreamRead(format!("{}: {}", self.label, e)))?;
        Ok(Box::new(reader))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
