use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

use csv::{ByteRecord, Reader, ReaderBuilder};
use serde::Serialize;
use tracing::{info, warn};

use super::parser::parse_record;
use super::schema::ColumnLayout;
use super::source::RecordSource;
use super::stride::{compute_stride, sample_count};
use crate::errors::AppError;
use crate::models::config::PlayerConfig;
use crate::models::series::SampleSeries;

/// Rows between cancellation checks, independent of the progress cadence.
const CANCEL_CHECK_EVERY: u64 = 1024;

/// Which pass over the stream is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestPhase {
    Counting,
    Sampling,
}

/// Progress report emitted every `progress_every` rows and at the end of each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestProgress {
    pub phase: IngestPhase,
    pub rows_read: u64,
    /// Known only once counting has finished.
    pub total_rows: Option<u64>,
    pub samples: u64,
}

impl IngestProgress {
    /// Completion of the sampling pass in percent. `None` while counting,
    /// when the total is not known yet.
    pub fn percent(&self) -> Option<u8> {
        match (self.phase, self.total_rows) {
            (IngestPhase::Sampling, Some(total)) if total > 0 => {
                Some((self.rows_read.saturating_mul(100) / total).min(100) as u8)
            }
            (IngestPhase::Sampling, _) => Some(0),
            (IngestPhase::Counting, _) => None,
        }
    }
}

/// Ingestion parameters.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub sample_budget: usize,
    pub progress_every: u64,
}

impl From<&PlayerConfig> for IngestOptions {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            sample_budget: config.sample_budget,
            progress_every: config.progress_every,
        }
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&PlayerConfig::default())
    }
}

/// Downsample a record stream into at most `sample_budget` snapshots.
///
/// Pass 1 counts records. Pass 2 reopens the source and parses only rows
/// whose index is a multiple of the stride; other rows are framed by the CSV
/// reader and dropped without touching their fields. Any read failure fails
/// the whole ingestion; nothing partial is returned.
pub fn ingest(
    source: &dyn RecordSource,
    options: IngestOptions,
    cancel_flag: &AtomicBool,
    progress_callback: impl Fn(IngestProgress),
) -> Result<SampleSeries, AppError> {
    let every = options.progress_every.max(1);
    info!("Starting ingestion of {}", source.describe());

    // ── Pass 1: count ──
    check_cancelled(cancel_flag)?;
    let mut reader = open_reader(source)?;
    let headers = reader.byte_headers()?.clone();
    if headers.is_empty() {
        return Err(AppError::EmptyDataset);
    }
    let layout = ColumnLayout::from_headers(&headers)?;
    let missing = layout.missing_columns();
    if !missing.is_empty() {
        warn!(
            "{} of 40 level columns missing, treated as empty: {}",
            missing.len(),
            missing.join(", ")
        );
    }

    let mut record = ByteRecord::new();
    let mut total_rows: u64 = 0;
    while reader.read_byte_record(&mut record)? {
        total_rows += 1;
        if total_rows % CANCEL_CHECK_EVERY == 0 {
            check_cancelled(cancel_flag)?;
        }
        if total_rows % every == 0 {
            info!("Counting... {} rows", total_rows);
            progress_callback(IngestProgress {
                phase: IngestPhase::Counting,
                rows_read: total_rows,
                total_rows: None,
                samples: 0,
            });
        }
    }
    drop(reader);

    if total_rows == 0 {
        return Err(AppError::EmptyDataset);
    }
    progress_callback(IngestProgress {
        phase: IngestPhase::Counting,
        rows_read: total_rows,
        total_rows: Some(total_rows),
        samples: 0,
    });

    let stride = compute_stride(total_rows, options.sample_budget);
    info!(
        "Total rows: {}. Using stride of {} to get ~{} samples",
        total_rows,
        stride,
        sample_count(total_rows, stride)
    );

    // ── Pass 2: sample ──
    check_cancelled(cancel_flag)?;
    let mut reader = open_reader(source)?;
    let layout_again = ColumnLayout::from_headers(reader.byte_headers()?)?;
    if layout_again != layout {
        return Err(AppError::StreamRead("header changed between passes".into()));
    }

    let mut samples = Vec::with_capacity(sample_count(total_rows, stride) as usize);
    let mut row_index: u64 = 0;
    while reader.read_byte_record(&mut record)? {
        if row_index % stride == 0 {
            samples.push(parse_record(&record, &layout, row_index));
        }
        row_index += 1;
        if row_index % CANCEL_CHECK_EVERY == 0 {
            check_cancelled(cancel_flag)?;
        }
        if row_index % every == 0 {
            info!(
                "Processing... {}/{} rows, {} samples",
                row_index,
                total_rows,
                samples.len()
            );
            progress_callback(IngestProgress {
                phase: IngestPhase::Sampling,
                rows_read: row_index,
                total_rows: Some(total_rows),
                samples: samples.len() as u64,
            });
        }
    }

    if row_index != total_rows {
        return Err(AppError::StreamRead(format!(
            "record count changed between passes: {} then {}",
            total_rows, row_index
        )));
    }

    progress_callback(IngestProgress {
        phase: IngestPhase::Sampling,
        rows_read: row_index,
        total_rows: Some(total_rows),
        samples: samples.len() as u64,
    });
    info!(
        "Done! Stored {} samples from {} total ticks",
        samples.len(),
        total_rows
    );

    Ok(SampleSeries::new(samples, total_rows, stride))
}

fn open_reader(source: &dyn RecordSource) -> Result<Reader<Box<dyn Read + Send>>, AppError> {
    let inner = source.open()?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(inner))
}

fn check_cancelled(cancel_flag: &AtomicBool) -> Result<(), AppError> {
    if cancel_flag.load(Ordering::Relaxed) {
        info!("Ingestion cancelled");
        return Err(AppError::IngestionCancelled);
    }
    Ok(())
}
