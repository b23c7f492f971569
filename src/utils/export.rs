use std::path::Path;

use crate::data::schema::canonical_header;
use crate::errors::AppError;
use crate::models::depth::{DepthSnapshot, PriceLevel, SnapshotTime, BOOK_DEPTH};
use crate::models::series::SampleSeries;

/// Write the retained samples back out in MBP-10 layout, with a leading
/// `tick_index` column. Absent levels are written as empty fields.
pub fn write_samples_csv(series: &SampleSeries, path: &Path) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create CSV: {}", e)))?;

    // Header
    let mut header = vec!["tick_index".to_string()];
    header.extend(canonical_header());
    wtr.write_record(&header)
        .map_err(|e| AppError::FileWrite(e.to_string()))?;

    for snap in &series.samples {
        wtr.write_record(sample_row(snap))
            .map_err(|e| AppError::FileWrite(e.to_string()))?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write `(tick_index, mid_price)` history, skipping one-sided samples.
pub fn write_mid_price_csv(series: &SampleSeries, path: &Path) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create CSV: {}", e)))?;

    wtr.write_record(["tick_index", "mid_price"])
        .map_err(|e| AppError::FileWrite(e.to_string()))?;

    for (tick, mid) in series.mid_prices() {
        if mid <= 0.0 {
            continue;
        }
        wtr.write_record([tick.to_string(), format!("{:.9}", mid)])
            .map_err(|e| AppError::FileWrite(e.to_string()))?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

fn sample_row(snap: &DepthSnapshot) -> Vec<String> {
    let mut row = Vec::with_capacity(2 + BOOK_DEPTH * 4);
    row.push(snap.tick_index.to_string());
    row.push(match &snap.timestamp {
        SnapshotTime::Event(ts) => ts.clone(),
        SnapshotTime::Sequence(_) => String::new(),
    });
    for level in 0..BOOK_DEPTH {
        push_level(&mut row, snap.bids.get(level));
        push_level(&mut row, snap.asks.get(level));
    }
    row
}

fn push_level(row: &mut Vec<String>, level: Option<&PriceLevel>) {
    match level {
        Some(l) => {
            row.push(format!("{:.9}", l.price));
            row.push(l.size.to_string());
        }
        None => {
            row.push(String::new());
            row.push(String::new());
        }
    }
}
