use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::depth::DepthSnapshot;
use crate::engine::frame::to_sample_index;

/// Bounded, uniformly strided sample set produced by one ingestion.
///
/// `samples[i].tick_index == i * stride`. Never mutated once built; a new
/// ingestion replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSeries {
    pub samples: Vec<DepthSnapshot>,
    /// Record count of the original stream.
    pub total_ticks: u64,
    /// Spacing in ticks between consecutive samples, fixed at ingestion time.
    pub stride: u64,
}

impl SampleSeries {
    pub fn new(samples: Vec<DepthSnapshot>, total_ticks: u64, stride: u64) -> Self {
        Self {
            samples,
            total_ticks,
            stride: stride.max(1),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Snapshot displayed at an absolute tick.
    pub fn snapshot_at(&self, tick: u64) -> Option<&DepthSnapshot> {
        if self.samples.is_empty() {
            return None;
        }
        let index = to_sample_index(tick, self.stride, self.samples.len());
        self.samples.get(index)
    }

    /// `ceil(total_ticks / sample_count)`. Informational only: it drifts from
    /// `stride` when the final interval is short.
    pub fn derived_stride(&self) -> u64 {
        if self.samples.is_empty() || self.total_ticks == 0 {
            return 1;
        }
        self.total_ticks.div_ceil(self.samples.len() as u64)
    }

    /// Lowest and highest level price across every sample.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.samples
            .iter()
            .flat_map(|s| s.bids.iter().chain(s.asks.iter()))
            .map(|l| l.price)
            .fold(None, |acc, p| match acc {
                None => Some((p, p)),
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
            })
    }

    /// `(tick_index, mid_price)` for every sample.
    pub fn mid_prices(&self) -> Vec<(u64, f64)> {
        self.samples
            .iter()
            .map(|s| (s.tick_index, s.mid_price))
            .collect()
    }
}

/// A published series together with its identity.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: Uuid,
    pub ingested_at: DateTime<Utc>,
    pub series: SampleSeries,
}

impl Dataset {
    pub fn new(series: SampleSeries) -> Self {
        Self {
            id: Uuid::new_v4(),
            ingested_at: Utc::now(),
            series,
        }
    }

    pub fn summary(&self) -> IngestSummary {
        IngestSummary {
            dataset_id: self.id,
            ingested_at: self.ingested_at,
            total_ticks: self.series.total_ticks,
            sample_count: self.series.sample_count(),
            stride: self.series.stride,
        }
    }

    /// Query payload for the frontend.
    pub fn view(&self) -> SeriesView {
        SeriesView {
            dataset_id: self.id,
            snapshots: self.series.samples.clone(),
            total_ticks: self.series.total_ticks,
            stride: self.series.stride,
            derived_stride: self.series.derived_stride(),
            price_range: self.series.price_range(),
        }
    }
}

impl Deref for Dataset {
    type Target = SampleSeries;

    fn deref(&self) -> &Self::Target {
        &self.series
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub dataset_id: Uuid,
    pub ingested_at: DateTime<Utc>,
    pub total_ticks: u64,
    pub sample_count: usize,
    pub stride: u64,
}

/// Full series as returned by the query interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesView {
    pub dataset_id: Uuid,
    pub snapshots: Vec<DepthSnapshot>,
    pub total_ticks: u64,
    pub stride: u64,
    pub derived_stride: u64,
    pub price_range: Option<(f64, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::depth::{PriceLevel, SnapshotTime};

    fn sample(tick: u64, bid: f64, ask: f64) -> DepthSnapshot {
        DepthSnapshot::new(
            SnapshotTime::Sequence(tick),
            tick,
            vec![PriceLevel { price: bid, size: 1 }],
            vec![PriceLevel { price: ask, size: 1 }],
        )
    }

    fn series(total: u64, stride: u64) -> SampleSeries {
        let samples = (0..total)
            .step_by(stride as usize)
            .map(|t| sample(t, 100.0 + t as f64, 101.0 + t as f64))
            .collect();
        SampleSeries::new(samples, total, stride)
    }

    #[test]
    fn test_snapshot_at_maps_through_stride() {
        let s = series(25, 10);
        assert_eq!(s.sample_count(), 3);
        assert_eq!(s.snapshot_at(0).unwrap().tick_index, 0);
        assert_eq!(s.snapshot_at(19).unwrap().tick_index, 10);
        assert_eq!(s.snapshot_at(24).unwrap().tick_index, 20);
        // Past the end still lands on the last sample.
        assert_eq!(s.snapshot_at(1_000).unwrap().tick_index, 20);
    }

    #[test]
    fn test_derived_stride_is_informational() {
        // 21 ticks at stride 10 -> samples at 0, 10, 20 -> derived ceil(21/3) = 7
        let s = series(21, 10);
        assert_eq!(s.stride, 10);
        assert_eq!(s.derived_stride(), 7);
    }

    #[test]
    fn test_price_range_and_mids() {
        let s = series(3, 1);
        assert_eq!(s.price_range(), Some((100.0, 103.0)));
        let mids = s.mid_prices();
        assert_eq!(mids.len(), 3);
        assert_eq!(mids[2], (2, 102.5));

        let empty = SampleSeries::new(vec![], 0, 1);
        assert_eq!(empty.price_range(), None);
        assert!(empty.snapshot_at(0).is_none());
    }

    #[test]
    fn test_dataset_summary() {
        let ds = Dataset::new(series(25, 10));
        let summary = ds.summary();
        assert_eq!(summary.dataset_id, ds.id);
        assert_eq!(summary.total_ticks, 25);
        assert_eq!(summary.sample_count, 3);
        assert_eq!(summary.stride, 10);

        let view = ds.view();
        assert_eq!(view.snapshots.len(), 3);
        assert_eq!(view.derived_stride, 9);
    }
}
