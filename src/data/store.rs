use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::info;

use crate::models::series::{Dataset, SampleSeries};

/// Holds the active dataset. Publishing swaps a whole `Arc`, so readers
/// always see either the previous dataset or the new one, never a mix.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    active: ArcSwapOption<Dataset>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            active: ArcSwapOption::empty(),
        }
    }

    /// Replace the active dataset.
    pub fn publish(&self, series: SampleSeries) -> Arc<Dataset> {
        let dataset = Arc::new(Dataset::new(series));
        self.active.store(Some(dataset.clone()));
        info!(
            "Published dataset {}: {} samples, {} ticks, stride {}",
            dataset.id,
            dataset.sample_count(),
            dataset.total_ticks,
            dataset.stride
        );
        dataset
    }

    /// Active dataset, or `None` before the first successful ingestion.
    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.active.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::depth::{DepthSnapshot, SnapshotTime};
    use std::thread;

    fn series(total: u64, stride: u64) -> SampleSeries {
        let samples = (0..total)
            .step_by(stride as usize)
            .map(|t| DepthSnapshot::new(SnapshotTime::Sequence(t), t, vec![], vec![]))
            .collect();
        SampleSeries::new(samples, total, stride)
    }

    #[test]
    fn test_empty_until_published() {
        let store = SnapshotStore::new();
        assert!(store.current().is_none());

        let published = store.publish(series(10, 1));
        let current = store.current().unwrap();
        assert_eq!(current.id, published.id);
        assert_eq!(current.total_ticks, 10);
    }

    #[test]
    fn test_publish_replaces_wholesale() {
        let store = SnapshotStore::new();
        let first = store.publish(series(10, 1));
        let held = store.current().unwrap();
        let second = store.publish(series(100, 10));

        // A reader holding the old dataset keeps a consistent view of it.
        assert_eq!(held.id, first.id);
        assert_eq!(held.sample_count(), 10);
        assert_eq!(store.current().unwrap().id, second.id);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_series() {
        let store = Arc::new(SnapshotStore::new());
        store.publish(series(100, 1));

        let reader = {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..10_000 {
                    let ds = store.current().unwrap();
                    // Each published series satisfies count == ceil(total / stride).
                    assert_eq!(ds.sample_count() as u64, ds.total_ticks.div_ceil(ds.stride));
                }
            })
        };
        for i in 0..200u64 {
            store.publish(series(100 + i, 1 + i % 7));
        }
        reader.join().unwrap();
    }
}
