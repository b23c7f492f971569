use serde::{Deserialize, Serialize};

/// Number of price levels per side in an MBP-10 record.
pub const BOOK_DEPTH: usize = 10;

/// A single resting price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub size: u64,
}

impl PriceLevel {
    /// Build a level only if it represents a real resting order.
    pub fn resting(price: f64, size: u64) -> Option<Self> {
        if price > 0.0 && size > 0 {
            Some(Self { price, size })
        } else {
            None
        }
    }
}

/// Event time of a snapshot: the record's own `ts_event`, or its position
/// in the stream when the record carries none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotTime {
    Event(String),
    Sequence(u64),
}

/// Full 10-level bid/ask state of the book at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthSnapshot {
    pub timestamp: SnapshotTime,
    /// Absolute position in the original, unstrided record stream.
    pub tick_index: u64,
    /// Best bid first.
    pub bids: Vec<PriceLevel>,
    /// Best ask first.
    pub asks: Vec<PriceLevel>,
    pub mid_price: f64,
}

/// One row of the merged price ladder (both sides at a single price).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LadderRow {
    pub price: f64,
    pub bid_size: u64,
    pub ask_size: u64,
}

/// Best bid, best ask and spread of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopOfBook {
    pub best_bid: Option<PriceLevel>,
    pub best_ask: Option<PriceLevel>,
    pub mid_price: f64,
    pub spread: Option<f64>,
}

impl DepthSnapshot {
    /// Assemble a snapshot, deriving the mid price from the best levels.
    pub fn new(
        timestamp: SnapshotTime,
        tick_index: u64,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    ) -> Self {
        let mid_price = match (bids.first(), asks.first()) {
            (Some(bid), Some(ask)) => (bid.price + ask.price) / 2.0,
            _ => 0.0,
        };
        Self {
            timestamp,
            tick_index,
            bids,
            asks,
            mid_price,
        }
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Best ask minus best bid, when both sides are populated.
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            best_bid: self.best_bid().copied(),
            best_ask: self.best_ask().copied(),
            mid_price: self.mid_price,
            spread: self.spread(),
        }
    }

    /// Merge both sides into one ladder, highest price first.
    /// Levels quoted at the same price on both sides share a row.
    pub fn ladder(&self) -> Vec<LadderRow> {
        let mut rows: Vec<LadderRow> = self
            .bids
            .iter()
            .map(|l| LadderRow {
                price: l.price,
                bid_size: l.size,
                ask_size: 0,
            })
            .chain(self.asks.iter().map(|l| LadderRow {
                price: l.price,
                bid_size: 0,
                ask_size: l.size,
            }))
            .collect();

        rows.sort_by(|a, b| b.price.total_cmp(&a.price));

        let mut merged: Vec<LadderRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match merged.last_mut() {
                Some(last) if last.price == row.price => {
                    last.bid_size += row.bid_size;
                    last.ask_size += row.ask_size;
                }
                _ => merged.push(row),
            }
        }
        merged
    }

    /// Largest size on either side, floored at 1 (bar scaling).
    pub fn max_level_size(&self) -> u64 {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .map(|l| l.size)
            .max()
            .unwrap_or(0)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: f64, size: u64) -> PriceLevel {
        PriceLevel { price, size }
    }

    #[test]
    fn test_resting_level_filter() {
        assert!(PriceLevel::resting(61.70, 500).is_some());
        assert!(PriceLevel::resting(0.0, 500).is_none());
        assert!(PriceLevel::resting(-1.0, 500).is_none());
        assert!(PriceLevel::resting(61.70, 0).is_none());
    }

    #[test]
    fn test_mid_price_requires_both_sides() {
        let snap = DepthSnapshot::new(
            SnapshotTime::Sequence(0),
            0,
            vec![level(61.70, 500)],
            vec![level(61.72, 300)],
        );
        assert!((snap.mid_price - 61.71).abs() < 1e-9);

        let one_sided = DepthSnapshot::new(SnapshotTime::Sequence(0), 0, vec![level(61.70, 500)], vec![]);
        assert_eq!(one_sided.mid_price, 0.0);
        assert_eq!(one_sided.spread(), None);
    }

    #[test]
    fn test_top_of_book() {
        let snap = DepthSnapshot::new(
            SnapshotTime::Event("2024-01-02T14:30:00Z".into()),
            42,
            vec![level(100.0, 10), level(99.5, 20)],
            vec![level(100.5, 5)],
        );
        let top = snap.top_of_book();
        assert_eq!(top.best_bid, Some(level(100.0, 10)));
        assert_eq!(top.best_ask, Some(level(100.5, 5)));
        assert!((top.spread.unwrap() - 0.5).abs() < 1e-9);
        assert!((top.mid_price - 100.25).abs() < 1e-9);
    }

    #[test]
    fn test_ladder_sorted_and_merged() {
        let snap = DepthSnapshot::new(
            SnapshotTime::Sequence(7),
            7,
            vec![level(10.0, 3), level(9.0, 4)],
            vec![level(10.0, 1), level(11.0, 2)],
        );
        let ladder = snap.ladder();
        let prices: Vec<f64> = ladder.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![11.0, 10.0, 9.0]);
        assert_eq!(ladder[1].bid_size, 3);
        assert_eq!(ladder[1].ask_size, 1);
        assert_eq!(snap.max_level_size(), 4);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snap = DepthSnapshot::new(SnapshotTime::Sequence(3), 3, vec![], vec![]);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["tickIndex"], 3);
        assert_eq!(json["timestamp"], 3);
        assert_eq!(json["midPrice"], 0.0);
        assert_eq!(snap.max_level_size(), 1);
    }
}
