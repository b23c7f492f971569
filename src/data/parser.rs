use csv::ByteRecord;

use super::schema::ColumnLayout;
use crate::models::depth::{DepthSnapshot, PriceLevel, SnapshotTime, BOOK_DEPTH};

/// Turn one MBP-10 record into a depth snapshot.
///
/// A level is kept only when both its price and size parse and are positive.
/// Missing, empty or malformed fields degrade to an absent level; they never
/// fail the row.
pub fn parse_record(record: &ByteRecord, layout: &ColumnLayout, tick_index: u64) -> DepthSnapshot {
    let mut bids = Vec::with_capacity(BOOK_DEPTH);
    let mut asks = Vec::with_capacity(BOOK_DEPTH);

    for level in 0..BOOK_DEPTH {
        if let Some(l) = read_level(record, layout.bid_px[level], layout.bid_sz[level]) {
            bids.push(l);
        }
        if let Some(l) = read_level(record, layout.ask_px[level], layout.ask_sz[level]) {
            asks.push(l);
        }
    }

    let timestamp = layout
        .ts_event
        .and_then(|i| field_str(record, i))
        .filter(|s| !s.is_empty())
        .map(|s| SnapshotTime::Event(s.to_string()))
        .unwrap_or(SnapshotTime::Sequence(tick_index));

    DepthSnapshot::new(timestamp, tick_index, bids, asks)
}

fn read_level(record: &ByteRecord, price_col: Option<usize>, size_col: Option<usize>) -> Option<PriceLevel> {
    let price = price_col.and_then(|i| field_str(record, i)).and_then(parse_price)?;
    let size = size_col.and_then(|i| field_str(record, i)).map_or(0, parse_size);
    PriceLevel::resting(price, size)
}

fn field_str(record: &ByteRecord, index: usize) -> Option<&str> {
    record
        .get(index)
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .map(str::trim)
}

/// Decimal price, e.g. `61.700000000`. Non-finite values count as absent.
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Integer size. Decimal-formatted sizes (`500.0`) are truncated; anything
/// unparseable or negative reads as 0.
pub fn parse_size(raw: &str) -> u64 {
    if let Ok(n) = raw.parse::<u64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => f.trunc() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::canonical_header;

    fn layout() -> ColumnLayout {
        ColumnLayout::from_headers(&ByteRecord::from(canonical_header())).unwrap()
    }

    /// Canonical row with only the given (column, value) pairs filled in.
    fn row(values: &[(&str, &str)]) -> ByteRecord {
        let header = canonical_header();
        let fields: Vec<String> = header
            .iter()
            .map(|h| {
                values
                    .iter()
                    .find(|(k, _)| *k == h.as_str())
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default()
            })
            .collect();
        ByteRecord::from(fields)
    }

    #[test]
    fn test_single_level_row() {
        let rec = row(&[
            ("bid_px_00", "61.700000000"),
            ("bid_sz_00", "500"),
            ("ask_px_00", "61.720000000"),
            ("ask_sz_00", "300"),
        ]);
        let snap = parse_record(&rec, &layout(), 17);
        assert_eq!(snap.bids.len(), 1);
        assert_eq!(snap.asks.len(), 1);
        assert_eq!(snap.bids[0], PriceLevel { price: 61.70, size: 500 });
        assert!((snap.mid_price - 61.71).abs() < 1e-9);
        assert_eq!(snap.tick_index, 17);
        assert_eq!(snap.timestamp, SnapshotTime::Sequence(17));
    }

    #[test]
    fn test_ts_event_used_when_present() {
        let rec = row(&[("ts_event", "2024-03-01T14:30:00.000000001Z")]);
        let snap = parse_record(&rec, &layout(), 3);
        assert_eq!(
            snap.timestamp,
            SnapshotTime::Event("2024-03-01T14:30:00.000000001Z".into())
        );
        assert!(snap.bids.is_empty());
        assert!(snap.asks.is_empty());
        assert_eq!(snap.mid_price, 0.0);
    }

    #[test]
    fn test_non_resting_levels_excluded() {
        let rec = row(&[
            ("bid_px_00", "10.0"),
            ("bid_sz_00", "0"),
            ("bid_px_01", "0"),
            ("bid_sz_01", "5"),
            ("bid_px_02", "-1"),
            ("bid_sz_02", "5"),
            ("bid_px_03", "9.5"),
            ("bid_sz_03", "7"),
        ]);
        let snap = parse_record(&rec, &layout(), 0);
        assert_eq!(snap.bids, vec![PriceLevel { price: 9.5, size: 7 }]);
    }

    #[test]
    fn test_malformed_field_only_drops_its_level() {
        let rec = row(&[
            ("bid_px_00", "abc"),
            ("bid_sz_00", "100"),
            ("bid_px_01", "99.0"),
            ("bid_sz_01", "x12"),
            ("bid_px_02", "98.0"),
            ("bid_sz_02", "200"),
            ("ask_px_00", "101.0"),
            ("ask_sz_00", "50.0"),
        ]);
        let snap = parse_record(&rec, &layout(), 0);
        assert_eq!(snap.bids, vec![PriceLevel { price: 98.0, size: 200 }]);
        assert_eq!(snap.asks, vec![PriceLevel { price: 101.0, size: 50 }]);
        assert!((snap.mid_price - 99.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_record_reads_missing_fields_as_absent() {
        // Only ts_event and the first bid pair survive truncation.
        let rec = ByteRecord::from(vec!["t0", "50.0", "10"]);
        let snap = parse_record(&rec, &layout(), 0);
        assert_eq!(snap.bids, vec![PriceLevel { price: 50.0, size: 10 }]);
        assert!(snap.asks.is_empty());
    }

    #[test]
    fn test_parse_size_variants() {
        assert_eq!(parse_size("300"), 300);
        assert_eq!(parse_size("300.9"), 300);
        assert_eq!(parse_size("-4"), 0);
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_price("inf"), None);
        assert_eq!(parse_price("NaN"), None);
    }
}
