use csv::ByteRecord;

use crate::errors::AppError;
use crate::models::depth::BOOK_DEPTH;

/// Event timestamp column in MBP-10 exports.
pub const TS_EVENT_COLUMN: &str = "ts_event";

pub fn bid_price_column(level: usize) -> String {
    format!("bid_px_{:02}", level)
}

pub fn bid_size_column(level: usize) -> String {
    format!("bid_sz_{:02}", level)
}

pub fn ask_price_column(level: usize) -> String {
    format!("ask_px_{:02}", level)
}

pub fn ask_size_column(level: usize) -> String {
    format!("ask_sz_{:02}", level)
}

/// Field positions of the MBP-10 columns within a record, resolved from the
/// header row. Absent columns stay `None` and read as empty levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub ts_event: Option<usize>,
    pub bid_px: [Option<usize>; BOOK_DEPTH],
    pub bid_sz: [Option<usize>; BOOK_DEPTH],
    pub ask_px: [Option<usize>; BOOK_DEPTH],
    pub ask_sz: [Option<usize>; BOOK_DEPTH],
}

impl ColumnLayout {
    /// Resolve column positions by name. Fails only when the header carries
    /// none of the level columns, i.e. the file is not MBP-10 at all.
    pub fn from_headers(headers: &ByteRecord) -> Result<Self, AppError> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| trim_ascii(h) == name.as_bytes())
        };

        let mut layout = ColumnLayout {
            ts_event: position(TS_EVENT_COLUMN),
            bid_px: [None; BOOK_DEPTH],
            bid_sz: [None; BOOK_DEPTH],
            ask_px: [None; BOOK_DEPTH],
            ask_sz: [None; BOOK_DEPTH],
        };
        for level in 0..BOOK_DEPTH {
            layout.bid_px[level] = position(&bid_price_column(level));
            layout.bid_sz[level] = position(&bid_size_column(level));
            layout.ask_px[level] = position(&ask_price_column(level));
            layout.ask_sz[level] = position(&ask_size_column(level));
        }

        if layout.level_column_count() == 0 {
            return Err(AppError::InvalidCsvFormat(
                "no MBP-10 level columns (bid_px_00 .. ask_sz_09) in header".into(),
            ));
        }
        Ok(layout)
    }

    /// Number of level columns (of the 40 expected) present in the header.
    pub fn level_column_count(&self) -> usize {
        [&self.bid_px, &self.bid_sz, &self.ask_px, &self.ask_sz]
            .iter()
            .map(|cols| cols.iter().filter(|c| c.is_some()).count())
            .sum()
    }

    /// Names of expected level columns the header lacks.
    pub fn missing_columns(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for level in 0..BOOK_DEPTH {
            let expected = [
                (self.bid_px[level], bid_price_column(level)),
                (self.bid_sz[level], bid_size_column(level)),
                (self.ask_px[level], ask_price_column(level)),
                (self.ask_sz[level], ask_size_column(level)),
            ];
            missing.extend(
                expected
                    .into_iter()
                    .filter(|(pos, _)| pos.is_none())
                    .map(|(_, name)| name),
            );
        }
        missing
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Full MBP-10 header in canonical order, `ts_event` first.
pub fn canonical_header() -> Vec<String> {
    let mut header = vec![TS_EVENT_COLUMN.to_string()];
    for level in 0..BOOK_DEPTH {
        header.push(bid_price_column(level));
        header.push(bid_size_column(level));
        header.push(ask_price_column(level));
        header.push(ask_size_column(level));
    }
    header
}
