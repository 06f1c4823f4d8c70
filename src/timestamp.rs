//! Conversions from browser-native visit timestamps to Unix epoch seconds.

/// Microseconds between 1601-01-01 (the WebKit/Chrome epoch) and 1970-01-01.
pub const CHROME_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Chrome stores microseconds since 1601-01-01 UTC.
pub fn chrome_to_unix(chrome_micros: i64) -> i64 {
    (chrome_micros - CHROME_EPOCH_OFFSET_MICROS) / MICROS_PER_SEC
}

/// Firefox stores microseconds since the Unix epoch.
pub fn firefox_to_unix(firefox_micros: i64) -> i64 {
    firefox_micros / MICROS_PER_SEC
}

/// Formats epoch seconds for CLI output.
pub fn format_epoch(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
