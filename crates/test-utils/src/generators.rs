//! Test data generators for creating synthetic station data.
//!
//! These generators create predictable, verifiable sample patterns that can
//! be used across the test suite.

use chrono::DateTime;

use crate::fixtures::AwsxRow;

/// Format a Unix timestamp the way MySQL stores a `DATETIME`.
///
/// ```
/// use test_utils::format_create_stamp;
///
/// assert_eq!(format_create_stamp(1_700_000_000), "2023-11-14 22:13:20");
/// ```
pub fn format_create_stamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .expect("timestamp out of range")
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// `count` timestamps one minute apart, oldest first, starting at `start`.
///
/// ```
/// use test_utils::minute_series;
///
/// assert_eq!(minute_series(0, 3), vec![0, 60, 120]);
/// ```
pub fn minute_series(start: i64, count: usize) -> Vec<i64> {
    (0..count as i64).map(|i| start + i * 60).collect()
}

/// One `awsx` row per minute with values that encode the row index.
///
/// For row `i`: `wind_max = 5 + i`, `wind_avg = 3 + i`, `wind_min = 1 + i`,
/// `wind_dir = 180 + i`, `temp_avg = 10 + i / 2`, `humidity = 60`,
/// `air_pressure = 1013`, `wind_stability = 12`.
pub fn awsx_minute_rows(station: &str, start: i64, count: usize) -> Vec<AwsxRow> {
    minute_series(start, count)
        .into_iter()
        .enumerate()
        .map(|(i, timestamp)| {
            let i = i as f64;
            AwsxRow {
                station: station.to_string(),
                timestamp,
                wind_max: Some(5.0 + i),
                wind_avg: Some(3.0 + i),
                wind_min: Some(1.0 + i),
                wind_dir: Some(180.0 + i),
                wind_stability: Some(12.0),
                temp_avg: Some(10.0 + i / 2.0),
                humidity: Some(60.0),
                air_pressure: Some(1013.0),
            }
        })
        .collect()
}
