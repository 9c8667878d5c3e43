//! CSV data source.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use backtest_core::error::DataError;
use backtest_core::traits::BarProvider;
use backtest_core::types::{Bar, Timeframe};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(
        alias = "Date",
        alias = "date",
        alias = "timestamp",
        alias = "Timestamp",
        alias = "open_time",
        alias = "time"
    )]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// CSV data source for historical bars.
///
/// One file holds one instrument at one interval; the symbol and timeframe
/// passed to [`BarProvider::fetch_bars`] are only used for logging.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
}

impl CsvDataSource {
    /// Create a new CSV data source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::Internal(format!(
                "CSV file not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all bars, sorted by timestamp.
    pub fn load_all(&self) -> Result<Vec<Bar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut bars = Vec::new();

        for (line, result) in reader.deserialize().enumerate() {
            let record: CsvRecord = result
                .map_err(|e| DataError::ParseError(format!("row {}: {}", line + 1, e)))?;

            let timestamp = parse_timestamp(&record.date)?;

            bars.push(Bar::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }

        bars.sort_by_key(|b| b.timestamp);

        debug!(path = %self.path.display(), bars = bars.len(), "Loaded CSV bars");
        Ok(bars)
    }
}

impl BarProvider for CsvDataSource {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let mut bars = self.load_all()?;
        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }
        debug!(symbol, %timeframe, bars = bars.len(), "Fetched bars from CSV");
        Ok(bars)
    }
}

/// Parse the timestamp formats seen in exported kline files, as Unix ms.
fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.timestamp_millis());
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    // Unix time, milliseconds if more than 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "backtest-data-{}-{}.csv",
            name,
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-15").unwrap(), 1_705_276_800_000);
        assert_eq!(
            parse_timestamp("2024-01-15 10:30:00").unwrap(),
            1_705_276_800_000 + (10 * 60 + 30) * 60_000
        );
        assert_eq!(
            parse_timestamp("2024-01-15T00:00:00Z").unwrap(),
            1_705_276_800_000
        );
        assert_eq!(parse_timestamp("1705312800000").unwrap(), 1_705_312_800_000); // Unix ms
        assert_eq!(parse_timestamp("1705312800").unwrap(), 1_705_312_800_000); // Unix sec
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_load_sorts_and_aliases_headers() {
        let path = write_csv(
            "aliases",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,101,103,100,102,1500\n\
             2024-01-01,100,102,99,101,1200\n",
        );
        let bars = CsvDataSource::new(&path).unwrap().load_all().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[1].volume, 1500.0);
    }

    #[test]
    fn test_fetch_returns_most_recent() {
        let mut contents = String::from("timestamp,open,high,low,close,volume\n");
        for i in 0..10 {
            let p = 100 + i;
            let ts = 1_700_000_000_000i64 + i * 60_000;
            contents.push_str(&format!("{},{},{},{},{},10\n", ts, p, p + 1, p - 1, p));
        }
        let path = write_csv("fetch", &contents);
        let source = CsvDataSource::new(&path).unwrap();

        let bars = source.fetch_bars("BTCUSDT", Timeframe::Minute1, 3).unwrap();
        let all = source.fetch_bars("BTCUSDT", Timeframe::Minute1, 100).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].close, 107.0);
        assert_eq!(bars[2].close, 109.0);
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_missing_file_and_bad_rows() {
        assert!(CsvDataSource::new("/definitely/not/here.csv").is_err());

        let path = write_csv("bad", "date,open,high,low,close\n2024-01-01,abc,1,1,1\n");
        let err = CsvDataSource::new(&path).unwrap().load_all().unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, DataError::ParseError(_)));
    }
}
