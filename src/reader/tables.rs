//! Parsers for the behavioral-trial table and the GSR signal table.
//!
//! Both tables carry a header row, which is skipped. Rows that do not have
//! enough columns or whose numeric cells do not parse are dropped with a log
//! line; only I/O failures surface as errors.

use crate::reader::types::{Outcome, SignalSample, SignalStream, TrialRecord};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use std::path::Path;

/// Minimum column count of a behavioral row.
const TRIAL_COLUMNS: usize = 7;

/// Minimum column count of a signal row.
const SIGNAL_COLUMNS: usize = 2;

const COL_ID: usize = 0;
const COL_TIMESTAMP: usize = 1;
const COL_OUTCOME: usize = 5;
const COL_REACTION_TIME: usize = 6;

/// Errors raised while reading input tables.
#[derive(Debug)]
pub enum ReaderError {
    IoError(String),
    CsvError(String),
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::IoError(e) => write!(f, "IO error: {e}"),
            ReaderError::CsvError(e) => write!(f, "CSV error: {e}"),
        }
    }
}

impl std::error::Error for ReaderError {}

impl From<csv::Error> for ReaderError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            ReaderError::IoError(e.to_string())
        } else {
            ReaderError::CsvError(e.to_string())
        }
    }
}

/// Read the behavioral table from any reader.
pub fn read_trials<R: Read>(reader: R) -> Result<Vec<TrialRecord>, ReaderError> {
    let mut csv_reader = table_reader(reader);
    let mut trials = Vec::new();

    for (row, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(row, "Skipping unreadable trial row: {e}");
                continue;
            }
        };

        match parse_trial(&record) {
            Some(trial) => trials.push(trial),
            None => tracing::debug!(row, columns = record.len(), "Skipping malformed trial row"),
        }
    }

    Ok(trials)
}

/// Read the signal table from any reader.
///
/// The first column is in seconds and is converted to milliseconds.
pub fn read_signal<R: Read>(reader: R) -> Result<SignalStream, ReaderError> {
    let mut csv_reader = table_reader(reader);
    let mut samples = Vec::new();

    for (row, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(row, "Skipping unreadable signal row: {e}");
                continue;
            }
        };

        match parse_sample(&record) {
            Some(sample) => samples.push(sample),
            None => tracing::debug!(row, columns = record.len(), "Skipping malformed signal row"),
        }
    }

    Ok(SignalStream::new(samples))
}

/// Load the behavioral table from a file.
pub fn load_trials(path: &Path) -> Result<Vec<TrialRecord>, ReaderError> {
    let file = std::fs::File::open(path)
        .map_err(|e| ReaderError::IoError(format!("{}: {e}", path.display())))?;
    let trials = read_trials(file)?;
    tracing::info!(path = %path.display(), trials = trials.len(), "Loaded trial table");
    Ok(trials)
}

/// Load the signal table from a file.
pub fn load_signal(path: &Path) -> Result<SignalStream, ReaderError> {
    let file = std::fs::File::open(path)
        .map_err(|e| ReaderError::IoError(format!("{}: {e}", path.display())))?;
    let stream = read_signal(file)?;
    tracing::info!(path = %path.display(), samples = stream.len(), "Loaded signal table");
    Ok(stream)
}

fn table_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader)
}

fn parse_trial(record: &StringRecord) -> Option<TrialRecord> {
    if record.len() < TRIAL_COLUMNS {
        return None;
    }

    let timestamp_ms = parse_int(record.get(COL_TIMESTAMP)?)?;
    let reaction_time_ms = parse_int(record.get(COL_REACTION_TIME)?)?;
    if timestamp_ms < 0 || reaction_time_ms < 0 {
        return None;
    }

    Some(TrialRecord {
        id: record.get(COL_ID)?.to_string(),
        timestamp_ms,
        reaction_time_ms,
        outcome: Outcome::parse(record.get(COL_OUTCOME)?),
    })
}

fn parse_sample(record: &StringRecord) -> Option<SignalSample> {
    if record.len() < SIGNAL_COLUMNS {
        return None;
    }

    let seconds: f64 = record.get(0)?.parse().ok()?;
    let value: f64 = record.get(1)?.parse().ok()?;
    if !seconds.is_finite() || !value.is_finite() {
        return None;
    }

    Some(SignalSample::new(seconds * 1000.0, value))
}

/// Integer cells occasionally carry a fractional part; truncate it.
fn parse_int(cell: &str) -> Option<i64> {
    if let Ok(v) = cell.parse::<i64>() {
        return Some(v);
    }
    let v: f64 = cell.parse().ok()?;
    v.is_finite().then(|| v.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIALS: &str = "\
S.No,Timestamp,Word,Color,Key,Response,RT
1,5000,RED,blue,b,correct,850
2,9000,BLUE,red,r,Wrong,700
3,12000,GREEN
4,-10,RED,red,r,correct,600
5,15000,RED,green,g,correct,abc
6,20000.0,RED,green,g,correct,1200.7
";

    const SIGNAL: &str = "\
time,gsr
0.0,1.50
0.5,1.62
bad,1.0
1.0
1.5,inf
1.25,1.70
";

    #[test]
    fn test_read_trials_skips_malformed_rows() {
        let trials = read_trials(TRIALS.as_bytes()).unwrap();

        assert_eq!(trials.len(), 3);
        assert_eq!(trials[0], TrialRecord::new("1", 5000, 850, Outcome::Correct));
        assert_eq!(trials[1].outcome, Outcome::Wrong);
        assert_eq!(trials[2].timestamp_ms, 20000);
        assert_eq!(trials[2].reaction_time_ms, 1200);
    }

    #[test]
    fn test_read_signal_converts_seconds_and_sorts() {
        let stream = read_signal(SIGNAL.as_bytes()).unwrap();

        let timestamps: Vec<f64> = stream.samples().iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![0.0, 500.0, 1250.0]);
        assert_eq!(stream.samples()[2].value, 1.70);
    }

    #[test]
    fn test_header_only_tables() {
        assert!(read_trials("a,b,c,d,e,f,g\n".as_bytes()).unwrap().is_empty());
        assert!(read_signal("t,v\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_trials(Path::new("/nonexistent/neuroguard/trials.csv")).unwrap_err();
        assert!(matches!(err, ReaderError::IoError(_)));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("42.9"), Some(42));
        assert_eq!(parse_int("x"), None);
        assert_eq!(parse_int("NaN"), None);
    }
}
