//! Trial/signal window alignment.
//!
//! Each trial looks back a fixed interval over the GSR stream. The interval
//! is inclusive at both ends: `[trial - lookback, trial]`. Windows for
//! neighbouring trials may overlap and are computed independently.

use crate::reader::types::{SignalSample, SignalStream, TrialRecord};

/// Default look-back interval in milliseconds.
pub const DEFAULT_LOOKBACK_MS: i64 = 5000;

/// Inclusive time bounds of a trial's window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowBounds {
    pub start: f64,
    pub end: f64,
}

impl WindowBounds {
    /// Bounds of the window ending at the trial timestamp.
    pub fn for_trial(trial: &TrialRecord, lookback_ms: i64) -> Self {
        let end = trial.timestamp_ms as f64;
        Self {
            start: end - lookback_ms as f64,
            end,
        }
    }

    /// Check if a timestamp falls within this window (both ends included).
    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Select the samples of `stream` within the look-back window of `trial`.
///
/// The stream is sorted, so the window is found by binary search on both
/// bounds. The result is ordered by timestamp and may be empty.
pub fn align<'a>(
    trial: &TrialRecord,
    stream: &'a SignalStream,
    lookback_ms: i64,
) -> &'a [SignalSample] {
    let bounds = WindowBounds::for_trial(trial, lookback_ms);
    let samples = stream.samples();

    let first = samples.partition_point(|s| s.timestamp < bounds.start);
    let last = samples.partition_point(|s| s.timestamp <= bounds.end);

    if first >= last {
        &[]
    } else {
        &samples[first..last]
    }
}

/// Aligns trials against one stream with a fixed look-back.
#[derive(Debug, Clone, Copy)]
pub struct WindowAligner {
    lookback_ms: i64,
}

impl Default for WindowAligner {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK_MS)
    }
}

impl WindowAligner {
    pub fn new(lookback_ms: i64) -> Self {
        Self { lookback_ms }
    }

    pub fn lookback_ms(&self) -> i64 {
        self.lookback_ms
    }

    pub fn align<'a>(&self, trial: &TrialRecord, stream: &'a SignalStream) -> &'a [SignalSample] {
        align(trial, stream, self.lookback_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::types::Outcome;

    fn make_stream(timestamps: &[f64]) -> SignalStream {
        SignalStream::new(
            timestamps
                .iter()
                .enumerate()
                .map(|(i, &t)| SignalSample::new(t, 1.0 + i as f64 * 0.1))
                .collect(),
        )
    }

    fn trial_at(timestamp_ms: i64) -> TrialRecord {
        TrialRecord::new("t", timestamp_ms, 800, Outcome::Correct)
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let stream = make_stream(&[4999.0, 5000.0, 7500.0, 10000.0, 10001.0]);
        let window = align(&trial_at(10000), &stream, DEFAULT_LOOKBACK_MS);

        let timestamps: Vec<f64> = window.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![5000.0, 7500.0, 10000.0]);
    }

    #[test]
    fn test_empty_window() {
        let stream = make_stream(&[20000.0, 21000.0]);
        assert!(align(&trial_at(10000), &stream, DEFAULT_LOOKBACK_MS).is_empty());
        assert!(align(&trial_at(10000), &SignalStream::default(), DEFAULT_LOOKBACK_MS).is_empty());
    }

    #[test]
    fn test_window_before_stream_start() {
        // Look-back reaching below zero still selects the available prefix
        let stream = make_stream(&[0.0, 500.0, 1500.0]);
        let window = align(&trial_at(1000), &stream, DEFAULT_LOOKBACK_MS);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_matches_linear_scan() {
        let timestamps: Vec<f64> = (0..200).map(|i| (i * 137 % 20000) as f64).collect();
        let stream = make_stream(&timestamps);

        for trial_ts in (0..25000).step_by(1250) {
            let trial = trial_at(trial_ts);
            let bounds = WindowBounds::for_trial(&trial, DEFAULT_LOOKBACK_MS);
            let expected: Vec<SignalSample> = stream
                .samples()
                .iter()
                .filter(|s| bounds.contains(s.timestamp))
                .copied()
                .collect();

            assert_eq!(align(&trial, &stream, DEFAULT_LOOKBACK_MS), expected.as_slice());
        }
    }

    #[test]
    fn test_aligner_custom_lookback() {
        let stream = make_stream(&[0.0, 1000.0, 2000.0, 3000.0]);
        let aligner = WindowAligner::new(1000);

        assert_eq!(aligner.lookback_ms(), 1000);
        assert_eq!(aligner.align(&trial_at(3000), &stream).len(), 2);
    }
}
