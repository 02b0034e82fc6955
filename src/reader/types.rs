//! Typed records produced by the raw readers.
//!
//! The core pipeline only ever sees these values; anything malformed has
//! already been dropped by the table parsers.

use serde::{Deserialize, Serialize};

/// A single GSR reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    /// Milliseconds since recording start
    pub timestamp: f64,
    /// Skin conductance in microsiemens (µS)
    pub value: f64,
}

impl SignalSample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A continuous GSR recording, ordered by timestamp ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStream {
    samples: Vec<SignalSample>,
}

impl SignalStream {
    /// Build a stream, sorting samples by timestamp.
    ///
    /// The sort is stable, so samples sharing a timestamp keep their input order.
    pub fn new(mut samples: Vec<SignalSample>) -> Self {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { samples }
    }

    pub fn samples(&self) -> &[SignalSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time covered by the stream as `(first, last)` timestamps.
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}

impl From<Vec<SignalSample>> for SignalStream {
    fn from(samples: Vec<SignalSample>) -> Self {
        Self::new(samples)
    }
}

/// Behavioral outcome of a Stroop trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Wrong,
}

impl Outcome {
    /// Parse a response cell. Only `wrong` (any case) counts as a wrong answer.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("wrong") {
            Outcome::Wrong
        } else {
            Outcome::Correct
        }
    }
}

/// One row of the behavioral table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Row identifier, unique within a dataset
    pub id: String,
    /// Trial time in milliseconds, on the same clock as the signal stream
    pub timestamp_ms: i64,
    /// Stroop reaction time in milliseconds
    pub reaction_time_ms: i64,
    pub outcome: Outcome,
}

impl TrialRecord {
    pub fn new(
        id: impl Into<String>,
        timestamp_ms: i64,
        reaction_time_ms: i64,
        outcome: Outcome,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp_ms,
            reaction_time_ms,
            outcome,
        }
    }
}
