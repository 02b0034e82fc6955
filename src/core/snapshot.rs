//! JSON export envelope for a built dataset.
//!
//! A snapshot bundles the labeled samples with producer metadata, the
//! dataset summary and, optionally, the model report that was computed from
//! it.

use crate::core::dataset::{DatasetSummary, LabeledSample};
use crate::core::metrics::ModelReport;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "neuroguard";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProducer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
    /// Unique instance identifier (UUID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// Exported dataset with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// Snapshot schema version
    pub format_version: String,
    /// When this payload was computed (RFC3339)
    pub computed_at_utc: String,
    pub producer: SnapshotProducer,
    pub lookback_ms: i64,
    pub summary: DatasetSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ModelReport>,
    pub samples: Vec<LabeledSample>,
}

/// Builder for dataset snapshots.
pub struct SnapshotBuilder {
    instance_id: Uuid,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    /// Create a new builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
        }
    }

    /// Get the instance ID.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a snapshot from a dataset.
    pub fn build(
        &self,
        trial_count: usize,
        lookback_ms: i64,
        samples: &[LabeledSample],
        report: Option<ModelReport>,
    ) -> DatasetSnapshot {
        DatasetSnapshot {
            format_version: SNAPSHOT_VERSION.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            producer: SnapshotProducer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                instance_id: Some(self.instance_id.to_string()),
            },
            lookback_ms,
            summary: DatasetSummary::from_samples(trial_count, samples),
            report,
            samples: samples.to_vec(),
        }
    }

    /// Build and serialize a snapshot as pretty JSON.
    pub fn build_json(
        &self,
        trial_count: usize,
        lookback_ms: i64,
        samples: &[LabeledSample],
        report: Option<ModelReport>,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.build(trial_count, lookback_ms, samples, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::build_dataset;
    use crate::reader::types::{Outcome, SignalSample, SignalStream, TrialRecord};

    fn make_samples() -> (usize, Vec<LabeledSample>) {
        let stream = SignalStream::new(
            (0..20)
                .map(|i| SignalSample::new(i as f64 * 500.0, 1.6 + (i % 3) as f64 * 0.1))
                .collect(),
        );
        let trials = vec![
            TrialRecord::new("1", 5000, 800, Outcome::Correct),
            TrialRecord::new("2", 9000, 1300, Outcome::Correct),
            TrialRecord::new("3", 90_000, 800, Outcome::Correct),
        ];
        (trials.len(), build_dataset(&trials, &stream))
    }

    #[test]
    fn test_snapshot_contents() {
        let (trial_count, samples) = make_samples();
        let builder = SnapshotBuilder::new();
        let snapshot = builder.build(trial_count, 5000, &samples, None);

        assert_eq!(snapshot.format_version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.producer.name, PRODUCER_NAME);
        assert_eq!(
            snapshot.producer.instance_id,
            Some(builder.instance_id().to_string())
        );
        assert_eq!(snapshot.summary.sample_count, 2);
        assert_eq!(snapshot.summary.dropped_trials, 1);
        assert_eq!(snapshot.samples, samples);
    }

    #[test]
    fn test_snapshot_json() {
        let (trial_count, samples) = make_samples();
        let json = SnapshotBuilder::new()
            .build_json(trial_count, 5000, &samples, Some(ModelReport::default()))
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["format_version"], "1.0");
        assert_eq!(value["samples"][0]["label"], "Alert");
        assert_eq!(value["samples"][1]["label"], "Drowsy");
        assert!(value["report"]["metrics"]["accuracy"].is_number());
        assert!(value.get("computed_at_utc").is_some());
    }

    #[test]
    fn test_report_omitted_when_absent() {
        let (trial_count, samples) = make_samples();
        let json = SnapshotBuilder::new()
            .build_json(trial_count, 5000, &samples, None)
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("report").is_none());
    }
}
