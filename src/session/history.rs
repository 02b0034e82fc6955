//! Append-only inference history.
//!
//! Every single-sample prediction is recorded here for display aggregation.
//! The history never feeds back into the dataset or the labeling thresholds.

use crate::core::labeling::Label;
use crate::core::predictor::{PredictionInput, PredictionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub input: PredictionInput,
    pub label: Label,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Counts over the recorded predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub alert: usize,
    pub drowsy: usize,
    pub mean_confidence: Option<f64>,
}

/// Inference history for the current session.
#[derive(Debug, Default)]
pub struct InferenceHistory {
    records: Mutex<Vec<InferenceRecord>>,
    /// Path for persisting records
    persist_path: Option<PathBuf>,
}

impl InferenceHistory {
    /// Create an empty in-memory history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history backed by a JSON file.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut history = Self::new();
        history.persist_path = Some(path);

        if let Err(e) = history.load() {
            tracing::warn!("Could not load previous inference history: {e}");
        }

        history
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InferenceRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a prediction.
    pub fn record(&self, input: PredictionInput, result: PredictionResult) -> InferenceRecord {
        let record = InferenceRecord {
            input,
            label: result.label,
            confidence: result.confidence,
            timestamp: Utc::now(),
        };
        self.lock().push(record.clone());
        record
    }

    /// Copy of all records, oldest first.
    pub fn records(&self) -> Vec<InferenceRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Get the current statistics.
    pub fn stats(&self) -> HistoryStats {
        let records = self.lock();
        let drowsy = records.iter().filter(|r| r.label.is_drowsy()).count();
        let mean_confidence = if records.is_empty() {
            None
        } else {
            Some(records.iter().map(|r| r.confidence).sum::<f64>() / records.len() as f64)
        };

        HistoryStats {
            total: records.len(),
            alert: records.len() - drowsy,
            drowsy,
            mean_confidence,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let confidence = stats
            .mean_confidence
            .map(|c| format!("{:.1}%", c * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "Inference History:\n\
             - Predictions: {}\n\
             - Alert: {}\n\
             - Drowsy: {}\n\
             - Mean confidence: {}",
            stats.total, stats.alert, stats.drowsy, confidence
        )
    }

    /// Drop all records. Called when a new dataset is loaded.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Save records to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let json =
                serde_json::to_string_pretty(&*self.lock()).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load records from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let records: Vec<InferenceRecord> =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;
                *self.lock() = records;
            }
        }
        Ok(())
    }
}

/// Thread-safe shared inference history.
pub type SharedInferenceHistory = Arc<InferenceHistory>;

/// Create a new shared in-memory history.
pub fn create_shared_history() -> SharedInferenceHistory {
    Arc::new(InferenceHistory::new())
}

/// Create a new shared history with persistence.
pub fn create_shared_history_with_persistence(path: PathBuf) -> SharedInferenceHistory {
    Arc::new(InferenceHistory::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::predictor::predict;

    fn record_prediction(history: &InferenceHistory, rt: f64, gsr: f64) {
        let input = PredictionInput::new(rt, gsr, 1);
        history.record(input, predict(rt, gsr, 1));
    }

    #[test]
    fn test_history_counting() {
        let history = InferenceHistory::new();
        record_prediction(&history, 900.0, 2.0);
        record_prediction(&history, 1300.0, 2.0);
        record_prediction(&history, 900.0, 1.0);

        let stats = history.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.alert, 1);
        assert_eq!(stats.drowsy, 2);
        assert!(stats.mean_confidence.unwrap() >= 0.85);
    }

    #[test]
    fn test_history_order_and_clear() {
        let history = InferenceHistory::new();
        record_prediction(&history, 1300.0, 2.0);
        record_prediction(&history, 900.0, 2.0);

        let records = history.records();
        assert_eq!(records[0].label, Label::Drowsy);
        assert_eq!(records[1].label, Label::Alert);
        assert!(records[0].timestamp <= records[1].timestamp);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.stats().mean_confidence, None);
    }

    #[test]
    fn test_persistence() {
        let path = std::env::temp_dir()
            .join(format!("neuroguard-history-test-{}", std::process::id()))
            .join("history.json");

        let history = InferenceHistory::with_persistence(path.clone());
        history.clear();
        record_prediction(&history, 1000.0, 1.8);
        history.save().unwrap();

        let reloaded = InferenceHistory::with_persistence(path.clone());
        let (before, after) = (history.records(), reloaded.records());
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].label, before[0].label);
        assert_eq!(after[0].timestamp, before[0].timestamp);
        assert!((after[0].confidence - before[0].confidence).abs() < 1e-12);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_summary_format() {
        let history = InferenceHistory::new();
        let summary = history.summary();

        assert!(summary.contains("Predictions: 0"));
        assert!(summary.contains("Mean confidence: n/a"));
    }
}
