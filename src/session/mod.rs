//! Application state shared with the presentation layer.
//!
//! The core pipeline stays a pure function of its inputs. Everything a
//! dashboard needs to remember between interactions lives in [`AppState`]:
//! the loaded dataset, the inference history and the active configuration.

pub mod history;
pub mod store;

pub use history::{
    create_shared_history, create_shared_history_with_persistence, HistoryStats,
    InferenceHistory, InferenceRecord, SharedInferenceHistory,
};
pub use store::{DatasetStore, LoadedDataset};

use crate::config::PipelineConfig;
use crate::core::metrics::{MetricsReporter, ModelReport};
use crate::core::predictor::{Classifier, PredictionInput, PredictionResult, ThresholdPredictor};
use crate::reader::types::{SignalStream, TrialRecord};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Dataset labels plus live predictions, as shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounts {
    pub total: usize,
    pub alert: usize,
    pub drowsy: usize,
}

/// Session state: one dataset, one predictor, one inference history.
pub struct AppState {
    pipeline: PipelineConfig,
    predictor: ThresholdPredictor,
    dataset: DatasetStore,
    /// Set once the first dataset has been loaded
    has_dataset: AtomicBool,
    history: SharedInferenceHistory,
}

impl AppState {
    pub fn new(pipeline: PipelineConfig, history: SharedInferenceHistory) -> Self {
        Self {
            pipeline,
            predictor: pipeline.predictor(),
            dataset: DatasetStore::new(),
            has_dataset: AtomicBool::new(false),
            history,
        }
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn history(&self) -> &SharedInferenceHistory {
        &self.history
    }

    /// The dataset as of this call.
    pub fn dataset(&self) -> Arc<LoadedDataset> {
        self.dataset.current()
    }

    /// Rebuild the dataset wholesale.
    ///
    /// The first load keeps the history it was given (e.g. one restored from
    /// disk). A reload that replaces an existing dataset discards live
    /// predictions made against the previous one.
    pub fn load_dataset(&self, trials: Vec<TrialRecord>, stream: SignalStream) -> Arc<LoadedDataset> {
        let dataset = self
            .dataset
            .load(trials, stream, &self.pipeline.dataset_builder());
        if self.has_dataset.swap(true, Ordering::SeqCst) {
            self.history.clear();
        }
        dataset
    }

    /// Predict a single sample and record it in the history.
    pub fn predict(&self, input: PredictionInput) -> PredictionResult {
        let result = self.predictor.classify(&input);
        self.history.record(input, result);
        result
    }

    /// Run a reporter over the current dataset.
    pub fn report(&self, reporter: &dyn MetricsReporter) -> ModelReport {
        reporter.report(&self.dataset().samples)
    }

    /// Label counts over the dataset and the inference history combined.
    pub fn aggregate_counts(&self) -> AggregateCounts {
        let summary = self.dataset().summary();
        let stats = self.history.stats();

        AggregateCounts {
            total: summary.sample_count + stats.total,
            alert: summary.alert_count + stats.alert,
            drowsy: summary.drowsy_count + stats.drowsy,
        }
    }
}
