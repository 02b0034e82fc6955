//! Dataset store with atomic replacement.
//!
//! A reload builds the new dataset without holding the lock and then swaps
//! a single `Arc`. Readers keep whichever snapshot they cloned, so they see
//! either the old or the new dataset, never a mix.

use crate::core::dataset::{DatasetBuilder, DatasetSummary, LabeledSample};
use crate::reader::types::{SignalStream, TrialRecord};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// Inputs and outputs of one dataset load. Immutable once built.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub trials: Vec<TrialRecord>,
    pub stream: SignalStream,
    pub samples: Vec<LabeledSample>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedDataset {
    /// A dataset with no trials and no signal.
    pub fn empty() -> Self {
        Self {
            trials: Vec::new(),
            stream: SignalStream::default(),
            samples: Vec::new(),
            loaded_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_samples(self.trials.len(), &self.samples)
    }
}

/// Holds the current dataset behind an atomically swapped `Arc`.
#[derive(Debug)]
pub struct DatasetStore {
    current: RwLock<Arc<LoadedDataset>>,
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(LoadedDataset::empty())),
        }
    }

    /// The dataset as of this call.
    pub fn current(&self) -> Arc<LoadedDataset> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Build a dataset from fresh inputs and replace the current one.
    pub fn load(
        &self,
        trials: Vec<TrialRecord>,
        stream: SignalStream,
        builder: &DatasetBuilder,
    ) -> Arc<LoadedDataset> {
        let samples = builder.build(&trials, &stream);
        let dataset = Arc::new(LoadedDataset {
            trials,
            stream,
            samples,
            loaded_at: Utc::now(),
        });

        self.replace(dataset.clone());
        tracing::info!(
            trials = dataset.trials.len(),
            samples = dataset.samples.len(),
            "Dataset loaded"
        );
        dataset
    }

    /// Swap in an already built dataset.
    pub fn replace(&self, dataset: Arc<LoadedDataset>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = dataset;
    }
}
