//! Core pipeline for NeuroGuard.
//!
//! This module contains:
//! - Window alignment of the GSR stream to each trial
//! - Feature extraction from aligned windows
//! - Ground-truth labeling from behavior
//! - Dataset construction
//! - Single-sample prediction
//! - Metrics/importance reporting and JSON export

pub mod dataset;
pub mod features;
pub mod labeling;
pub mod metrics;
pub mod predictor;
pub mod snapshot;
pub mod windowing;

// Re-export commonly used types
pub use dataset::{build_dataset, DatasetBuilder, DatasetSummary, LabeledSample};
pub use features::{extract, extract_with_margin, FeatureVector, PEAK_MARGIN_US};
pub use labeling::{label, Label, Labeler, DROWSY_REACTION_TIME_MS};
pub use metrics::{
    ClassifierEvaluation, FeatureImportance, MetricsReporter, ModelMetrics, ModelReport,
    SynthesizedReporter,
};
pub use predictor::{
    predict, Classifier, ConfidenceModel, DistanceConfidence, PredictionInput, PredictionResult,
    SampledConfidence, ThresholdPredictor,
};
pub use snapshot::{DatasetSnapshot, SnapshotBuilder};
pub use windowing::{align, WindowAligner, WindowBounds, DEFAULT_LOOKBACK_MS};
