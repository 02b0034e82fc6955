//! NeuroGuard - GSR + Stroop alertness labeling pipeline.
//!
//! This library turns a continuous galvanic skin response (GSR) recording and
//! a table of Stroop test trials into labeled feature samples, and classifies
//! single samples as alert or drowsy.
//!
//! # Guarantees
//!
//! - **Deterministic**: building a dataset twice from the same inputs gives
//!   identical results
//! - **No look-ahead**: a trial's window never contains signal recorded after
//!   the trial's stimulus onset
//! - **Total**: the numeric core has no error paths; malformed input rows are
//!   filtered by the readers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          NeuroGuard                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐  │
//! │  │  Reader  │──▶│ Windowing │──▶│ Features │──▶│ Dataset  │  │
//! │  │  (CSV)   │   │ (5s back) │   │          │   │ + Labels │  │
//! │  └──────────┘   └───────────┘   └──────────┘   └──────────┘  │
//! │                                                     │        │
//! │                       ┌───────────┐   ┌──────────┐  │        │
//! │                       │ Predictor │   │ Metrics  │◀─┘        │
//! │                       └───────────┘   └──────────┘           │
//! │                             │               │                │
//! │                             ▼               ▼                │
//! │                       ┌──────────────────────────┐           │
//! │                       │  Session  /  Commentary  │           │
//! │                       └──────────────────────────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use neuroguard::{core, reader};
//! use std::path::Path;
//!
//! let trials = reader::load_trials(Path::new("stroop.csv")).expect("trials");
//! let stream = reader::load_signal(Path::new("gsr.csv")).expect("signal");
//!
//! let samples = core::build_dataset(&trials, &stream);
//! for sample in &samples {
//!     println!("{} -> {}", sample.trial.id, sample.label);
//! }
//! ```

pub mod commentary;
pub mod config;
pub mod core;
pub mod reader;
pub mod session;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use commentary::{CommentaryConfig, CommentaryError};
pub use config::{CommentarySettings, Config, PipelineConfig};
pub use crate::core::{
    build_dataset, predict, DatasetBuilder, DatasetSnapshot, FeatureVector, Label,
    LabeledSample, ModelReport, PredictionInput, PredictionResult, SnapshotBuilder,
    ThresholdPredictor,
};
pub use reader::{ReaderError, SignalSample, SignalStream, TrialRecord};
pub use session::{AggregateCounts, AppState, InferenceHistory, SharedInferenceHistory};

#[cfg(feature = "commentary")]
pub use commentary::CommentaryClient;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
