//! Raw readers for the two input tables.
//!
//! This module turns the behavioral-trial CSV and the GSR signal CSV into
//! typed records. Malformed rows are filtered here so the core pipeline only
//! handles well-formed values.

pub mod tables;
pub mod types;

// Re-export commonly used types
pub use tables::{load_signal, load_trials, read_signal, read_trials, ReaderError};
pub use types::{Outcome, SignalSample, SignalStream, TrialRecord};
