//! Dataset construction.
//!
//! Runs the aligner, feature extractor and labeler over every trial. Trials
//! whose window is empty are dropped; output order follows input order.

use crate::core::features::{extract_with_margin, FeatureVector, PEAK_MARGIN_US};
use crate::core::labeling::{Label, Labeler};
use crate::core::windowing::{WindowAligner, DEFAULT_LOOKBACK_MS};
use crate::reader::types::{SignalSample, SignalStream, TrialRecord};
use serde::{Deserialize, Serialize};

/// One labeled trial with the window its features came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub trial: TrialRecord,
    pub window: Vec<SignalSample>,
    pub features: FeatureVector,
    pub label: Label,
}

/// Counts describing a built dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub trial_count: usize,
    pub sample_count: usize,
    pub dropped_trials: usize,
    pub alert_count: usize,
    pub drowsy_count: usize,
}

impl DatasetSummary {
    pub fn from_samples(trial_count: usize, samples: &[LabeledSample]) -> Self {
        let drowsy_count = samples.iter().filter(|s| s.label.is_drowsy()).count();
        Self {
            trial_count,
            sample_count: samples.len(),
            dropped_trials: trial_count.saturating_sub(samples.len()),
            alert_count: samples.len() - drowsy_count,
            drowsy_count,
        }
    }
}

/// Builds labeled datasets from trials and a signal stream.
#[derive(Debug, Clone, Copy)]
pub struct DatasetBuilder {
    aligner: WindowAligner,
    labeler: Labeler,
    peak_margin: f64,
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK_MS, PEAK_MARGIN_US, Labeler::default())
    }
}

impl DatasetBuilder {
    pub fn new(lookback_ms: i64, peak_margin: f64, labeler: Labeler) -> Self {
        Self {
            aligner: WindowAligner::new(lookback_ms),
            labeler,
            peak_margin,
        }
    }

    /// Process a single trial, or `None` if its window is empty.
    pub fn sample(&self, trial: &TrialRecord, stream: &SignalStream) -> Option<LabeledSample> {
        let window = self.aligner.align(trial, stream);
        let features = extract_with_margin(window, self.peak_margin)?;

        Some(LabeledSample {
            trial: trial.clone(),
            window: window.to_vec(),
            features,
            label: self.labeler.label(trial),
        })
    }

    /// Build the dataset sequentially.
    pub fn build(&self, trials: &[TrialRecord], stream: &SignalStream) -> Vec<LabeledSample> {
        let samples: Vec<LabeledSample> = trials
            .iter()
            .filter_map(|trial| self.sample(trial, stream))
            .collect();

        tracing::debug!(
            trials = trials.len(),
            samples = samples.len(),
            "Dataset built"
        );
        samples
    }

    /// Build the dataset across `workers` threads.
    ///
    /// Trials are split into contiguous chunks and the per-chunk results are
    /// concatenated in chunk order, so the output equals [`build`](Self::build).
    pub fn build_parallel(
        &self,
        trials: &[TrialRecord],
        stream: &SignalStream,
        workers: usize,
    ) -> Vec<LabeledSample> {
        let workers = workers.max(1);
        if workers == 1 || trials.len() < 2 {
            return self.build(trials, stream);
        }

        let chunk_size = (trials.len() + workers - 1) / workers;
        let chunks: Vec<Vec<LabeledSample>> = std::thread::scope(|scope| {
            let handles: Vec<_> = trials
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || self.build(chunk, stream)))
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(samples) => samples,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        chunks.into_iter().flatten().collect()
    }
}

/// Build a dataset with the default look-back, peak margin and labeling rule.
pub fn build_dataset(trials: &[TrialRecord], stream: &SignalStream) -> Vec<LabeledSample> {
    DatasetBuilder::default().build(trials, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::windowing::align;
    use crate::reader::types::Outcome;

    fn make_stream() -> SignalStream {
        // 4 Hz between 0s and 20s
        SignalStream::new(
            (0..=80)
                .map(|i| {
                    let t = i as f64 * 250.0;
                    SignalSample::new(t, 1.5 + (t / 1000.0).sin() * 0.3)
                })
                .collect(),
        )
    }

    fn make_trials() -> Vec<TrialRecord> {
        vec![
            TrialRecord::new("1", 4000, 850, Outcome::Correct),
            TrialRecord::new("2", 60_000, 900, Outcome::Correct),
            TrialRecord::new("3", 9000, 1250, Outcome::Correct),
            TrialRecord::new("4", 15_000, 700, Outcome::Wrong),
            TrialRecord::new("5", 20_000, 1000, Outcome::Correct),
        ]
    }

    #[test]
    fn test_drops_trials_with_empty_windows() {
        let stream = make_stream();
        let trials = make_trials();
        let samples = build_dataset(&trials, &stream);

        let ids: Vec<&str> = samples.iter().map(|s| s.trial.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4", "5"]);

        for trial in &trials {
            if !ids.contains(&trial.id.as_str()) {
                assert!(align(trial, &stream, DEFAULT_LOOKBACK_MS).is_empty());
            }
        }
    }

    #[test]
    fn test_labels_follow_behavior() {
        let samples = build_dataset(&make_trials(), &make_stream());
        let labels: Vec<Label> = samples.iter().map(|s| s.label).collect();

        assert_eq!(
            labels,
            vec![Label::Alert, Label::Drowsy, Label::Drowsy, Label::Alert]
        );
    }

    #[test]
    fn test_window_and_features_match() {
        let stream = make_stream();
        for sample in build_dataset(&make_trials(), &stream) {
            let window = align(&sample.trial, &stream, DEFAULT_LOOKBACK_MS);
            assert_eq!(sample.window.as_slice(), window);
            assert_eq!(Some(sample.features), crate::core::features::extract(window));
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let stream = make_stream();
        let trials: Vec<TrialRecord> = (0..37i64)
            .map(|i| {
                TrialRecord::new(
                    i.to_string(),
                    i * 700,
                    900 + (i % 5) * 100,
                    Outcome::Correct,
                )
            })
            .collect();

        let builder = DatasetBuilder::default();
        let sequential = builder.build(&trials, &stream);
        for workers in [0, 1, 2, 3, 8, 64] {
            assert_eq!(builder.build_parallel(&trials, &stream, workers), sequential);
        }
    }

    #[test]
    fn test_summary() {
        let trials = make_trials();
        let samples = build_dataset(&trials, &make_stream());
        let summary = DatasetSummary::from_samples(trials.len(), &samples);

        assert_eq!(summary.trial_count, 5);
        assert_eq!(summary.sample_count, 4);
        assert_eq!(summary.dropped_trials, 1);
        assert_eq!(summary.alert_count, 2);
        assert_eq!(summary.drowsy_count, 2);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(build_dataset(&[], &make_stream()).is_empty());
        assert!(build_dataset(&make_trials(), &SignalStream::default()).is_empty());
    }
}
