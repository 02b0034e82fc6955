//! Model quality metrics and feature importances.
//!
//! The presentation layer consumes a [`ModelReport`] without caring how it was
//! produced. Two reporters exist: one that scores a real [`Classifier`]
//! against the dataset labels, and a placeholder that reproduces the fixed
//! ranges the dashboard was first built against.

use crate::core::dataset::LabeledSample;
use crate::core::labeling::Label;
use crate::core::predictor::{Classifier, PredictionInput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::sync::Mutex;

/// Display names of the reported features, in extraction order.
pub const FEATURE_NAMES: [&str; 4] = ["Stroop RT", "GSR Mean", "SCR Peaks", "Variance"];

/// Summary quality metrics, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Relative weight of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

impl FeatureImportance {
    pub fn new(feature: impl Into<String>, importance: f64) -> Self {
        Self {
            feature: feature.into(),
            importance,
        }
    }
}

/// Metrics plus importances sorted descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub metrics: ModelMetrics,
    pub importances: Vec<FeatureImportance>,
}

/// Turns a labeled dataset into a report.
pub trait MetricsReporter {
    fn report(&self, samples: &[LabeledSample]) -> ModelReport;
}

/// Binary confusion counts with `Drowsy` as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, actual: Label, predicted: Label) {
        match (actual, predicted) {
            (Label::Drowsy, Label::Drowsy) => self.true_positive += 1,
            (Label::Alert, Label::Drowsy) => self.false_positive += 1,
            (Label::Alert, Label::Alert) => self.true_negative += 1,
            (Label::Drowsy, Label::Alert) => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    /// Derive metrics; undefined ratios are reported as zero.
    pub fn metrics(&self) -> ModelMetrics {
        let accuracy = ratio(self.true_positive + self.true_negative, self.total());
        let precision = ratio(self.true_positive, self.true_positive + self.false_positive);
        let recall = ratio(self.true_positive, self.true_positive + self.false_negative);

        ModelMetrics {
            accuracy,
            precision,
            recall,
            f1: harmonic_mean(precision, recall),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall <= 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Scores a classifier against the dataset's ground-truth labels.
pub struct ClassifierEvaluation<C> {
    classifier: C,
}

impl<C: Classifier> ClassifierEvaluation<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn confusion(&self, samples: &[LabeledSample]) -> ConfusionMatrix {
        let mut matrix = ConfusionMatrix::default();
        for sample in samples {
            let input = PredictionInput::new(
                sample.trial.reaction_time_ms as f64,
                sample.features.mean,
                sample.features.peak_count,
            );
            matrix.record(sample.label, self.classifier.classify(&input).label);
        }
        matrix
    }
}

impl<C: Classifier> MetricsReporter for ClassifierEvaluation<C> {
    fn report(&self, samples: &[LabeledSample]) -> ModelReport {
        if samples.is_empty() {
            return ModelReport::default();
        }

        ModelReport {
            metrics: self.confusion(samples).metrics(),
            importances: correlation_importances(samples),
        }
    }
}

/// Importance as absolute correlation with the drowsy indicator, normalized
/// to sum to one.
pub fn correlation_importances(samples: &[LabeledSample]) -> Vec<FeatureImportance> {
    if samples.is_empty() {
        return Vec::new();
    }

    let target: Vec<f64> = samples
        .iter()
        .map(|s| if s.label.is_drowsy() { 1.0 } else { 0.0 })
        .collect();

    let columns: [Vec<f64>; 4] = [
        samples.iter().map(|s| s.trial.reaction_time_ms as f64).collect(),
        samples.iter().map(|s| s.features.mean).collect(),
        samples.iter().map(|s| s.features.peak_count as f64).collect(),
        samples.iter().map(|s| s.features.variance).collect(),
    ];

    let weights: Vec<f64> = columns
        .iter()
        .map(|column| abs_correlation(column, &target))
        .collect();
    let total: f64 = weights.iter().sum();

    let importances = FEATURE_NAMES
        .iter()
        .zip(weights)
        .map(|(name, weight)| {
            let importance = if total > 0.0 { weight / total } else { 0.0 };
            FeatureImportance::new(*name, importance)
        })
        .collect();

    sorted_descending(importances)
}

fn abs_correlation(x: &[f64], y: &[f64]) -> f64 {
    let denominator = x.population_std_dev() * y.population_std_dev();
    if denominator.is_nan() || denominator <= 0.0 {
        return 0.0;
    }

    let r = (x.population_covariance(y) / denominator).abs();
    if r.is_finite() {
        r.min(1.0)
    } else {
        0.0
    }
}

fn sorted_descending(mut importances: Vec<FeatureImportance>) -> Vec<FeatureImportance> {
    importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    importances
}

/// Placeholder reporter producing plausible numbers without fitting anything.
///
/// Accuracy is drawn from `[0.94, 0.97)`, precision and recall are jittered
/// around it and the importances are fixed.
pub struct SynthesizedReporter {
    rng: Mutex<StdRng>,
}

impl SynthesizedReporter {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SynthesizedReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReporter for SynthesizedReporter {
    fn report(&self, samples: &[LabeledSample]) -> ModelReport {
        if samples.is_empty() {
            return ModelReport::default();
        }

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let accuracy = 0.94 + rng.gen::<f64>() * 0.03;
        let precision = accuracy - 0.01 + rng.gen::<f64>() * 0.02;
        let recall = accuracy - 0.02 + rng.gen::<f64>() * 0.03;

        let importances = FEATURE_NAMES
            .iter()
            .zip([0.65, 0.20, 0.10, 0.05])
            .map(|(name, weight)| FeatureImportance::new(*name, weight))
            .collect();

        ModelReport {
            metrics: ModelMetrics {
                accuracy,
                precision: precision.min(1.0),
                recall: recall.min(1.0),
                f1: harmonic_mean(precision.min(1.0), recall.min(1.0)),
            },
            importances: sorted_descending(importances),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::FeatureVector;
    use crate::core::predictor::ThresholdPredictor;
    use crate::reader::types::{Outcome, TrialRecord};

    fn sample(rt: i64, outcome: Outcome, mean: f64, label: Label) -> LabeledSample {
        LabeledSample {
            trial: TrialRecord::new("t", 10_000, rt, outcome),
            window: Vec::new(),
            features: FeatureVector {
                mean,
                variance: 0.01,
                peak_count: 1,
                slope: 0.0,
            },
            label,
        }
    }

    fn make_samples() -> Vec<LabeledSample> {
        vec![
            // predicted drowsy, labeled drowsy
            sample(1300, Outcome::Correct, 2.0, Label::Drowsy),
            // predicted drowsy (low gsr), labeled alert
            sample(900, Outcome::Correct, 1.2, Label::Alert),
            // predicted alert, labeled alert
            sample(800, Outcome::Correct, 2.1, Label::Alert),
            // predicted alert, labeled drowsy (wrong answer)
            sample(700, Outcome::Wrong, 1.9, Label::Drowsy),
        ]
    }

    #[test]
    fn test_confusion_metrics() {
        let evaluation = ClassifierEvaluation::new(ThresholdPredictor::default());
        let matrix = evaluation.confusion(&make_samples());

        assert_eq!(
            matrix,
            ConfusionMatrix {
                true_positive: 1,
                false_positive: 1,
                true_negative: 1,
                false_negative: 1,
            }
        );

        let metrics = matrix.metrics();
        assert!((metrics.accuracy - 0.5).abs() < 1e-12);
        assert!((metrics.precision - 0.5).abs() < 1e-12);
        assert!((metrics.recall - 0.5).abs() < 1e-12);
        assert!((metrics.f1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_ratios_are_zero() {
        let mut matrix = ConfusionMatrix::default();
        matrix.record(Label::Alert, Label::Alert);

        let metrics = matrix.metrics();
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1, 0.0);
    }

    #[test]
    fn test_empty_dataset_report() {
        let evaluation = ClassifierEvaluation::new(ThresholdPredictor::default());
        assert_eq!(evaluation.report(&[]), ModelReport::default());
        assert_eq!(SynthesizedReporter::seeded(1).report(&[]), ModelReport::default());
    }

    #[test]
    fn test_importances_sorted_and_normalized() {
        let evaluation = ClassifierEvaluation::new(ThresholdPredictor::default());
        let report = evaluation.report(&make_samples());

        assert_eq!(report.importances.len(), FEATURE_NAMES.len());
        let total: f64 = report.importances.iter().map(|i| i.importance).sum();
        assert!((total - 1.0).abs() < 1e-9);

        for pair in report.importances.windows(2) {
            assert!(pair[0].importance >= pair[1].importance);
        }
        for importance in &report.importances {
            assert!((0.0..=1.0).contains(&importance.importance));
        }
    }

    #[test]
    fn test_constant_features_have_no_importance() {
        // Peaks and variance are identical across samples
        let importances = correlation_importances(&make_samples());
        let peaks = importances.iter().find(|i| i.feature == "SCR Peaks").unwrap();
        let variance = importances.iter().find(|i| i.feature == "Variance").unwrap();

        assert_eq!(peaks.importance, 0.0);
        assert_eq!(variance.importance, 0.0);
    }

    #[test]
    fn test_synthesized_ranges() {
        let reporter = SynthesizedReporter::seeded(42);
        for _ in 0..50 {
            let report = reporter.report(&make_samples());
            let m = report.metrics;

            assert!(m.accuracy >= 0.94 && m.accuracy < 0.97);
            for value in [m.precision, m.recall, m.f1] {
                assert!((0.0..=1.0).contains(&value));
            }

            let names: Vec<&str> = report.importances.iter().map(|i| i.feature.as_str()).collect();
            assert_eq!(names, FEATURE_NAMES.to_vec());
        }
    }

    #[test]
    fn test_synthesized_is_reproducible_with_seed() {
        let a = SynthesizedReporter::seeded(3).report(&make_samples());
        let b = SynthesizedReporter::seeded(3).report(&make_samples());
        assert_eq!(a, b);
    }
}
