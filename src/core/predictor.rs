//! Single-sample alertness inference.
//!
//! The predictor works on a reduced feature triple with no surrounding
//! window and no behavioral outcome. Its rule therefore differs from the
//! dataset [`Labeler`](crate::core::labeling::Labeler): a low GSR mean takes
//! the place of a wrong answer. The two rules are kept separate on purpose
//! and a prediction need not agree with the label of the same trial.

use crate::core::labeling::Label;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Reaction time above which a sample is predicted drowsy (exclusive).
pub const PREDICTOR_REACTION_TIME_MS: f64 = 1100.0;

/// GSR mean below which a sample is predicted drowsy (exclusive), in µS.
pub const PREDICTOR_GSR_FLOOR_US: f64 = 1.5;

/// Lower bound of reported confidence.
pub const MIN_CONFIDENCE: f64 = 0.85;

/// Upper bound of reported confidence.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Relative margin at which distance confidence reaches ~63% of its range.
const MARGIN_SCALE: f64 = 0.25;

/// Raw inputs of one inference call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    /// Stroop reaction time in milliseconds
    pub rt_ms: f64,
    /// Mean skin conductance (µS)
    pub gsr_mean: f64,
    /// Phasic peak count
    pub peak_count: u32,
}

impl PredictionInput {
    pub fn new(rt_ms: f64, gsr_mean: f64, peak_count: u32) -> Self {
        Self {
            rt_ms,
            gsr_mean,
            peak_count,
        }
    }
}

impl Default for PredictionInput {
    /// The values the predictor form starts with.
    fn default() -> Self {
        Self::new(850.0, 1.85, 2)
    }
}

/// Outcome of one inference call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Label,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

/// A classifier producing a label and confidence from a single sample.
///
/// A trained model can implement this to replace the threshold rule.
pub trait Classifier {
    fn classify(&self, input: &PredictionInput) -> PredictionResult;
}

/// Maps a decision margin to a confidence score.
pub trait ConfidenceModel {
    /// `margin` is the relative distance (>= 0) from the threshold that
    /// decided `label`.
    fn confidence(&self, label: Label, margin: f64) -> f64;
}

/// Confidence growing monotonically with the decision margin.
///
/// Starts at [`MIN_CONFIDENCE`] on a threshold and approaches
/// [`MAX_CONFIDENCE`] as the sample moves away from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceConfidence;

impl ConfidenceModel for DistanceConfidence {
    fn confidence(&self, _label: Label, margin: f64) -> f64 {
        let margin = if margin.is_nan() { 0.0 } else { margin.max(0.0) };
        let spread = MAX_CONFIDENCE - MIN_CONFIDENCE;
        (MIN_CONFIDENCE + spread * (1.0 - (-margin / MARGIN_SCALE).exp()))
            .clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}

/// Placeholder confidence drawn uniformly from `[0.85, 0.95)`, ignoring the
/// margin entirely.
pub struct SampledConfidence {
    rng: Mutex<StdRng>,
}

impl SampledConfidence {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SampledConfidence {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfidenceModel for SampledConfidence {
    fn confidence(&self, _label: Label, _margin: f64) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(MIN_CONFIDENCE..MAX_CONFIDENCE)
    }
}

/// Threshold rule over reaction time and GSR mean.
pub struct ThresholdPredictor<C = DistanceConfidence> {
    reaction_time_threshold_ms: f64,
    gsr_floor_us: f64,
    confidence: C,
}

impl Default for ThresholdPredictor<DistanceConfidence> {
    fn default() -> Self {
        Self::new(PREDICTOR_REACTION_TIME_MS, PREDICTOR_GSR_FLOOR_US)
    }
}

impl ThresholdPredictor<DistanceConfidence> {
    pub fn new(reaction_time_threshold_ms: f64, gsr_floor_us: f64) -> Self {
        Self {
            reaction_time_threshold_ms,
            gsr_floor_us,
            confidence: DistanceConfidence,
        }
    }
}

impl<C: ConfidenceModel> ThresholdPredictor<C> {
    /// Swap the confidence strategy, keeping the thresholds.
    pub fn with_confidence<D: ConfidenceModel>(self, confidence: D) -> ThresholdPredictor<D> {
        ThresholdPredictor {
            reaction_time_threshold_ms: self.reaction_time_threshold_ms,
            gsr_floor_us: self.gsr_floor_us,
            confidence,
        }
    }

    /// `Drowsy` if reaction time is above the threshold or GSR mean is below the floor.
    pub fn decide(&self, input: &PredictionInput) -> Label {
        if input.rt_ms > self.reaction_time_threshold_ms || input.gsr_mean < self.gsr_floor_us {
            Label::Drowsy
        } else {
            Label::Alert
        }
    }

    /// Relative distance from the threshold that decided the label.
    ///
    /// For a drowsy call this is the largest margin among the triggered
    /// conditions; for an alert call it is the distance to the nearer threshold.
    fn margin(&self, input: &PredictionInput, label: Label) -> f64 {
        let rt_margin = (input.rt_ms - self.reaction_time_threshold_ms)
            / self.reaction_time_threshold_ms.abs().max(f64::EPSILON);
        let gsr_margin =
            (self.gsr_floor_us - input.gsr_mean) / self.gsr_floor_us.abs().max(f64::EPSILON);

        match label {
            Label::Drowsy => rt_margin.max(gsr_margin),
            Label::Alert => (-rt_margin).min(-gsr_margin),
        }
    }
}

impl<C: ConfidenceModel> Classifier for ThresholdPredictor<C> {
    fn classify(&self, input: &PredictionInput) -> PredictionResult {
        let label = self.decide(input);
        let margin = self.margin(input, label);
        PredictionResult {
            label,
            confidence: self.confidence.confidence(label, margin),
        }
    }
}

/// Predict with the default thresholds and distance-based confidence.
pub fn predict(rt_ms: f64, gsr_mean: f64, peak_count: u32) -> PredictionResult {
    ThresholdPredictor::default().classify(&PredictionInput::new(rt_ms, gsr_mean, peak_count))
}
