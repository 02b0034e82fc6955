//! Feature computation from aligned GSR windows.
//!
//! This module extracts descriptive statistics and a phasic peak count from
//! a single window of skin-conductance samples.

use crate::reader::types::SignalSample;
use serde::{Deserialize, Serialize};

/// Margin above the window mean a local maximum must exceed to count as a
/// phasic peak (in µS).
pub const PEAK_MARGIN_US: f64 = 0.05;

/// Features derived from one aligned window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Arithmetic mean conductance (µS)
    pub mean: f64,
    /// Population variance of conductance
    pub variance: f64,
    /// Number of strict interior local maxima above `mean + margin`
    pub peak_count: u32,
    /// `(last - first) / len`, a rate-of-change proxy per sample
    pub slope: f64,
}

/// Compute all features from a window using the default peak margin.
///
/// Returns `None` for an empty window; callers are expected to filter those
/// out before extraction.
pub fn extract(window: &[SignalSample]) -> Option<FeatureVector> {
    extract_with_margin(window, PEAK_MARGIN_US)
}

/// Compute all features from a window with a custom peak margin.
pub fn extract_with_margin(window: &[SignalSample], peak_margin: f64) -> Option<FeatureVector> {
    if window.is_empty() {
        return None;
    }

    let values: Vec<f64> = window.iter().map(|s| s.value).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    Some(FeatureVector {
        mean,
        variance: population_variance(&values, mean),
        peak_count: count_peaks(&values, mean + peak_margin),
        slope: endpoint_slope(&values),
    })
}

/// Population variance around a precomputed mean (divides by `n`).
///
/// A window of identical values has variance exactly zero, even when the
/// summed mean is off by a rounding step.
fn population_variance(values: &[f64], mean: f64) -> f64 {
    if values.windows(2).all(|w| w[0] == w[1]) {
        return 0.0;
    }
    values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Count interior indices that are strict local maxima above `threshold`.
///
/// The first and last samples can never be peaks, so windows shorter than
/// three samples always yield zero.
fn count_peaks(values: &[f64], threshold: f64) -> u32 {
    values
        .windows(3)
        .filter(|w| w[1] > w[0] && w[1] > w[2] && w[1] > threshold)
        .count() as u32
}

/// First/last difference normalized by sample count, not elapsed time.
fn endpoint_slope(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => (last - first) / values.len() as f64,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(values: &[f64]) -> Vec<SignalSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SignalSample::new(i as f64 * 250.0, v))
            .collect()
    }

    #[test]
    fn test_empty_window_has_no_features() {
        assert!(extract(&[]).is_none());
    }

    #[test]
    fn test_peak_requires_margin_above_mean() {
        let features = extract(&window(&[1.0, 1.2, 0.9, 1.05, 1.0])).unwrap();

        assert!((features.mean - 1.03).abs() < 1e-9);
        // 1.05 is a local max but not above 1.08; 1.2 is
        assert_eq!(features.peak_count, 1);

        let features = extract(&window(&[1.0, 1.2, 0.9, 1.3, 1.0])).unwrap();
        assert!((features.mean - 1.08).abs() < 1e-9);
        assert_eq!(features.peak_count, 2);
    }

    #[test]
    fn test_mean_is_sum_over_count() {
        // Summed left to right this mean lands just below 1.43, which puts
        // 1.48 above the peak threshold
        let values = [1.41, 1.48, 1.40];
        let features = extract(&window(&values)).unwrap();

        assert_eq!(features.mean, (1.41 + 1.48 + 1.40) / 3.0);
        assert_eq!(features.peak_count, 1);
    }

    #[test]
    fn test_slope_divides_by_count() {
        let features = extract(&window(&[1.0, 1.5])).unwrap();
        assert!((features.slope - 0.25).abs() < 1e-12);
        assert_eq!(features.peak_count, 0);
    }

    #[test]
    fn test_constant_window() {
        let features = extract(&window(&[2.5; 12])).unwrap();

        assert_eq!(features.variance, 0.0);
        assert_eq!(features.peak_count, 0);
        assert_eq!(features.slope, 0.0);
        assert_eq!(features.mean, 2.5);
    }

    #[test]
    fn test_constant_window_with_inexact_mean() {
        // Twelve copies of 2.3 do not sum to exactly 27.6
        let features = extract(&window(&[2.3; 12])).unwrap();

        assert!((features.mean - 2.3).abs() < 1e-12);
        assert_eq!(features.variance, 0.0);
        assert_eq!(features.peak_count, 0);
    }

    #[test]
    fn test_single_sample_window() {
        let features = extract(&window(&[1.7])).unwrap();

        assert_eq!(features.mean, 1.7);
        assert_eq!(features.variance, 0.0);
        assert_eq!(features.peak_count, 0);
        assert_eq!(features.slope, 0.0);
    }

    #[test]
    fn test_population_variance() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let features = extract(&window(&values)).unwrap();
        // Population (not sample) variance of this set is exactly 4
        assert!((features.variance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_plateau_is_not_a_peak() {
        let features = extract(&window(&[1.0, 2.0, 2.0, 1.0])).unwrap();
        assert_eq!(features.peak_count, 0);
    }

    #[test]
    fn test_custom_margin() {
        let values = window(&[1.0, 1.2, 0.9, 1.3, 1.0]);
        assert_eq!(extract_with_margin(&values, 0.0).unwrap().peak_count, 2);
        // Threshold 1.23 keeps only 1.3
        assert_eq!(extract_with_margin(&values, 0.15).unwrap().peak_count, 1);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let values = window(&[1.4, 1.9, 1.6, 2.2, 1.8, 2.5, 2.0]);
        assert_eq!(extract(&values), extract(&values));
    }
}
