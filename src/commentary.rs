//! Natural-language commentary from an external text-generation service.
//!
//! Commentary is a side channel. Numeric results are computed and shown
//! first; the text is requested afterwards and any failure is replaced with
//! a fixed fallback message. Nothing here feeds back into the pipeline.

use crate::config::CommentarySettings;
use crate::core::labeling::Label;
use crate::core::metrics::{FeatureImportance, ModelMetrics};
#[cfg(feature = "commentary")]
use crate::core::metrics::ModelReport;
use crate::core::predictor::PredictionInput;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shown when the results analysis could not be generated.
pub const ANALYSIS_FALLBACK: &str =
    "Failed to load expert insights. Please ensure API_KEY is valid.";

/// Shown when the clinical commentary could not be generated.
pub const COMMENTARY_FALLBACK: &str =
    "Clinical commentary is unavailable. The prediction above is unaffected.";

/// Used when the service answers with no text.
pub const EMPTY_ANALYSIS: &str = "No analysis generated.";

/// Used when the service answers with no text.
pub const EMPTY_COMMENTARY: &str = "Interpretation unavailable.";

/// Environment variables checked for the API key, in order.
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Commentary client configuration.
#[derive(Debug, Clone)]
pub struct CommentaryConfig {
    /// Base URL of the generation API
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// API key sent with every request
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl CommentaryConfig {
    /// Create a configuration from settings and an explicit key.
    pub fn new(settings: &CommentarySettings, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: api_key.into(),
            timeout: settings.timeout,
        }
    }

    /// Create a configuration reading the API key from the environment.
    pub fn from_env(settings: &CommentarySettings) -> Result<Self, CommentaryError> {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                CommentaryError::Config(format!(
                    "No API key found (set {})",
                    API_KEY_VARS.join(" or ")
                ))
            })?;
        Ok(Self::new(settings, api_key))
    }

    /// Get the generation endpoint URL.
    pub fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Commentary client error types.
#[derive(Debug)]
pub enum CommentaryError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
    /// The request did not finish in time
    Timeout,
}

impl std::fmt::Display for CommentaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentaryError::Config(msg) => write!(f, "Commentary config error: {msg}"),
            CommentaryError::Network(msg) => write!(f, "Commentary network error: {msg}"),
            CommentaryError::Server { status, message } => {
                write!(f, "Commentary server error ({status}): {message}")
            }
            CommentaryError::Serialization(msg) => {
                write!(f, "Commentary serialization error: {msg}")
            }
            CommentaryError::Timeout => write!(f, "Commentary request timed out"),
        }
    }
}

impl std::error::Error for CommentaryError {}

/// Request body of `generateContent`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.into()),
                }],
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

impl GenerateResponse {
    /// Text of the first candidate, or `None` if it carries none.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Prompt asking for an interpretation of the model report.
pub fn analysis_prompt(metrics: &ModelMetrics, importances: &[FeatureImportance]) -> String {
    let importance_lines: Vec<String> = importances
        .iter()
        .map(|i| format!("- {}: {:.1}%", i.feature, i.importance * 100.0))
        .collect();

    format!(
        "Act as a senior biomedical signal processing researcher.\n\
         Analyze the following ML model results for Drowsiness Detection using GSR and Stroop tests:\n\
         \n\
         Metrics:\n\
         - Accuracy: {:.1}%\n\
         - Precision: {:.1}%\n\
         - Recall: {:.1}%\n\
         - F1 Score: {:.1}%\n\
         \n\
         Feature Importances:\n\
         {}\n\
         \n\
         Explain:\n\
         1. Why the metrics are at this level.\n\
         2. Why certain features (like Stroop RT or GSR Mean) dominate the classification.\n\
         3. Suggestions for improving accuracy (e.g., HRV, EOG, or deep learning).\n\
         \n\
         Keep the explanation academic yet accessible for a final-year engineering student.",
        metrics.accuracy * 100.0,
        metrics.precision * 100.0,
        metrics.recall * 100.0,
        metrics.f1 * 100.0,
        importance_lines.join("\n")
    )
}

/// Prompt asking for a short clinical reading of one prediction.
pub fn commentary_prompt(input: &PredictionInput, label: Label) -> String {
    format!(
        "As a biomedical researcher, provide a brief (2-3 sentences) clinical interpretation for these subject values:\n\
         - Reaction Time: {} ms\n\
         - GSR Mean: {} uS\n\
         - SCR Peak Count: {}\n\
         - Predicted State: {}\n\
         \n\
         Explain the physiological significance of these specific values.",
        input.rt_ms, input.gsr_mean, input.peak_count, label
    )
}

/// Collapse a commentary outcome into display text.
///
/// `Ok(None)` means the service answered without text.
pub fn resolve(
    outcome: Result<Option<String>, CommentaryError>,
    empty: &str,
    fallback: &str,
) -> String {
    match outcome {
        Ok(Some(text)) => text,
        Ok(None) => empty.to_string(),
        Err(e) => {
            tracing::warn!("Commentary failed: {e}");
            fallback.to_string()
        }
    }
}

/// Async client for the generation service.
#[cfg(feature = "commentary")]
pub struct CommentaryClient {
    config: CommentaryConfig,
    client: reqwest::Client,
}

#[cfg(feature = "commentary")]
impl CommentaryClient {
    /// Create a new commentary client.
    pub fn new(config: CommentaryConfig) -> Result<Self, CommentaryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CommentaryError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Create a client with the API key taken from the environment.
    pub fn from_env(settings: &CommentarySettings) -> Result<Self, CommentaryError> {
        Self::new(CommentaryConfig::from_env(settings)?)
    }

    /// Send one prompt and return the generated text, if any.
    pub async fn generate(&self, prompt: String) -> Result<Option<String>, CommentaryError> {
        let request = GenerateRequest::from_prompt(prompt);

        let response = self
            .client
            .post(self.config.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CommentaryError::Timeout
                } else {
                    CommentaryError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CommentaryError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CommentaryError::Serialization(e.to_string()))?;

        Ok(body.text())
    }

    /// Interpretation of a model report.
    pub async fn analyze_results(&self, report: &ModelReport) -> String {
        let prompt = analysis_prompt(&report.metrics, &report.importances);
        resolve(self.generate(prompt).await, EMPTY_ANALYSIS, ANALYSIS_FALLBACK)
    }

    /// Clinical reading of one prediction.
    pub async fn clinical_commentary(&self, input: &PredictionInput, label: Label) -> String {
        let prompt = commentary_prompt(input, label);
        resolve(
            self.generate(prompt).await,
            EMPTY_COMMENTARY,
            COMMENTARY_FALLBACK,
        )
    }
}

/// Request the results analysis on a background task.
///
/// The task always completes with display text; the caller can await or
/// abort it without affecting any numeric result.
#[cfg(feature = "commentary")]
pub fn spawn_analysis(
    client: std::sync::Arc<CommentaryClient>,
    report: ModelReport,
) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move { client.analyze_results(&report).await })
}

/// Request clinical commentary on a background task.
#[cfg(feature = "commentary")]
pub fn spawn_commentary(
    client: std::sync::Arc<CommentaryClient>,
    input: PredictionInput,
    label: Label,
) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move { client.clinical_commentary(&input, label).await })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url() {
        let mut settings = CommentarySettings::default();
        settings.endpoint = "http://127.0.0.1:8080/v1beta/".to_string();
        settings.model = "test-model".to_string();

        let config = CommentaryConfig::new(&settings, "key");
        assert_eq!(
            config.generate_url(),
            "http://127.0.0.1:8080/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn test_analysis_prompt_contents() {
        let metrics = ModelMetrics {
            accuracy: 0.955,
            precision: 0.95,
            recall: 0.94,
            f1: 0.945,
        };
        let importances = vec![
            FeatureImportance::new("Stroop RT", 0.65),
            FeatureImportance::new("GSR Mean", 0.2),
        ];
        let prompt = analysis_prompt(&metrics, &importances);

        assert!(prompt.contains("- Accuracy: 95.5%"));
        assert!(prompt.contains("- Stroop RT: 65.0%"));
        assert!(prompt.contains("- GSR Mean: 20.0%"));
    }

    #[test]
    fn test_commentary_prompt_contents() {
        let prompt = commentary_prompt(&PredictionInput::new(1250.0, 1.3, 4), Label::Drowsy);

        assert!(prompt.contains("Reaction Time: 1250 ms"));
        assert!(prompt.contains("GSR Mean: 1.3 uS"));
        assert!(prompt.contains("SCR Peak Count: 4"));
        assert!(prompt.contains("Predicted State: Drowsy"));
    }

    #[test]
    fn test_response_text() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Elevated "},{"text":"RT."}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("Elevated RT."));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);

        let blank: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#)
                .unwrap();
        assert_eq!(blank.text(), None);
    }

    #[test]
    fn test_request_shape() {
        let value = serde_json::to_value(GenerateRequest::from_prompt("hello")).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_resolve_fallbacks() {
        assert_eq!(
            resolve(Ok(Some("text".to_string())), EMPTY_ANALYSIS, ANALYSIS_FALLBACK),
            "text"
        );
        assert_eq!(resolve(Ok(None), EMPTY_ANALYSIS, ANALYSIS_FALLBACK), EMPTY_ANALYSIS);
        assert_eq!(
            resolve(Err(CommentaryError::Timeout), EMPTY_ANALYSIS, ANALYSIS_FALLBACK),
            ANALYSIS_FALLBACK
        );
    }

    #[test]
    fn test_error_display() {
        let err = CommentaryError::Server {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Commentary server error (503): unavailable");
    }

    #[cfg(feature = "commentary")]
    #[tokio::test]
    async fn test_unreachable_service_falls_back() {
        let mut settings = CommentarySettings::default();
        // Nothing listens on the discard port
        settings.endpoint = "http://127.0.0.1:9".to_string();
        settings.timeout = Duration::from_secs(2);

        let client = std::sync::Arc::new(
            CommentaryClient::new(CommentaryConfig::new(&settings, "key")).unwrap(),
        );
        let text = spawn_commentary(client, PredictionInput::default(), Label::Alert)
            .await
            .unwrap();

        assert_eq!(text, COMMENTARY_FALLBACK);
    }
}
