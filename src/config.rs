//! Configuration for NeuroGuard.

use crate::core::features::PEAK_MARGIN_US;
use crate::core::labeling::DROWSY_REACTION_TIME_MS;
use crate::core::predictor::{PREDICTOR_GSR_FLOOR_US, PREDICTOR_REACTION_TIME_MS};
use crate::core::windowing::DEFAULT_LOOKBACK_MS;
use crate::core::{DatasetBuilder, Labeler, ThresholdPredictor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Feature and labeling parameters
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Text-generation commentary settings
    #[serde(default)]
    pub commentary: CommentarySettings,

    /// Path for exported dataset snapshots
    pub export_path: PathBuf,

    /// Path for the inference history and other state
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("neuroguard");

        Self {
            pipeline: PipelineConfig::default(),
            commentary: CommentarySettings::default(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("neuroguard")
            .join("config.json")
    }

    /// Path of the persisted inference history.
    pub fn history_path(&self) -> PathBuf {
        self.data_path.join("inference_history.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Windowing, feature and labeling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Look-back interval before each trial (ms)
    pub lookback_ms: i64,
    /// Margin above the window mean for phasic peaks (µS)
    pub peak_margin_us: f64,
    /// Reaction time above which a trial is labeled drowsy (ms)
    pub drowsy_reaction_time_ms: i64,
    /// Reaction time above which a single sample is predicted drowsy (ms)
    pub predictor_reaction_time_ms: f64,
    /// GSR mean below which a single sample is predicted drowsy (µS)
    pub predictor_gsr_floor_us: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_ms: DEFAULT_LOOKBACK_MS,
            peak_margin_us: PEAK_MARGIN_US,
            drowsy_reaction_time_ms: DROWSY_REACTION_TIME_MS,
            predictor_reaction_time_ms: PREDICTOR_REACTION_TIME_MS,
            predictor_gsr_floor_us: PREDICTOR_GSR_FLOOR_US,
        }
    }
}

impl PipelineConfig {
    pub fn dataset_builder(&self) -> DatasetBuilder {
        DatasetBuilder::new(
            self.lookback_ms,
            self.peak_margin_us,
            Labeler::new(self.drowsy_reaction_time_ms),
        )
    }

    pub fn predictor(&self) -> ThresholdPredictor {
        ThresholdPredictor::new(self.predictor_reaction_time_ms, self.predictor_gsr_floor_us)
    }
}

/// Settings for the external commentary service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentarySettings {
    /// Base URL of the generation API
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Request timeout
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for CommentarySettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
