use facecard_ar::WorldPositionResolver;
use facecard_core::cards::DEFAULT_CARD_SCALE;
use facecard_core::classifier::DEFAULT_CONFIDENCE_THRESHOLD;
use facecard_core::{CardLayout, ClassifierError, ConfidenceGate, OnnxClassifier, RosterSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Pipeline configuration: defaults, optionally a TOML file, then
/// `FACECARD_*` environment overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Classifications at or below this confidence are ignored.
    pub confidence_threshold: f32,
    /// Hit-test samples averaged per world position.
    pub hit_samples: usize,
    /// Delay between hit-test samples, in milliseconds.
    pub hit_interval_ms: u64,
    /// Hits closer to the camera than this (meters) are discarded.
    pub min_hit_distance: f32,
    /// Overall size factor for cards.
    pub card_scale: f32,
    /// Roster JSON file; the bundled roster when unset.
    pub roster_path: Option<PathBuf>,
    /// ONNX identity classifier.
    pub model_path: Option<PathBuf>,
    /// Newline-separated labels for the classifier outputs.
    pub labels_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            hit_samples: 3,
            hit_interval_ms: 12,
            min_hit_distance: 0.10,
            card_scale: DEFAULT_CARD_SCALE,
            roster_path: None,
            model_path: None,
            labels_path: None,
        }
    }
}

impl Config {
    /// Defaults with `FACECARD_*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides().validated()
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)?.with_env_overrides().validated()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validated()
    }

    fn with_env_overrides(mut self) -> Self {
        self.confidence_threshold =
            env_f32("FACECARD_CONFIDENCE_THRESHOLD", self.confidence_threshold);
        self.hit_samples = env_usize("FACECARD_HIT_SAMPLES", self.hit_samples);
        self.hit_interval_ms = env_u64("FACECARD_HIT_INTERVAL_MS", self.hit_interval_ms);
        self.min_hit_distance = env_f32("FACECARD_MIN_HIT_DISTANCE", self.min_hit_distance);
        self.card_scale = env_f32("FACECARD_CARD_SCALE", self.card_scale);
        if let Ok(path) = std::env::var("FACECARD_ROSTER_PATH") {
            self.roster_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("FACECARD_MODEL_PATH") {
            self.model_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("FACECARD_LABELS_PATH") {
            self.labels_path = Some(PathBuf::from(path));
        }
        self
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be within 0..=1, got {}",
                self.confidence_threshold
            )));
        }
        if self.hit_samples == 0 {
            return Err(ConfigError::Invalid("hit_samples must be at least 1".into()));
        }
        if !(self.min_hit_distance >= 0.0 && self.min_hit_distance.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "min_hit_distance must be a finite non-negative number, got {}",
                self.min_hit_distance
            )));
        }
        if !(self.card_scale > 0.0 && self.card_scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "card_scale must be a finite positive number, got {}",
                self.card_scale
            )));
        }
        Ok(self)
    }

    pub fn gate(&self) -> ConfidenceGate {
        ConfidenceGate::new(self.confidence_threshold)
    }

    pub fn resolver(&self) -> WorldPositionResolver {
        WorldPositionResolver::new(
            self.hit_samples,
            Duration::from_millis(self.hit_interval_ms),
            self.min_hit_distance,
        )
    }

    pub fn card_layout(&self) -> CardLayout {
        CardLayout::with_scale(self.card_scale)
    }

    pub fn roster_source(&self) -> RosterSource {
        match &self.roster_path {
            Some(path) => RosterSource::File(path.clone()),
            None => RosterSource::Bundled,
        }
    }

    /// Load the ONNX classifier if a model is configured.
    ///
    /// A configured but unloadable model is an error the caller must treat
    /// as fatal; without its classifier the pipeline cannot recognize anyone.
    pub fn load_classifier(&self) -> Result<Option<OnnxClassifier>, ClassifierError> {
        let Some(model_path) = &self.model_path else {
            return Ok(None);
        };
        let labels = match &self.labels_path {
            Some(path) => OnnxClassifier::load_labels(path)?,
            None => {
                return Err(ClassifierError::LabelsMissing(
                    model_path.display().to_string(),
                ))
            }
        };
        OnnxClassifier::load(&model_path.to_string_lossy(), labels).map(Some)
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.confidence_threshold, 0.35);
        assert_eq!(config.hit_samples, 3);
        assert_eq!(config.hit_interval_ms, 12);
        assert_eq!(config.min_hit_distance, 0.10);
        assert!(matches!(config.roster_source(), RosterSource::Bundled));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str("confidence_threshold = 0.5\n").unwrap();
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.hit_samples, 3);
        assert_eq!(config.gate().threshold(), 0.5);
    }

    #[test]
    fn test_roster_path_from_toml() {
        let config = Config::from_toml_str("roster_path = \"/srv/roster.json\"\n").unwrap();
        match config.roster_source() {
            RosterSource::File(path) => assert_eq!(path, PathBuf::from("/srv/roster.json")),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_zero_samples() {
        let err = Config::from_toml_str("hit_samples = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_nan_values() {
        let err = Config::from_toml_str("min_hit_distance = nan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = Config::from_toml_str("card_scale = nan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = Config::from_toml_str("confidence_threshold = nan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = Config::from_toml_str("card_scale = inf\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let err = Config::from_toml_str("confidence_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = Config::from_toml_str("hit_samples = \"three\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hit_samples = 5\ncard_scale = 1.0\n").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.resolver().samples(), 5);
        assert!((config.card_layout().width - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_no_model_configured() {
        assert!(Config::default().load_classifier().unwrap().is_none());
    }

    #[test]
    fn test_model_without_labels_is_error() {
        let config = Config {
            model_path: Some(PathBuf::from("/srv/identities.onnx")),
            ..Config::default()
        };
        let err = config.load_classifier().err().unwrap();
        assert!(matches!(err, ClassifierError::LabelsMissing(_)));
    }

    #[test]
    fn test_missing_model_is_error() {
        let mut labels = tempfile::NamedTempFile::new().unwrap();
        labels.write_all(b"Alice\nBob\n").unwrap();
        let config = Config {
            model_path: Some(PathBuf::from("/nonexistent/identities.onnx")),
            labels_path: Some(labels.path().to_path_buf()),
            ..Config::default()
        };
        let err = config.load_classifier().err().unwrap();
        assert!(matches!(err, ClassifierError::ModelNotFound(_)));
    }
}
