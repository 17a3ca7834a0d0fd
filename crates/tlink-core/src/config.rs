//! tlink Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with defaults that reproduce the reference training behavior.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Class-imbalance sampling
    pub sampler: SamplerConfig,

    /// Relation classification
    pub relations: RelationConfig,

    /// Span tagging
    pub tagging: TaggingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variables on top of this configuration (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        self.validate()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(p) = env_parse::<f64>("TLINK_NEGATIVE_RETENTION")? {
            self.sampler.negative_retention = p;
        }
        if let Some(k) = env_parse::<usize>("TLINK_SMOTE_NEIGHBORS")? {
            self.sampler.smote_neighbors = k;
        }
        if let Some(seed) = env_parse::<u64>("TLINK_SEED")? {
            self.sampler.seed = seed;
        }
        if let Ok(label) = std::env::var("TLINK_NO_RELATION_LABEL") {
            self.relations.no_relation_label = label;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.sampler.negative_retention;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::InvalidValue {
                key: "sampler.negative_retention".to_string(),
                value: p.to_string(),
            });
        }
        if self.relations.no_relation_label.is_empty() {
            return Err(ConfigError::MissingRequired(
                "relations.no_relation_label".to_string(),
            ));
        }
        if self.relations.inversion_marker.is_empty() {
            return Err(ConfigError::MissingRequired(
                "relations.inversion_marker".to_string(),
            ));
        }
        if self.tagging.out_of_bounds_label.is_empty() {
            return Err(ConfigError::MissingRequired(
                "tagging.out_of_bounds_label".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Negative retention and minority oversampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Probability that a negative example is kept for training
    pub negative_retention: f64,

    /// Nearest neighbours used for synthetic oversampling; 0 disables it
    pub smote_neighbors: usize,

    /// Seed for the retention coin and the interpolation draws
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            negative_retention: 1.0,
            smote_neighbors: 0,
            seed: 0,
        }
    }
}

/// Relation labelling and category inversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Label meaning "no relation holds"
    pub no_relation_label: String,

    /// Suffix marking a relation that holds with arguments swapped
    pub inversion_marker: String,

    /// Categories that read the same in both directions
    pub symmetric: Vec<String>,

    /// Pairs of categories that are each other's inverse
    pub opposites: Vec<(String, String)>,

    /// Take the argmax of the classifier's score distribution and attach it
    /// as confidence instead of calling plain classify
    pub use_scores: bool,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            no_relation_label: "-NONE-".to_string(),
            inversion_marker: "-1".to_string(),
            symmetric: vec!["OVERLAP".to_string()],
            opposites: vec![("BEFORE".to_string(), "AFTER".to_string())],
            use_scores: false,
        }
    }
}

/// Order in which a tagger walks the tokens of a sentence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Which token score becomes the confidence of a multi-token chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidencePolicy {
    First,
    #[default]
    Last,
    Mean,
    Min,
}

/// Sequence tagging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Number of preceding outcomes threaded into each token's features
    pub look_back: usize,

    /// Outcome used for positions before the start of the sentence
    pub out_of_bounds_label: String,

    pub direction: Direction,

    pub confidence: ConfidencePolicy,

    /// Emit `B-<tag>` / `I-<tag>` instead of bare `B` / `I`
    pub typed_labels: bool,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            look_back: 2,
            out_of_bounds_label: "O".to_string(),
            direction: Direction::Forward,
            confidence: ConfidencePolicy::Last,
            typed_labels: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.sampler.negative_retention, 1.0);
        assert_eq!(config.sampler.smote_neighbors, 0);
        assert_eq!(config.relations.no_relation_label, "-NONE-");
        assert_eq!(config.tagging.look_back, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [sampler]
            negative_retention = 0.25
            smote_neighbors = 3

            [tagging]
            direction = "backward"
            confidence = "mean"
            "#,
        )
        .unwrap();

        assert_eq!(config.sampler.negative_retention, 0.25);
        assert_eq!(config.sampler.smote_neighbors, 3);
        assert_eq!(config.sampler.seed, 0);
        assert_eq!(config.tagging.direction, Direction::Backward);
        assert_eq!(config.tagging.confidence, ConfidencePolicy::Mean);
        assert_eq!(config.relations.inversion_marker, "-1");
    }

    #[test]
    fn test_opposites_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [relations]
            opposites = [["BEFORE", "AFTER"], ["BEGINS-ON", "ENDS-ON"]]
            "#,
        )
        .unwrap();
        assert_eq!(config.relations.opposites.len(), 2);
        assert_eq!(config.relations.symmetric, vec!["OVERLAP".to_string()]);
    }

    #[test]
    fn test_retention_out_of_range() {
        let mut config = PipelineConfig::default();
        config.sampler.negative_retention = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_file("/nonexistent/tlink.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }
}
