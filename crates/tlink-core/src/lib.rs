//! tlink Core - Domain models, collaborator traits, and shared types
//!
//! This crate defines the abstractions shared by every annotator:
//! - Spans, relations, features and training instances
//! - The per-document annotation store
//! - Collaborator traits (feature extraction, classification, data writing)
//! - Common error types
//! - Configuration management

pub mod config;
pub mod dependency;
pub mod document;

pub use config::{
    ConfidencePolicy, ConfigError, Direction, LoggingConfig, PipelineConfig, RelationConfig,
    SamplerConfig, TaggingConfig,
};
pub use dependency::{DependencyGraph, DependencyIndex, DependencyNode};
pub use document::{AnnotationIndex, Document, ScopeKind};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for tlink operations
#[derive(Error, Debug)]
pub enum TlinkError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Data writer error: {0}")]
    DataWriter(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for TlinkError {
    fn from(e: ConfigError) -> Self {
        Self::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TlinkError>;

// ============================================================================
// Spans
// ============================================================================

/// An offset-delimited, typed region of text.
///
/// The derived ordering (begin, end, kind, canonical) is the stable comparator
/// used wherever a pair of spans has to be put into a canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Character offset of the first character
    pub begin: usize,

    /// Character offset one past the last character
    pub end: usize,

    /// Type tag (e.g. "EVENT", "TIMEX", "Token")
    pub kind: String,

    /// Whether this is the plain mention type used for candidate generation,
    /// as opposed to a specialised subtype from an overlapping layer
    #[serde(default = "default_canonical")]
    pub canonical: bool,
}

fn default_canonical() -> bool {
    true
}

impl Span {
    /// Create a canonical span
    pub fn new(begin: usize, end: usize, kind: impl Into<String>) -> Self {
        Self {
            begin,
            end,
            kind: kind.into(),
            canonical: true,
        }
    }

    /// Create a span of a specialised subtype (excluded from candidate generation)
    pub fn subtype(begin: usize, end: usize, kind: impl Into<String>) -> Self {
        Self {
            canonical: false,
            ..Self::new(begin, end, kind)
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `other` lies fully inside this span
    pub fn contains(&self, other: &Span) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// True if the two spans share at least one character
    pub fn overlaps(&self, other: &Span) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Same offsets, regardless of kind
    pub fn same_extent(&self, other: &Span) -> bool {
        self.begin == other.begin && self.end == other.end
    }

    /// The text this span covers, if the offsets are valid for `text`
    pub fn covered_text<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.begin..self.end)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}..{}]", self.kind, self.begin, self.end)
    }
}

/// A span emitted by a tagger, with the classifier's confidence if one was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSpan {
    pub span: Span,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ScoredSpan {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

// ============================================================================
// Relations
// ============================================================================

/// A binary relation between two spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Category label (e.g. "CONTAINS", "BEFORE")
    pub category: String,

    /// First argument
    pub arg1: Span,

    /// Second argument
    pub arg2: Span,

    /// Confidence score (0.0 - 1.0), for system output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Relation {
    /// Create a new relation
    pub fn new(category: impl Into<String>, arg1: Span, arg2: Span) -> Self {
        Self {
            category: category.into(),
            arg1,
            arg2,
            confidence: None,
        }
    }

    /// Set confidence score
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}, {})", self.category, self.arg1, self.arg2)
    }
}

// ============================================================================
// Features and Instances
// ============================================================================

/// Value of a single feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Null => write!(f, "{}", Feature::NULL_VALUE),
        }
    }
}

/// A named feature value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub value: FeatureValue,
}

impl Feature {
    /// Replacement text for missing feature values
    pub const NULL_VALUE: &'static str = "NULL";

    pub fn new(name: impl Into<String>, value: FeatureValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FeatureValue::Text(value.into()))
    }

    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, FeatureValue::Number(value))
    }

    pub fn flag(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, FeatureValue::Bool(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, FeatureValue::Null)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Replace missing feature values with [`Feature::NULL_VALUE`].
///
/// Returns the number of features that were rewritten.
pub fn sanitize_features(features: &mut [Feature]) -> usize {
    let mut replaced = 0;
    for feature in features.iter_mut().filter(|f| f.is_null()) {
        tracing::warn!(feature = %feature.name, "Null feature value replaced");
        feature.value = FeatureValue::Text(Feature::NULL_VALUE.to_string());
        replaced += 1;
    }
    replaced
}

/// A labelled feature vector handed to a data writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub label: String,
    pub features: Vec<Feature>,
}

impl Instance {
    pub fn new(label: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            label: label.into(),
            features,
        }
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Extracts features for a candidate argument pair.
///
/// Implementations must be deterministic and free of side effects.
pub trait RelationFeatureExtractor: Send + Sync {
    fn extract(&self, document: &Document, arg1: &Span, arg2: &Span) -> Vec<Feature>;

    /// Name used in log messages
    fn name(&self) -> &str;
}

/// Extracts features for a single token inside its sentence
pub trait TokenFeatureExtractor: Send + Sync {
    fn extract(&self, document: &Document, token: &Span, sentence: &Span) -> Vec<Feature>;

    /// Name used in log messages
    fn name(&self) -> &str;
}

/// A trained model consulted during prediction
pub trait Classifier: Send + Sync {
    /// Predict the single best label
    fn classify(&self, features: &[Feature]) -> Result<String>;

    /// Score every known label. The default wraps [`Classifier::classify`]
    /// with a score of 1.0.
    fn score(&self, features: &[Feature]) -> Result<Vec<(String, f64)>> {
        Ok(vec![(self.classify(features)?, 1.0)])
    }

    /// Release resources held by the model
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Accumulates training instances for later offline model fitting
pub trait DataWriter: Send {
    fn write(&mut self, instance: Instance) -> Result<()>;

    /// Flush buffered output at the end of a run
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_containment() {
        let outer = Span::new(0, 10, "Sentence");
        let inner = Span::new(2, 5, "Token");
        let straddling = Span::new(8, 12, "Token");

        assert!(outer.contains(&inner));
        assert!(!outer.contains(&straddling));
        assert!(outer.overlaps(&straddling));
        assert!(!inner.overlaps(&Span::new(5, 7, "Token")));
    }

    #[test]
    fn test_span_ordering_is_positional() {
        let mut spans = vec![
            Span::new(10, 12, "EVENT"),
            Span::new(0, 4, "TIMEX"),
            Span::new(0, 3, "EVENT"),
        ];
        spans.sort();
        assert_eq!(spans[0], Span::new(0, 3, "EVENT"));
        assert_eq!(spans[2].begin, 10);
    }

    #[test]
    fn test_subtype_is_not_canonical() {
        assert!(Span::new(0, 1, "EVENT").canonical);
        assert!(!Span::subtype(0, 1, "EVENT").canonical);
    }

    #[test]
    fn test_covered_text() {
        let text = "admitted on 1/1/2000";
        assert_eq!(Span::new(12, 20, "TIMEX").covered_text(text), Some("1/1/2000"));
        assert_eq!(Span::new(12, 40, "TIMEX").covered_text(text), None);
    }

    #[test]
    fn test_sanitize_features() {
        let mut features = vec![
            Feature::text("word", "admitted"),
            Feature::new("pos", FeatureValue::Null),
        ];
        assert_eq!(sanitize_features(&mut features), 1);
        assert_eq!(features[1].value, FeatureValue::Text("NULL".to_string()));
    }

    #[test]
    fn test_feature_value_json() {
        let features: Vec<Feature> = serde_json::from_str(
            r#"[{"name":"a","value":1.5},{"name":"b","value":"x"},{"name":"c","value":null}]"#,
        )
        .unwrap();
        assert_eq!(features[0].value.as_number(), Some(1.5));
        assert_eq!(features[1].value, FeatureValue::Text("x".to_string()));
        assert!(features[2].is_null());
    }

    #[test]
    fn test_default_score_wraps_classify() {
        struct Fixed;
        impl Classifier for Fixed {
            fn classify(&self, _features: &[Feature]) -> Result<String> {
                Ok("BEFORE".to_string())
            }
        }

        let scores = Fixed.score(&[]).unwrap();
        assert_eq!(scores, vec![("BEFORE".to_string(), 1.0)]);
    }

    #[test]
    fn test_relation_display() {
        let rel = Relation::new("CONTAINS", Span::new(0, 3, "EVENT"), Span::new(5, 9, "TIMEX"));
        assert_eq!(rel.to_string(), "CONTAINS(EVENT[0..3], TIMEX[5..9])");
    }
}
