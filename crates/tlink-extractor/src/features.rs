//! Reference feature extractors
//!
//! Generic, non-linguistic extractors used by the command line and tests.
//! Extractors backed by an external resource are built through
//! [`relation_or_noop`] / [`token_or_noop`], which substitute [`NoOp`] when
//! the resource cannot be loaded.

use std::collections::HashMap;
use std::path::Path;

use tlink_core::{
    Document, Feature, RelationFeatureExtractor, Result, Span, TlinkError, TokenFeatureExtractor,
};

// ============================================================================
// Degradation
// ============================================================================

/// Contributes no features
#[derive(Debug, Clone)]
pub struct NoOp {
    name: String,
}

impl NoOp {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RelationFeatureExtractor for NoOp {
    fn extract(&self, _document: &Document, _arg1: &Span, _arg2: &Span) -> Vec<Feature> {
        Vec::new()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TokenFeatureExtractor for NoOp {
    fn extract(&self, _document: &Document, _token: &Span, _sentence: &Span) -> Vec<Feature> {
        Vec::new()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Box a loaded relation extractor, or a [`NoOp`] if loading failed
pub fn relation_or_noop<E>(name: &str, loaded: Result<E>) -> Box<dyn RelationFeatureExtractor>
where
    E: RelationFeatureExtractor + 'static,
{
    match loaded {
        Ok(extractor) => Box::new(extractor),
        Err(e) => {
            tracing::warn!(extractor = name, error = %e, "Extractor resource unavailable; contributing no features");
            Box::new(NoOp::new(name))
        }
    }
}

/// Box a loaded token extractor, or a [`NoOp`] if loading failed
pub fn token_or_noop<E>(name: &str, loaded: Result<E>) -> Box<dyn TokenFeatureExtractor>
where
    E: TokenFeatureExtractor + 'static,
{
    match loaded {
        Ok(extractor) => Box::new(extractor),
        Err(e) => {
            tracing::warn!(extractor = name, error = %e, "Extractor resource unavailable; contributing no features");
            Box::new(NoOp::new(name))
        }
    }
}

// ============================================================================
// Relation Extractors
// ============================================================================

/// Types of both arguments and their combination
#[derive(Debug, Clone, Default)]
pub struct ArgumentTypes;

impl RelationFeatureExtractor for ArgumentTypes {
    fn extract(&self, _document: &Document, arg1: &Span, arg2: &Span) -> Vec<Feature> {
        vec![
            Feature::text("arg1_kind", arg1.kind.clone()),
            Feature::text("arg2_kind", arg2.kind.clone()),
            Feature::text("kind_pair", format!("{}_{}", arg1.kind, arg2.kind)),
        ]
    }

    fn name(&self) -> &str {
        "argument-types"
    }
}

/// Number of tokens between the two arguments, and which comes first
#[derive(Debug, Clone, Default)]
pub struct TokenDistance;

impl RelationFeatureExtractor for TokenDistance {
    fn extract(&self, document: &Document, arg1: &Span, arg2: &Span) -> Vec<Feature> {
        let (left, right) = if arg1 <= arg2 { (arg1, arg2) } else { (arg2, arg1) };
        let between = document
            .tokens
            .iter()
            .filter(|t| t.begin >= left.end && t.end <= right.begin)
            .count();
        vec![
            Feature::number("token_distance", between as f64),
            Feature::flag("arg1_first", arg1.begin <= arg2.begin),
        ]
    }

    fn name(&self) -> &str {
        "token-distance"
    }
}

// ============================================================================
// Token Extractors
// ============================================================================

/// Lowercased token text and a digit flag
#[derive(Debug, Clone, Default)]
pub struct CoveredText;

impl TokenFeatureExtractor for CoveredText {
    fn extract(&self, document: &Document, token: &Span, _sentence: &Span) -> Vec<Feature> {
        let text = document.covered_text(token);
        vec![
            Feature::text("word", text.to_lowercase()),
            Feature::flag("has_digit", text.chars().any(|c| c.is_ascii_digit())),
        ]
    }

    fn name(&self) -> &str {
        "covered-text"
    }
}

// ============================================================================
// Word Vectors
// ============================================================================

/// Word embeddings read from a text file with one `word v1 v2 ...` entry
/// per line
#[derive(Debug, Clone)]
pub struct WordVectors {
    dimensions: usize,
    vectors: HashMap<String, Vec<f64>>,
}

impl WordVectors {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut dimensions = 0;
        let mut vectors = HashMap::new();

        for (line_no, line) in content.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let values = fields
                .map(str::parse::<f64>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| {
                    TlinkError::InvalidInput(format!("vectors line {}: {}", line_no + 1, e))
                })?;

            if dimensions == 0 {
                dimensions = values.len();
            } else if values.len() != dimensions {
                return Err(TlinkError::InvalidInput(format!(
                    "vectors line {}: expected {} values, found {}",
                    line_no + 1,
                    dimensions,
                    values.len()
                )));
            }
            vectors.insert(word.to_lowercase(), values);
        }

        if vectors.is_empty() {
            return Err(TlinkError::InvalidInput("vectors file is empty".to_string()));
        }
        tracing::debug!(words = vectors.len(), dimensions, "Loaded word vectors");
        Ok(Self {
            dimensions,
            vectors,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn get(&self, word: &str) -> Option<&[f64]> {
        self.vectors.get(&word.to_lowercase()).map(Vec::as_slice)
    }

    /// Mean vector of the known tokens inside `span`
    fn mean_over(&self, document: &Document, span: &Span) -> Option<Vec<f64>> {
        let mut sum = vec![0.0; self.dimensions];
        let mut found = 0usize;
        for token in document.tokens_in(span) {
            if let Some(v) = self.get(document.covered_text(token)) {
                sum.iter_mut().zip(v).for_each(|(s, x)| *s += x);
                found += 1;
            }
        }
        (found > 0).then(|| sum.into_iter().map(|s| s / found as f64).collect())
    }
}

fn vector_features(prefix: &str, vector: &[f64]) -> Vec<Feature> {
    vector
        .iter()
        .enumerate()
        .map(|(i, x)| Feature::number(format!("{}_{}", prefix, i), *x))
        .collect()
}

impl TokenFeatureExtractor for WordVectors {
    fn extract(&self, document: &Document, token: &Span, _sentence: &Span) -> Vec<Feature> {
        self.get(document.covered_text(token))
            .map(|v| vector_features("emb", v))
            .unwrap_or_default()
    }

    fn name(&self) -> &str {
        "word-vectors"
    }
}

impl RelationFeatureExtractor for WordVectors {
    fn extract(&self, document: &Document, arg1: &Span, arg2: &Span) -> Vec<Feature> {
        let mut features = Vec::new();
        if let Some(v) = self.mean_over(document, arg1) {
            features.extend(vector_features("arg1_emb", &v));
        }
        if let Some(v) = self.mean_over(document, arg2) {
            features.extend(vector_features("arg2_emb", &v));
        }
        features
    }

    fn name(&self) -> &str {
        "word-vectors"
    }
}

// ============================================================================
// Tests
// ============================================================================
