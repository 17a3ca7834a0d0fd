//! Document and annotation index
//!
//! A [`Document`] holds the input layers an annotator reads (segments,
//! sentences, tokens, mentions, gold relations, an optional dependency
//! parse) and an append-only [`AnnotationIndex`] for system output.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DependencyGraph, Relation, Result, ScoredSpan, Span, TlinkError};

/// Unit an annotator walks over when producing candidates. Variants are
/// ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    #[default]
    Sentence,
    Segment,
    Document,
}

impl std::str::FromStr for ScopeKind {
    type Err = TlinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sentence" => Ok(Self::Sentence),
            "segment" | "section" => Ok(Self::Segment),
            "document" => Ok(Self::Document),
            _ => Err(TlinkError::InvalidInput(format!("unknown scope: {}", s))),
        }
    }
}

/// System output for one document. Entries are only ever appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationIndex {
    #[serde(default)]
    spans: Vec<ScoredSpan>,

    #[serde(default)]
    relations: Vec<Relation>,
}

impl AnnotationIndex {
    pub fn spans(&self) -> &[ScoredSpan] {
        &self.spans
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn add_span(&mut self, span: ScoredSpan) {
        self.spans.push(span);
    }

    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.relations.is_empty()
    }
}

/// A tokenized, sentence/section-segmented document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Raw text
    #[serde(default)]
    pub text: String,

    /// Sections; empty means the whole document is one segment
    #[serde(default)]
    pub segments: Vec<Span>,

    #[serde(default)]
    pub sentences: Vec<Span>,

    #[serde(default)]
    pub tokens: Vec<Span>,

    /// Events, times and other identified mentions
    #[serde(default)]
    pub mentions: Vec<Span>,

    /// Gold relations (training input)
    #[serde(default)]
    pub relations: Vec<Relation>,

    /// Optional dependency parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyGraph>,

    /// System output
    #[serde(default)]
    pub output: AnnotationIndex,
}

impl Document {
    /// Create an empty document over `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            segments: Vec::new(),
            sentences: Vec::new(),
            tokens: Vec::new(),
            mentions: Vec::new(),
            relations: Vec::new(),
            dependencies: None,
            output: AnnotationIndex::default(),
        }
    }

    /// Parse a document from JSON and put every layer into document order
    pub fn from_json(json: &str) -> Result<Self> {
        let mut doc: Self = serde_json::from_str(json)
            .map_err(|e| TlinkError::InvalidInput(format!("malformed document: {}", e)))?;
        doc.normalize();
        Ok(doc)
    }

    /// Sort every span layer into document order
    pub fn normalize(&mut self) {
        self.segments.sort();
        self.sentences.sort();
        self.tokens.sort();
        self.mentions.sort();
    }

    /// Add whitespace-delimited tokens and a single sentence covering them.
    /// Used by tests and small fixtures.
    pub fn tokenized(text: impl Into<String>) -> Self {
        let mut doc = Self::new(text);
        let mut start = None;
        for (i, c) in doc.text.char_indices() {
            match (c.is_whitespace(), start) {
                (true, Some(s)) => {
                    doc.tokens.push(Span::new(s, i, "Token"));
                    start = None;
                }
                (false, None) => start = Some(i),
                _ => {}
            }
        }
        if let Some(s) = start {
            doc.tokens.push(Span::new(s, doc.text.len(), "Token"));
        }
        if let (Some(first), Some(last)) = (doc.tokens.first(), doc.tokens.last()) {
            doc.sentences.push(Span::new(first.begin, last.end, "Sentence"));
        }
        doc
    }

    pub fn with_sentences(mut self, sentences: Vec<Span>) -> Self {
        self.sentences = sentences;
        self.sentences.sort();
        self
    }

    pub fn with_segments(mut self, segments: Vec<Span>) -> Self {
        self.segments = segments;
        self.segments.sort();
        self
    }

    pub fn with_mention(mut self, mention: Span) -> Self {
        self.add_mention(mention);
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_dependencies(mut self, graph: DependencyGraph) -> Self {
        self.dependencies = Some(graph);
        self
    }

    /// Insert a mention, keeping document order
    pub fn add_mention(&mut self, mention: Span) {
        let at = self.mentions.partition_point(|m| m <= &mention);
        self.mentions.insert(at, mention);
    }

    /// Span covering the whole document
    pub fn extent(&self) -> Span {
        let end = self
            .tokens
            .last()
            .map(|t| t.end)
            .into_iter()
            .chain(self.sentences.iter().map(|s| s.end))
            .chain(self.mentions.iter().map(|m| m.end))
            .fold(self.text.len(), std::cmp::max);
        Span::new(0, end, "Document")
    }

    /// Scopes of the given kind, in document order
    pub fn scopes(&self, kind: ScopeKind) -> Vec<Span> {
        match kind {
            ScopeKind::Sentence => self.sentences.clone(),
            ScopeKind::Segment if !self.segments.is_empty() => self.segments.clone(),
            ScopeKind::Segment | ScopeKind::Document => vec![self.extent()],
        }
    }

    /// Tokens inside `scope`
    pub fn tokens_in(&self, scope: &Span) -> Vec<&Span> {
        covered(&self.tokens, scope)
    }

    /// Sentences inside `scope`
    pub fn sentences_in(&self, scope: &Span) -> Vec<&Span> {
        covered(&self.sentences, scope)
    }

    /// Mentions of `kind` inside `scope`, including non-canonical ones
    pub fn mentions_in(&self, kind: &str, scope: &Span) -> Vec<&Span> {
        covered(&self.mentions, scope)
            .into_iter()
            .filter(|m| m.kind == kind)
            .collect()
    }

    /// Mentions of `kind` that cover `target`
    pub fn mentions_covering(&self, kind: &str, target: &Span) -> Vec<&Span> {
        self.mentions
            .iter()
            .filter(|m| m.kind == kind && m.contains(target))
            .collect()
    }

    /// Gold relations with both arguments inside `scope`
    pub fn relations_in(&self, scope: &Span) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| scope.contains(&r.arg1) && scope.contains(&r.arg2))
            .collect()
    }

    /// Text covered by `span`, or an empty string for out-of-range offsets
    pub fn covered_text(&self, span: &Span) -> &str {
        span.covered_text(&self.text).unwrap_or_default()
    }
}

fn covered<'a>(layer: &'a [Span], scope: &Span) -> Vec<&'a Span> {
    layer.iter().filter(|s| scope.contains(s)).collect()
}
