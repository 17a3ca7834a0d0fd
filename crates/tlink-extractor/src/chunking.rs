//! BIO chunking
//!
//! Converts between typed spans and per-token Begin/Inside/Outside labels.
//!
//! The codec only assumes that sequence order is adjacency order. A caller
//! that walks a sentence backwards passes the reversed token list to both
//! [`BioChunking::create_outcomes`] and [`BioChunking::create_chunks`]; chunk
//! extents are computed from the minimum begin and maximum end of the run,
//! so the emitted spans are the same in either direction.

use std::borrow::Borrow;

use tlink_core::{ConfidencePolicy, Result, ScoredSpan, Span, TlinkError};

/// Label for a token outside every span
pub const OUTSIDE: &str = "O";

// ============================================================================
// Labels
// ============================================================================

/// A parsed BIO label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BioLabel {
    Outside,
    Begin(Option<String>),
    Inside(Option<String>),
}

impl BioLabel {
    /// Parse a label string. Anything that is not `B`, `I`, `B-<tag>` or
    /// `I-<tag>` reads as outside.
    pub fn parse(label: &str) -> Self {
        let (prefix, tag) = match label.split_once('-') {
            Some((prefix, tag)) => (prefix, Some(tag.to_string())),
            None => (label, None),
        };
        match prefix {
            "B" => Self::Begin(tag),
            "I" => Self::Inside(tag),
            _ => Self::Outside,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Begin(tag) | Self::Inside(tag) => tag.as_deref(),
            Self::Outside => None,
        }
    }

    pub fn is_outside(&self) -> bool {
        matches!(self, Self::Outside)
    }
}

impl std::fmt::Display for BioLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outside => write!(f, "{}", OUTSIDE),
            Self::Begin(None) => write!(f, "B"),
            Self::Inside(None) => write!(f, "I"),
            Self::Begin(Some(tag)) => write!(f, "B-{}", tag),
            Self::Inside(Some(tag)) => write!(f, "I-{}", tag),
        }
    }
}

// ============================================================================
// Codec
// ============================================================================

/// BIO codec for one output span type
#[derive(Debug, Clone)]
pub struct BioChunking {
    output_kind: String,
    typed: bool,
}

/// A run of tokens being assembled into a chunk
struct OpenChunk {
    tag: Option<String>,
    begin: usize,
    end: usize,
    first: usize,
    last: usize,
}

impl BioChunking {
    /// Codec emitting `B-<tag>` / `I-<tag>` labels, where the tag is the
    /// span's kind
    pub fn new(output_kind: impl Into<String>) -> Self {
        Self {
            output_kind: output_kind.into(),
            typed: true,
        }
    }

    /// Codec emitting bare `B` / `I` labels; every decoded span gets `output_kind`
    pub fn untyped(output_kind: impl Into<String>) -> Self {
        Self {
            output_kind: output_kind.into(),
            typed: false,
        }
    }

    pub fn output_kind(&self) -> &str {
        &self.output_kind
    }

    /// Label each token with the span that fully contains it.
    ///
    /// A token lying only partly inside a span is labelled outside. A span
    /// that contains no whole token therefore produces no labels at all.
    pub fn create_outcomes<T: Borrow<Span>>(&self, tokens: &[T], spans: &[Span]) -> Vec<String> {
        let mut outcomes = Vec::with_capacity(tokens.len());
        let mut used = vec![false; spans.len()];
        let mut previous: Option<usize> = None;

        for token in tokens {
            let token = token.borrow();
            let owner = spans.iter().position(|s| s.contains(token));

            let label = match owner {
                Some(idx) => {
                    used[idx] = true;
                    let tag = self.typed.then(|| spans[idx].kind.clone());
                    if previous == Some(idx) {
                        BioLabel::Inside(tag)
                    } else {
                        BioLabel::Begin(tag)
                    }
                }
                None => BioLabel::Outside,
            };
            previous = owner;
            outcomes.push(label.to_string());
        }

        for (span, _) in spans.iter().zip(&used).filter(|(_, used)| !**used) {
            tracing::debug!(span = %span, "Span covers no whole token; dropped from outcomes");
        }

        outcomes
    }

    /// Rebuild spans from a label sequence.
    ///
    /// `scores`, when given, holds one classifier score per token; the
    /// chunk's confidence is derived from its tokens' scores by `policy`.
    /// An `I` label that does not continue an open chunk of the same tag
    /// starts a new chunk.
    pub fn create_chunks<T: Borrow<Span>, L: AsRef<str>>(
        &self,
        tokens: &[T],
        outcomes: &[L],
        scores: Option<&[f64]>,
        policy: ConfidencePolicy,
    ) -> Result<Vec<ScoredSpan>> {
        if tokens.len() != outcomes.len() {
            return Err(TlinkError::InvalidInput(format!(
                "token count ({}) != outcome count ({})",
                tokens.len(),
                outcomes.len()
            )));
        }
        if let Some(scores) = scores {
            if scores.len() != tokens.len() {
                return Err(TlinkError::InvalidInput(format!(
                    "token count ({}) != score count ({})",
                    tokens.len(),
                    scores.len()
                )));
            }
        }

        let mut chunks = Vec::new();
        let mut open: Option<OpenChunk> = None;

        for (i, (token, outcome)) in tokens.iter().zip(outcomes).enumerate() {
            let token = token.borrow();
            match BioLabel::parse(outcome.as_ref()) {
                BioLabel::Outside => {
                    if let Some(chunk) = open.take() {
                        chunks.push(self.close(chunk, scores, policy));
                    }
                }
                BioLabel::Inside(tag) if open.as_ref().is_some_and(|c| c.tag == tag) => {
                    if let Some(chunk) = open.as_mut() {
                        chunk.begin = chunk.begin.min(token.begin);
                        chunk.end = chunk.end.max(token.end);
                        chunk.last = i;
                    }
                }
                BioLabel::Begin(tag) | BioLabel::Inside(tag) => {
                    if let Some(chunk) = open.take() {
                        chunks.push(self.close(chunk, scores, policy));
                    }
                    open = Some(OpenChunk {
                        tag,
                        begin: token.begin,
                        end: token.end,
                        first: i,
                        last: i,
                    });
                }
            }
        }
        if let Some(chunk) = open.take() {
            chunks.push(self.close(chunk, scores, policy));
        }

        Ok(chunks)
    }

    fn close(
        &self,
        chunk: OpenChunk,
        scores: Option<&[f64]>,
        policy: ConfidencePolicy,
    ) -> ScoredSpan {
        let kind = match (&chunk.tag, self.typed) {
            (Some(tag), true) => tag.clone(),
            _ => self.output_kind.clone(),
        };
        let mut scored = ScoredSpan::new(Span::new(chunk.begin, chunk.end, kind));
        if let Some(scores) = scores {
            scored.confidence = Some(chunk_confidence(&scores[chunk.first..=chunk.last], policy));
        }
        scored
    }
}

/// Reduce the per-token scores of one chunk (in sequence order) to a single value
pub fn chunk_confidence(scores: &[f64], policy: ConfidencePolicy) -> f64 {
    match policy {
        ConfidencePolicy::First => scores.first().copied().unwrap_or(0.0),
        ConfidencePolicy::Last => scores.last().copied().unwrap_or(0.0),
        ConfidencePolicy::Mean if scores.is_empty() => 0.0,
        ConfidencePolicy::Mean => scores.iter().sum::<f64>() / scores.len() as f64,
        ConfidencePolicy::Min => scores.iter().copied().fold(f64::INFINITY, f64::min),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<Span> {
        let mut offset = 0;
        words
            .iter()
            .map(|w| {
                let span = Span::new(offset, offset + w.len(), "Token");
                offset += w.len() + 1;
                span
            })
            .collect()
    }

    #[test]
    fn test_label_parse_and_display() {
        assert_eq!(BioLabel::parse("B-TIMEX"), BioLabel::Begin(Some("TIMEX".into())));
        assert_eq!(BioLabel::parse("I"), BioLabel::Inside(None));
        assert_eq!(BioLabel::parse("O"), BioLabel::Outside);
        assert_eq!(BioLabel::parse("garbage"), BioLabel::Outside);
        assert_eq!(BioLabel::parse("I-DATE-RANGE").tag(), Some("DATE-RANGE"));
        assert_eq!(BioLabel::Begin(Some("EVENT".into())).to_string(), "B-EVENT");
    }

    #[test]
    fn test_single_time_mention() {
        let toks = tokens(&["admitted", "on", "1/1/2000"]);
        let codec = BioChunking::new("TIME");
        let times = vec![Span::new(toks[2].begin, toks[2].end, "TIME")];

        let outcomes = codec.create_outcomes(&toks, &times);
        assert_eq!(outcomes, vec!["O", "O", "B-TIME"]);

        let chunks = codec
            .create_chunks(&toks, &outcomes, None, ConfidencePolicy::Last)
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].span, times[0]);
        assert_eq!(chunks[0].confidence, None);
    }

    #[test]
    fn test_adjacent_spans_restart_with_begin() {
        let toks = tokens(&["chest", "pain", "fever"]);
        let spans = vec![
            Span::new(toks[0].begin, toks[1].end, "EVENT"),
            Span::new(toks[2].begin, toks[2].end, "EVENT"),
        ];
        let outcomes = BioChunking::new("EVENT").create_outcomes(&toks, &spans);
        assert_eq!(outcomes, vec!["B-EVENT", "I-EVENT", "B-EVENT"]);
    }

    #[test]
    fn test_untyped_labels() {
        let toks = tokens(&["three", "days", "ago"]);
        let spans = vec![Span::new(toks[0].begin, toks[2].end, "TIMEX")];
        let codec = BioChunking::untyped("TIMEX");

        let outcomes = codec.create_outcomes(&toks, &spans);
        assert_eq!(outcomes, vec!["B", "I", "I"]);

        let chunks = codec
            .create_chunks(&toks, &outcomes, None, ConfidencePolicy::Last)
            .unwrap();
        assert_eq!(chunks[0].span, spans[0]);
    }

    #[test]
    fn test_misaligned_span_is_dropped() {
        let toks = tokens(&["admitted", "yesterday"]);
        // starts in the middle of "admitted" and ends in the middle of "yesterday"
        let spans = vec![Span::new(3, 12, "TIME")];
        let outcomes = BioChunking::new("TIME").create_outcomes(&toks, &spans);
        assert_eq!(outcomes, vec!["O", "O"]);
    }

    #[test]
    fn test_orphan_inside_starts_chunk() {
        let toks = tokens(&["a", "b", "c", "d"]);
        let codec = BioChunking::new("EVENT");
        let chunks = codec
            .create_chunks(
                &toks,
                &["O", "I-EVENT", "I-TIME", "I-TIME"],
                None,
                ConfidencePolicy::Last,
            )
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].span, Span::new(2, 3, "EVENT"));
        assert_eq!(chunks[1].span, Span::new(4, 7, "TIME"));
    }

    #[test]
    fn test_reversed_sequence_decodes_same_span() {
        let toks = tokens(&["three", "days", "ago", "today"]);
        let span = Span::new(toks[0].begin, toks[2].end, "TIMEX");
        let codec = BioChunking::new("TIMEX");

        let reversed: Vec<Span> = toks.iter().rev().cloned().collect();
        let outcomes = codec.create_outcomes(&reversed, std::slice::from_ref(&span));
        assert_eq!(outcomes, vec!["O", "B-TIMEX", "I-TIMEX", "I-TIMEX"]);

        let chunks = codec
            .create_chunks(&reversed, &outcomes, None, ConfidencePolicy::Last)
            .unwrap();
        assert_eq!(chunks[0].span, span);
    }

    #[test]
    fn test_chunk_confidence_policies() {
        let toks = tokens(&["a", "b", "c"]);
        let codec = BioChunking::new("EVENT");
        let outcomes = ["B-EVENT", "I-EVENT", "O"];
        let scores = [0.9, 0.5, 0.99];

        let last = codec
            .create_chunks(&toks, &outcomes, Some(&scores), ConfidencePolicy::Last)
            .unwrap();
        assert_eq!(last[0].confidence, Some(0.5));

        let first = codec
            .create_chunks(&toks, &outcomes, Some(&scores), ConfidencePolicy::First)
            .unwrap();
        assert_eq!(first[0].confidence, Some(0.9));

        let mean = chunk_confidence(&scores[..2], ConfidencePolicy::Mean);
        assert!((mean - 0.7).abs() < 1e-9);
        assert_eq!(chunk_confidence(&scores, ConfidencePolicy::Min), 0.5);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let toks = tokens(&["a", "b"]);
        let codec = BioChunking::new("EVENT");
        assert!(codec
            .create_chunks(&toks, &["O"], None, ConfidencePolicy::Last)
            .is_err());
        assert!(codec
            .create_chunks(&toks, &["O", "O"], Some(&[0.1]), ConfidencePolicy::Last)
            .is_err());
    }
}
