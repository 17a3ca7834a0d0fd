//! Quality Metrics module
//!
//! Precision, recall and F1 for tagged spans and temporal relations, plus a
//! run-scoped tally of the categories seen during training.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tlink_core::{Relation, ScoredSpan, Span};

use crate::category::CategoryInversion;

// ============================================================================
// Category Counter
// ============================================================================

/// Frequency of every label written during a run.
///
/// Shared between annotators through an `Arc`; diagnostics only.
#[derive(Debug, Default)]
pub struct CategoryCounter {
    counts: Mutex<HashMap<String, usize>>,
}

impl CategoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: &str) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, label: &str) -> usize {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.get(label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.values().sum()
    }

    /// Counts sorted by descending frequency, then label
    pub fn snapshot(&self) -> Vec<(String, usize)> {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<(String, usize)> =
            counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    pub fn report(&self) -> String {
        let mut out = String::from("=== Category Frequencies ===\n");
        for (label, count) in self.snapshot() {
            out.push_str(&format!("  {:<20} {}\n", label, count));
        }
        out
    }
}

// ============================================================================
// Prediction Metrics
// ============================================================================

/// Counts from comparing predictions against gold annotations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub gold_total: usize,
    pub predicted_total: usize,
}

impl PredictionMetrics {
    /// Calculate precision (TP / (TP + FP))
    pub fn precision(&self) -> f32 {
        if self.true_positives + self.false_positives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_positives) as f32
        }
    }

    /// Calculate recall (TP / (TP + FN))
    pub fn recall(&self) -> f32 {
        if self.true_positives + self.false_negatives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_negatives) as f32
        }
    }

    /// Calculate F1 score (2 * P * R / (P + R))
    pub fn f1_score(&self) -> f32 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    fn add(&mut self, other: &Self) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.gold_total += other.gold_total;
        self.predicted_total += other.predicted_total;
    }

    fn from_sets<T: Eq + std::hash::Hash>(predicted: HashSet<T>, gold: HashSet<T>) -> Self {
        let true_positives = predicted.intersection(&gold).count();
        Self {
            true_positives,
            false_positives: predicted.len() - true_positives,
            false_negatives: gold.len() - true_positives,
            gold_total: gold.len(),
            predicted_total: predicted.len(),
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

type Extent = (usize, usize);

/// Compares system output against gold annotations
pub struct Evaluator {
    /// Span kinds must match, not just offsets
    match_types: bool,
    inversion: CategoryInversion,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            match_types: true,
            inversion: CategoryInversion::default(),
        }
    }

    /// Enable/disable type matching
    pub fn with_type_matching(mut self, match_types: bool) -> Self {
        self.match_types = match_types;
        self
    }

    /// Use `inversion` when normalizing relation direction
    pub fn with_inversion(mut self, inversion: CategoryInversion) -> Self {
        self.inversion = inversion;
        self
    }

    fn span_key(&self, span: &Span) -> (Extent, Option<String>) {
        let kind = self.match_types.then(|| span.kind.clone());
        ((span.begin, span.end), kind)
    }

    /// Strict offset matching of tagged spans
    pub fn evaluate_spans(&self, predicted: &[ScoredSpan], gold: &[Span]) -> PredictionMetrics {
        let predicted: HashSet<_> = predicted.iter().map(|s| self.span_key(&s.span)).collect();
        let gold: HashSet<_> = gold.iter().map(|s| self.span_key(s)).collect();
        PredictionMetrics::from_sets(predicted, gold)
    }

    /// A relation written with its arguments in offset order, so that
    /// `AFTER(b, a)` and `BEFORE(a, b)` compare equal
    fn relation_key(&self, relation: &Relation) -> (String, Extent, Extent) {
        let a = (relation.arg1.begin, relation.arg1.end);
        let b = (relation.arg2.begin, relation.arg2.end);
        if b < a {
            (self.inversion.invert(&relation.category), b, a)
        } else {
            (relation.category.clone(), a, b)
        }
    }

    /// Direction-normalized relation matching
    pub fn evaluate_relations(&self, predicted: &[Relation], gold: &[Relation]) -> PredictionMetrics {
        let predicted: HashSet<_> = predicted.iter().map(|r| self.relation_key(r)).collect();
        let gold: HashSet<_> = gold.iter().map(|r| self.relation_key(r)).collect();
        PredictionMetrics::from_sets(predicted, gold)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

/// Aggregate metrics for a batch of evaluations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub span_metrics: PredictionMetrics,
    pub relation_metrics: PredictionMetrics,
    pub num_documents: usize,
}

impl AggregateMetrics {
    pub fn add_span_metrics(&mut self, metrics: &PredictionMetrics) {
        self.span_metrics.add(metrics);
    }

    pub fn add_relation_metrics(&mut self, metrics: &PredictionMetrics) {
        self.relation_metrics.add(metrics);
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        let section = |title: &str, m: &PredictionMetrics| {
            format!(
                "{}:\n\
                   Precision: {:.1}%\n\
                   Recall:    {:.1}%\n\
                   F1 Score:  {:.1}%\n\
                   Gold: {} | Predicted: {} | TP: {} | FP: {} | FN: {}\n",
                title,
                m.precision() * 100.0,
                m.recall() * 100.0,
                m.f1_score() * 100.0,
                m.gold_total,
                m.predicted_total,
                m.true_positives,
                m.false_positives,
                m.false_negatives,
            )
        };
        format!(
            "=== Temporal Extraction Report ===\n\nDocuments evaluated: {}\n\n{}\n{}",
            self.num_documents,
            section("Span Tagging", &self.span_metrics),
            section("Temporal Relations", &self.relation_metrics),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
