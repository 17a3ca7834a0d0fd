//! Train/predict annotators
//!
//! An annotator is built in one mode and keeps it for the whole run:
//! - training: candidates are labelled from gold annotations and written as
//!   instances through a [`DataWriter`], after imbalance sampling
//! - prediction: candidates are classified and the results are added to the
//!   document's output index
//!
//! Two annotators share this life cycle. [`RelationAnnotator`] classifies
//! candidate argument pairs; [`SpanTagger`] labels tokens with BIO outcomes,
//! feeding each token the outcomes of the tokens before it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tlink_core::{
    sanitize_features, Classifier, ConfidencePolicy, DataWriter, Direction, Document, Feature,
    Instance, PipelineConfig, Relation, RelationFeatureExtractor, Result, ScopeKind, ScoredSpan,
    Span, TlinkError, TokenFeatureExtractor,
};

use crate::candidates::{effective_scope, CandidateStrategy};
use crate::category::{CategoryInversion, GoldRelationIndex};
use crate::chunking::{BioChunking, OUTSIDE};
use crate::metrics::CategoryCounter;
use crate::sampler::ImbalanceSampler;

// ============================================================================
// Modes and Life Cycle
// ============================================================================

/// What an annotator does with its features
pub enum Engine {
    Training(Box<dyn DataWriter>),
    Predicting(Box<dyn Classifier>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Training,
    Predicting,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Predicting => "predicting",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Configured,
    Processing,
    Finalized,
}

/// Counters for one annotator run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub documents: usize,
    pub candidates: usize,
    pub instances_written: usize,
    pub negatives_dropped: usize,
    pub synthetic_written: usize,
    pub null_features: usize,
    pub spans_emitted: usize,
    pub relations_emitted: usize,
}

/// Shared life cycle of every annotator
pub trait Annotator {
    /// Process one document. In prediction mode, output is added to
    /// `document.output` only if the whole document succeeds.
    fn process(&mut self, document: &mut Document) -> Result<()>;

    /// Close the classifier or flush the data writer. No document may be
    /// processed afterwards.
    fn finalize(&mut self) -> Result<RunSummary>;

    fn mode(&self) -> Mode;

    fn state(&self) -> LifecycleState;
}

/// Engine, sampler and bookkeeping common to all annotators
struct Runtime {
    engine: Engine,
    sampler: ImbalanceSampler,
    counter: Arc<CategoryCounter>,
    use_scores: bool,
    state: LifecycleState,
    summary: RunSummary,
}

impl Runtime {
    fn new(engine: Engine, config: &PipelineConfig) -> Self {
        Self {
            engine,
            sampler: ImbalanceSampler::new(&config.sampler),
            counter: Arc::new(CategoryCounter::new()),
            use_scores: config.relations.use_scores,
            state: LifecycleState::Configured,
            summary: RunSummary::default(),
        }
    }

    fn mode(&self) -> Mode {
        match self.engine {
            Engine::Training(_) => Mode::Training,
            Engine::Predicting(_) => Mode::Predicting,
        }
    }

    fn begin_document(&mut self) -> Result<()> {
        if self.state == LifecycleState::Finalized {
            return Err(TlinkError::Lifecycle(
                "annotator already finalized".to_string(),
            ));
        }
        self.state = LifecycleState::Processing;
        Ok(())
    }

    fn end_document(&mut self) {
        self.summary.documents += 1;
    }

    fn clean(&mut self, features: &mut [Feature]) {
        self.summary.null_features += sanitize_features(features);
    }

    /// Write one authentic training instance, subject to negative retention
    fn emit(&mut self, label: String, mut features: Vec<Feature>, negative: bool) -> Result<()> {
        self.clean(&mut features);
        if negative && !self.sampler.retain_negative() {
            self.summary.negatives_dropped += 1;
            return Ok(());
        }

        let instance = Instance::new(label, features);
        if !negative {
            self.sampler.observe_minority(&instance);
        }
        self.counter.record(&instance.label);
        self.write(instance)?;
        self.summary.instances_written += 1;
        Ok(())
    }

    /// Forget the minority examples of a document that failed part-way
    fn abandon_document(&mut self) {
        let discarded = self.sampler.discard_pending();
        if discarded > 0 {
            tracing::debug!(discarded, "Dropped minority pool of failed document");
        }
    }

    /// Write the synthetic instances for the unit just processed
    fn flush_synthetic(&mut self) -> Result<()> {
        for instance in self.sampler.drain_synthetic() {
            self.write(instance)?;
            self.summary.synthetic_written += 1;
        }
        Ok(())
    }

    fn write(&mut self, instance: Instance) -> Result<()> {
        match &mut self.engine {
            Engine::Training(writer) => writer.write(instance),
            Engine::Predicting(_) => Err(TlinkError::Lifecycle(
                "cannot write training instances in prediction mode".to_string(),
            )),
        }
    }

    /// Predicted label and, when scoring, its score
    fn predict(&mut self, mut features: Vec<Feature>) -> Result<(String, Option<f64>)> {
        self.clean(&mut features);
        let classifier = match &self.engine {
            Engine::Predicting(classifier) => classifier,
            Engine::Training(_) => {
                return Err(TlinkError::Lifecycle(
                    "cannot classify in training mode".to_string(),
                ))
            }
        };

        if !self.use_scores {
            return Ok((classifier.classify(&features)?, None));
        }
        let (label, score) = argmax(classifier.score(&features)?).ok_or_else(|| {
            TlinkError::Classifier("empty score distribution".to_string())
        })?;
        Ok((label, Some(score)))
    }

    fn finalize(&mut self, name: &str) -> Result<RunSummary> {
        if self.state == LifecycleState::Finalized {
            return Err(TlinkError::Lifecycle(
                "annotator already finalized".to_string(),
            ));
        }
        self.state = LifecycleState::Finalized;
        match &mut self.engine {
            Engine::Training(writer) => writer.finish()?,
            Engine::Predicting(classifier) => classifier.close()?,
        }

        tracing::info!(
            annotator = name,
            mode = %self.mode(),
            documents = self.summary.documents,
            instances = self.summary.instances_written,
            synthetic = self.summary.synthetic_written,
            negatives_dropped = self.summary.negatives_dropped,
            spans = self.summary.spans_emitted,
            relations = self.summary.relations_emitted,
            "Annotator finalized"
        );
        Ok(self.summary.clone())
    }
}

/// Highest-scoring label; the first of several equal maxima wins
pub fn argmax(scores: Vec<(String, f64)>) -> Option<(String, f64)> {
    let mut best: Option<(String, f64)> = None;
    for (label, score) in scores {
        if best.as_ref().map_or(true, |(_, top)| score > *top) {
            best = Some((label, score));
        }
    }
    best
}

// ============================================================================
// Relation Annotator
// ============================================================================

/// Classifies candidate argument pairs
pub struct RelationAnnotator {
    scope: ScopeKind,
    strategy: Box<dyn CandidateStrategy>,
    extractors: Vec<Box<dyn RelationFeatureExtractor>>,
    inversion: CategoryInversion,
    no_relation_label: String,
    runtime: Runtime,
}

impl RelationAnnotator {
    pub fn new(strategy: Box<dyn CandidateStrategy>, engine: Engine, config: &PipelineConfig) -> Self {
        Self {
            scope: ScopeKind::Sentence,
            strategy,
            extractors: Vec::new(),
            inversion: CategoryInversion::from_config(&config.relations),
            no_relation_label: config.relations.no_relation_label.clone(),
            runtime: Runtime::new(engine, config),
        }
    }

    pub fn training(
        strategy: Box<dyn CandidateStrategy>,
        writer: Box<dyn DataWriter>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(strategy, Engine::Training(writer), config)
    }

    pub fn predicting(
        strategy: Box<dyn CandidateStrategy>,
        classifier: Box<dyn Classifier>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(strategy, Engine::Predicting(classifier), config)
    }

    pub fn with_scope(mut self, scope: ScopeKind) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn RelationFeatureExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Tally written labels into a shared counter
    pub fn with_counter(mut self, counter: Arc<CategoryCounter>) -> Self {
        self.runtime.counter = counter;
        self
    }

    /// Replace the sampler built from the configuration
    pub fn with_sampler(mut self, sampler: ImbalanceSampler) -> Self {
        self.runtime.sampler = sampler;
        self
    }

    pub fn counter(&self) -> &Arc<CategoryCounter> {
        &self.runtime.counter
    }

    /// Scopes to pair within, widened when the strategy needs more room
    fn scopes(&self, document: &Document) -> Vec<Span> {
        document.scopes(effective_scope(self.strategy.as_ref(), self.scope))
    }

    fn features(&self, document: &Document, arg1: &Span, arg2: &Span) -> Vec<Feature> {
        self.extractors
            .iter()
            .flat_map(|e| e.extract(document, arg1, arg2))
            .collect()
    }

    fn train(&mut self, document: &Document) -> Result<()> {
        let gold = GoldRelationIndex::from_relations(&document.relations);

        for scope in self.scopes(document) {
            let pairs = self.strategy.candidates(document, &scope);
            tracing::debug!(scope = %scope, candidates = pairs.len(), "Training scope");

            for pair in pairs {
                self.runtime.summary.candidates += 1;
                let features = self.features(document, &pair.arg1, &pair.arg2);
                let label = gold
                    .resolve(&pair.arg1, &pair.arg2, &self.inversion)
                    .unwrap_or_else(|| self.no_relation_label.clone());
                let negative = label == self.no_relation_label;
                self.runtime.emit(label, features, negative)?;
            }
        }

        self.runtime.flush_synthetic()
    }

    fn predict(&mut self, document: &Document) -> Result<Vec<Relation>> {
        let mut relations = Vec::new();

        for scope in self.scopes(document) {
            let pairs = self.strategy.candidates(document, &scope);
            tracing::debug!(scope = %scope, candidates = pairs.len(), "Predicting scope");

            for pair in pairs {
                self.runtime.summary.candidates += 1;
                let features = self.features(document, &pair.arg1, &pair.arg2);
                let (label, confidence) = self.runtime.predict(features)?;
                if label == self.no_relation_label {
                    continue;
                }
                let mut relation = self.inversion.materialize(&label, pair.arg1, pair.arg2);
                relation.confidence = confidence;
                relations.push(relation);
            }
        }

        Ok(relations)
    }
}

impl Annotator for RelationAnnotator {
    fn process(&mut self, document: &mut Document) -> Result<()> {
        self.runtime.begin_document()?;

        match self.runtime.mode() {
            Mode::Training => {
                if let Err(e) = self.train(document) {
                    self.runtime.abandon_document();
                    return Err(e);
                }
            }
            Mode::Predicting => {
                let relations = self.predict(document)?;
                self.runtime.summary.relations_emitted += relations.len();
                for relation in relations {
                    document.output.add_relation(relation);
                }
            }
        }

        self.runtime.end_document();
        Ok(())
    }

    fn finalize(&mut self) -> Result<RunSummary> {
        self.runtime.finalize(self.strategy.name())
    }

    fn mode(&self) -> Mode {
        self.runtime.mode()
    }

    fn state(&self) -> LifecycleState {
        self.runtime.state
    }
}

// ============================================================================
// Span Tagger
// ============================================================================

/// Tags tokens with BIO outcomes, one sentence at a time.
///
/// Each token's features include the outcomes of the `look_back` tokens
/// before it (gold outcomes in training, predicted ones in prediction), so
/// tokens are handled strictly in sequence order.
pub struct SpanTagger {
    target_kind: String,
    codec: BioChunking,
    extractors: Vec<Box<dyn TokenFeatureExtractor>>,
    look_back: usize,
    out_of_bounds_label: String,
    direction: Direction,
    confidence: ConfidencePolicy,
    runtime: Runtime,
}

impl SpanTagger {
    pub fn new(target_kind: impl Into<String>, engine: Engine, config: &PipelineConfig) -> Self {
        let target_kind = target_kind.into();
        let codec = if config.tagging.typed_labels {
            BioChunking::new(target_kind.clone())
        } else {
            BioChunking::untyped(target_kind.clone())
        };
        Self {
            target_kind,
            codec,
            extractors: Vec::new(),
            look_back: config.tagging.look_back,
            out_of_bounds_label: config.tagging.out_of_bounds_label.clone(),
            direction: config.tagging.direction,
            confidence: config.tagging.confidence,
            runtime: Runtime::new(engine, config),
        }
    }

    pub fn training(
        target_kind: impl Into<String>,
        writer: Box<dyn DataWriter>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(target_kind, Engine::Training(writer), config)
    }

    pub fn predicting(
        target_kind: impl Into<String>,
        classifier: Box<dyn Classifier>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(target_kind, Engine::Predicting(classifier), config)
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TokenFeatureExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn with_counter(mut self, counter: Arc<CategoryCounter>) -> Self {
        self.runtime.counter = counter;
        self
    }

    pub fn with_sampler(mut self, sampler: ImbalanceSampler) -> Self {
        self.runtime.sampler = sampler;
        self
    }

    /// Tokens of `sentence` in processing order
    fn sequence<'a>(&self, document: &'a Document, sentence: &Span) -> Vec<&'a Span> {
        let mut tokens = document.tokens_in(sentence);
        if self.direction == Direction::Backward {
            tokens.reverse();
        }
        tokens
    }

    fn features(
        &self,
        document: &Document,
        token: &Span,
        sentence: &Span,
        previous: &[String],
    ) -> Vec<Feature> {
        let mut features: Vec<Feature> = self
            .extractors
            .iter()
            .flat_map(|e| e.extract(document, token, sentence))
            .collect();

        // farthest first
        for offset in (1..=self.look_back).rev() {
            let outcome = previous
                .len()
                .checked_sub(offset)
                .and_then(|i| previous.get(i))
                .map_or(self.out_of_bounds_label.as_str(), String::as_str);
            features.push(Feature::text(format!("PreviousOutcome_{}", offset), outcome));
        }
        features
    }

    fn train(&mut self, document: &Document) -> Result<()> {
        for sentence in document.scopes(ScopeKind::Sentence) {
            let tokens = self.sequence(document, &sentence);
            let gold: Vec<Span> = document
                .mentions_in(&self.target_kind, &sentence)
                .into_iter()
                .filter(|m| m.canonical)
                .cloned()
                .collect();
            let outcomes = self.codec.create_outcomes(&tokens, &gold);
            tracing::debug!(sentence = %sentence, tokens = tokens.len(), "Training sentence");

            for (i, (token, outcome)) in tokens.iter().zip(&outcomes).enumerate() {
                self.runtime.summary.candidates += 1;
                let features = self.features(document, token, &sentence, &outcomes[..i]);
                let negative = outcome.as_str() == OUTSIDE;
                self.runtime.emit(outcome.clone(), features, negative)?;
            }
        }

        self.runtime.flush_synthetic()
    }

    fn predict(&mut self, document: &Document) -> Result<Vec<ScoredSpan>> {
        let mut spans = Vec::new();

        for sentence in document.scopes(ScopeKind::Sentence) {
            let tokens = self.sequence(document, &sentence);
            let mut outcomes: Vec<String> = Vec::with_capacity(tokens.len());
            let mut scores: Vec<f64> = Vec::with_capacity(tokens.len());

            for token in &tokens {
                self.runtime.summary.candidates += 1;
                let features = self.features(document, token, &sentence, &outcomes);
                let (label, score) = self.runtime.predict(features)?;
                outcomes.push(label);
                if let Some(score) = score {
                    scores.push(score);
                }
            }

            let scores = (self.runtime.use_scores && scores.len() == tokens.len())
                .then_some(scores.as_slice());
            spans.extend(
                self.codec
                    .create_chunks(&tokens, &outcomes, scores, self.confidence)?,
            );
        }

        Ok(spans)
    }
}

impl Annotator for SpanTagger {
    fn process(&mut self, document: &mut Document) -> Result<()> {
        self.runtime.begin_document()?;

        match self.runtime.mode() {
            Mode::Training => {
                if let Err(e) = self.train(document) {
                    self.runtime.abandon_document();
                    return Err(e);
                }
            }
            Mode::Predicting => {
                let spans = self.predict(document)?;
                self.runtime.summary.spans_emitted += spans.len();
                for span in spans {
                    document.output.add_span(span);
                }
            }
        }

        self.runtime.end_document();
        Ok(())
    }

    fn finalize(&mut self) -> Result<RunSummary> {
        self.runtime.finalize(self.codec.output_kind())
    }

    fn mode(&self) -> Mode {
        self.runtime.mode()
    }

    fn state(&self) -> LifecycleState {
        self.runtime.state
    }
}

// ============================================================================
// Tests
// ============================================================================
