//! tlink Extractor - Span tagging and temporal relation extraction
//!
//! The machine-learning annotator substrate:
//! - BIO chunking between spans and token label sequences
//! - Candidate pair strategies and gold label resolution with category inversion
//! - Train/predict annotators for relations and span tagging
//! - Class-imbalance sampling (negative retention, minority oversampling)
//!
//! Plus evaluation metrics, instance writers and reference feature extractors.

pub mod annotator;
pub mod candidates;
pub mod category;
pub mod chunking;
pub mod features;
pub mod metrics;
pub mod sampler;
pub mod writer;

pub use annotator::{
    argmax, Annotator, Engine, LifecycleState, Mode, RelationAnnotator, RunSummary, SpanTagger,
};
pub use candidates::{
    effective_scope, AdjacentPairs, AllPairs, ArgumentKinds, CandidatePair, CandidateStrategy,
    ConsecutiveUnits, ContainerPairs, DependencyFiltered, StrategyKind,
};
pub use category::{CategoryInversion, GoldRelationIndex};
pub use chunking::{BioChunking, BioLabel, OUTSIDE};
pub use metrics::{AggregateMetrics, CategoryCounter, Evaluator, PredictionMetrics};
pub use sampler::ImbalanceSampler;
pub use writer::{InstanceBuffer, JsonlDataWriter};
