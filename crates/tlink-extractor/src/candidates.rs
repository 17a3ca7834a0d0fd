//! Candidate pair generation
//!
//! Strategies that decide which argument pairs inside a scope are handed to
//! relation classification. Every strategy only considers canonical mentions
//! and never returns a self-pair or the same unordered pair twice.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tlink_core::{DependencyIndex, Document, RelationConfig, ScopeKind, Span};

// ============================================================================
// Candidate Pairs
// ============================================================================

/// An ordered argument pair proposed for relation classification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    pub arg1: Span,
    pub arg2: Span,
}

impl CandidatePair {
    pub fn new(arg1: Span, arg2: Span) -> Self {
        Self { arg1, arg2 }
    }

    /// The pair with its arguments in span order, used to detect duplicates
    /// regardless of direction
    pub fn unordered_key(&self) -> (&Span, &Span) {
        if self.arg2 < self.arg1 {
            (&self.arg2, &self.arg1)
        } else {
            (&self.arg1, &self.arg2)
        }
    }
}

impl std::fmt::Display for CandidatePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.arg1, self.arg2)
    }
}

/// Enumerates candidate pairs for one scope of a document
pub trait CandidateStrategy: Send + Sync {
    fn candidates(&self, document: &Document, scope: &Span) -> Vec<CandidatePair>;

    /// Name used in log messages
    fn name(&self) -> &str;

    /// Narrowest scope in which the strategy can find any pair
    fn min_scope(&self) -> ScopeKind {
        ScopeKind::Sentence
    }
}

/// Scope to iterate when `requested` is asked of `strategy`; a scope too
/// narrow for the strategy is widened to its minimum
pub fn effective_scope(strategy: &dyn CandidateStrategy, requested: ScopeKind) -> ScopeKind {
    let scope = requested.max(strategy.min_scope());
    if scope != requested {
        tracing::debug!(
            strategy = strategy.name(),
            requested = ?requested,
            scope = ?scope,
            "Widening scope for candidate strategy"
        );
    }
    scope
}

/// Drop self-pairs and repeated unordered pairs, keeping first occurrences
pub fn finalize_pairs(pairs: Vec<CandidatePair>) -> Vec<CandidatePair> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(pairs.len());
    for pair in pairs {
        if pair.arg1 == pair.arg2 {
            continue;
        }
        let (a, b) = pair.unordered_key();
        if seen.insert((a.clone(), b.clone())) {
            kept.push(pair);
        }
    }
    kept
}

/// Canonical mentions of `kind` inside `scope`, in document order, without
/// repeats
fn eligible(document: &Document, kind: &str, scope: &Span) -> Vec<Span> {
    let mut spans: Vec<Span> = document
        .mentions_in(kind, scope)
        .into_iter()
        .filter(|m| m.canonical)
        .cloned()
        .collect();
    spans.sort();
    spans.dedup();
    spans
}

/// The two argument types a strategy draws from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentKinds {
    pub arg1: String,
    pub arg2: String,
}

impl ArgumentKinds {
    pub fn new(arg1: impl Into<String>, arg2: impl Into<String>) -> Self {
        Self {
            arg1: arg1.into(),
            arg2: arg2.into(),
        }
    }

    /// Both arguments of the same type
    pub fn same(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self::new(kind.clone(), kind)
    }

    pub fn is_homogeneous(&self) -> bool {
        self.arg1 == self.arg2
    }
}

// ============================================================================
// Strategy Kinds
// ============================================================================

/// Named strategies, for configuration and the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    All,
    Adjacent,
    Consecutive,
    Container,
    Dependency,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Adjacent => "adjacent",
            Self::Consecutive => "consecutive",
            Self::Container => "container",
            Self::Dependency => "dependency",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" | "all-pairs" => Some(Self::All),
            "adjacent" => Some(Self::Adjacent),
            "consecutive" => Some(Self::Consecutive),
            "container" => Some(Self::Container),
            "dependency" => Some(Self::Dependency),
            _ => None,
        }
    }

    /// Build the strategy over `kinds`. Container pairing takes its
    /// containers from gold `CONTAINS` relations and pairs them with
    /// `kinds.arg2` mentions; dependency filtering wraps all-pairs.
    pub fn build(
        &self,
        kinds: ArgumentKinds,
        relations: &RelationConfig,
    ) -> Box<dyn CandidateStrategy> {
        match self {
            Self::All => Box::new(AllPairs::new(kinds)),
            Self::Adjacent => Box::new(AdjacentPairs::new(kinds)),
            Self::Consecutive => Box::new(ConsecutiveUnits::new(kinds)),
            Self::Container => Box::new(ContainerPairs::from_gold(
                kinds.arg2,
                "CONTAINS",
                &relations.inversion_marker,
            )),
            Self::Dependency => Box::new(DependencyFiltered::new(Box::new(AllPairs::new(kinds)))),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// All Pairs
// ============================================================================

/// Every unordered pair of eligible mentions in the scope.
///
/// With one argument type, pairs are (earlier, later) in document order.
/// With two types, `arg1` always comes from the first type.
#[derive(Debug, Clone)]
pub struct AllPairs {
    kinds: ArgumentKinds,
}

impl AllPairs {
    pub fn new(kinds: ArgumentKinds) -> Self {
        Self { kinds }
    }
}

impl CandidateStrategy for AllPairs {
    fn candidates(&self, document: &Document, scope: &Span) -> Vec<CandidatePair> {
        let first = eligible(document, &self.kinds.arg1, scope);
        let mut pairs = Vec::new();

        if self.kinds.is_homogeneous() {
            for (i, a) in first.iter().enumerate() {
                for b in &first[i + 1..] {
                    pairs.push(CandidatePair::new(a.clone(), b.clone()));
                }
            }
        } else {
            let second = eligible(document, &self.kinds.arg2, scope);
            for a in &first {
                for b in &second {
                    pairs.push(CandidatePair::new(a.clone(), b.clone()));
                }
            }
        }

        finalize_pairs(pairs)
    }

    fn name(&self) -> &str {
        "all-pairs"
    }
}

// ============================================================================
// Adjacent Pairs
// ============================================================================

/// Pairs of mentions that are next to each other in document order.
///
/// With two argument types, only neighbours of different types pair up and
/// `arg1` always comes from the first type.
#[derive(Debug, Clone)]
pub struct AdjacentPairs {
    kinds: ArgumentKinds,
}

impl AdjacentPairs {
    pub fn new(kinds: ArgumentKinds) -> Self {
        Self { kinds }
    }
}

impl CandidateStrategy for AdjacentPairs {
    fn candidates(&self, document: &Document, scope: &Span) -> Vec<CandidatePair> {
        let mut spans = eligible(document, &self.kinds.arg1, scope);
        if self.kinds.is_homogeneous() {
            let pairs = spans
                .windows(2)
                .map(|w| CandidatePair::new(w[0].clone(), w[1].clone()))
                .collect();
            return finalize_pairs(pairs);
        }

        spans.extend(eligible(document, &self.kinds.arg2, scope));
        spans.sort();

        // neighbours of different kinds only, arg1 from the first kind
        let pairs = spans
            .windows(2)
            .filter_map(|w| {
                let (a, b) = (&w[0], &w[1]);
                if a.kind == self.kinds.arg1 && b.kind == self.kinds.arg2 {
                    Some(CandidatePair::new(a.clone(), b.clone()))
                } else if a.kind == self.kinds.arg2 && b.kind == self.kinds.arg1 {
                    Some(CandidatePair::new(b.clone(), a.clone()))
                } else {
                    None
                }
            })
            .collect();
        finalize_pairs(pairs)
    }

    fn name(&self) -> &str {
        "adjacent"
    }
}

// ============================================================================
// Consecutive Units
// ============================================================================

/// Pairs across each pair of neighbouring sentences in the scope, limited to
/// the first and last mention on either side.
///
/// A single sentence holds no such pair, so annotators run this strategy
/// over segments at the narrowest.
#[derive(Debug, Clone)]
pub struct ConsecutiveUnits {
    kinds: ArgumentKinds,
}

impl ConsecutiveUnits {
    pub fn new(kinds: ArgumentKinds) -> Self {
        Self { kinds }
    }
}

impl CandidateStrategy for ConsecutiveUnits {
    fn candidates(&self, document: &Document, scope: &Span) -> Vec<CandidatePair> {
        let sentences = document.sentences_in(scope);
        let mut pairs = Vec::new();

        for window in sentences.windows(2) {
            let left = eligible(document, &self.kinds.arg1, window[0]);
            let right = eligible(document, &self.kinds.arg2, window[1]);

            let (Some(l_first), Some(l_last), Some(r_first), Some(r_last)) =
                (left.first(), left.last(), right.first(), right.last())
            else {
                continue;
            };

            for l in [l_first, l_last] {
                for r in [r_first, r_last] {
                    pairs.push(CandidatePair::new(l.clone(), r.clone()));
                }
            }
        }

        finalize_pairs(pairs)
    }

    fn name(&self) -> &str {
        "consecutive"
    }

    fn min_scope(&self) -> ScopeKind {
        ScopeKind::Segment
    }
}

// ============================================================================
// Container Pairs
// ============================================================================

#[derive(Debug, Clone)]
enum ContainerSource {
    /// Left arguments of the category, right arguments of its inverse
    Gold { category: String, inverse: String },
    /// Every canonical mention of a type
    Kind(String),
}

/// Pairs each non-container mention with the containers it can reach
/// without another container in between.
///
/// The container is always `arg1`.
#[derive(Debug, Clone)]
pub struct ContainerPairs {
    member_kind: String,
    source: ContainerSource,
}

impl ContainerPairs {
    /// Containers are the arguments holding the containing role in gold
    /// relations of `category` (or its marked inverse) within the scope
    pub fn from_gold(
        member_kind: impl Into<String>,
        category: impl Into<String>,
        marker: &str,
    ) -> Self {
        let category = category.into();
        let inverse = format!("{}{}", category, marker);
        Self {
            member_kind: member_kind.into(),
            source: ContainerSource::Gold { category, inverse },
        }
    }

    /// Containers are the mentions of `container_kind` in the scope
    pub fn of_kind(member_kind: impl Into<String>, container_kind: impl Into<String>) -> Self {
        Self {
            member_kind: member_kind.into(),
            source: ContainerSource::Kind(container_kind.into()),
        }
    }

    fn containers(&self, document: &Document, scope: &Span) -> Vec<Span> {
        let mut containers: Vec<Span> = match &self.source {
            ContainerSource::Gold { category, inverse } => document
                .relations_in(scope)
                .into_iter()
                .filter_map(|r| {
                    if &r.category == category {
                        Some(r.arg1.clone())
                    } else if &r.category == inverse {
                        Some(r.arg2.clone())
                    } else {
                        None
                    }
                })
                .filter(|c| c.canonical)
                .collect(),
            ContainerSource::Kind(kind) => eligible(document, kind, scope),
        };
        containers.sort();
        containers.dedup();
        containers
    }
}

/// True if `other` sits strictly between `a` and `b` in document order
fn interposes(other: &Span, a: &Span, b: &Span) -> bool {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    low < other && other < high
}

impl CandidateStrategy for ContainerPairs {
    fn candidates(&self, document: &Document, scope: &Span) -> Vec<CandidatePair> {
        let containers = self.containers(document, scope);
        if containers.is_empty() {
            return Vec::new();
        }
        let members: Vec<Span> = eligible(document, &self.member_kind, scope)
            .into_iter()
            .filter(|m| !containers.iter().any(|c| c.same_extent(m)))
            .collect();

        let mut pairs = Vec::new();
        for member in &members {
            for container in &containers {
                let shadowed = containers
                    .iter()
                    .any(|other| other != container && interposes(other, member, container));
                if !shadowed {
                    pairs.push(CandidatePair::new(container.clone(), member.clone()));
                }
            }
        }

        finalize_pairs(pairs)
    }

    fn name(&self) -> &str {
        "container"
    }
}

// ============================================================================
// Dependency Filter
// ============================================================================

/// Keeps only the pairs of an inner strategy whose arguments share a
/// syntactic ancestor
pub struct DependencyFiltered {
    inner: Box<dyn CandidateStrategy>,
    require_governance: bool,
}

impl DependencyFiltered {
    pub fn new(inner: Box<dyn CandidateStrategy>) -> Self {
        Self {
            inner,
            require_governance: false,
        }
    }

    /// Also require the common ancestor to lie inside one of the arguments,
    /// so that one argument governs the other
    pub fn with_governance(mut self, require: bool) -> Self {
        self.require_governance = require;
        self
    }

    /// Filter `pairs` against any dependency index
    pub fn filter(
        &self,
        index: &dyn DependencyIndex,
        pairs: Vec<CandidatePair>,
    ) -> Vec<CandidatePair> {
        pairs
            .into_iter()
            .filter(|pair| match index.common_ancestor(&pair.arg1, &pair.arg2) {
                Some(ancestor) if self.require_governance => {
                    ancestor.within(&pair.arg1) || ancestor.within(&pair.arg2)
                }
                Some(_) => true,
                None => false,
            })
            .collect()
    }
}

impl CandidateStrategy for DependencyFiltered {
    fn candidates(&self, document: &Document, scope: &Span) -> Vec<CandidatePair> {
        let pairs = self.inner.candidates(document, scope);
        match &document.dependencies {
            Some(graph) => self.filter(graph, pairs),
            None => {
                tracing::warn!(
                    document = %document.id,
                    inner = self.inner.name(),
                    "No dependency parse; dependency filter passes all pairs"
                );
                pairs
            }
        }
    }

    fn name(&self) -> &str {
        "dependency"
    }

    fn min_scope(&self) -> ScopeKind {
        self.inner.min_scope()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tlink_core::{DependencyGraph, DependencyNode, Relation};

    fn event(begin: usize, end: usize) -> Span {
        Span::new(begin, end, "EVENT")
    }

    // "pain began . surgery followed . fever"
    fn three_sentence_doc() -> Document {
        Document::new("pain began . surgery followed . fever")
            .with_sentences(vec![
                Span::new(0, 12, "Sentence"),
                Span::new(13, 31, "Sentence"),
                Span::new(32, 37, "Sentence"),
            ])
            .with_mention(event(0, 4))
            .with_mention(event(5, 10))
            .with_mention(event(13, 20))
            .with_mention(event(21, 29))
            .with_mention(event(32, 37))
    }

    #[test]
    fn test_all_pairs_homogeneous() {
        let doc = three_sentence_doc();
        let pairs = AllPairs::new(ArgumentKinds::same("EVENT")).candidates(&doc, &doc.extent());
        assert_eq!(pairs.len(), 10);
        assert!(pairs.iter().all(|p| p.arg1 < p.arg2));
    }

    #[test]
    fn test_all_pairs_cross_kinds() {
        let doc = Document::new("pain on 1/1 and fever")
            .with_mention(event(0, 4))
            .with_mention(Span::new(8, 11, "TIMEX"))
            .with_mention(event(16, 21));
        let strategy = AllPairs::new(ArgumentKinds::new("EVENT", "TIMEX"));
        let pairs = strategy.candidates(&doc, &doc.extent());

        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.arg1.kind == "EVENT" && p.arg2.kind == "TIMEX"));
    }

    #[test]
    fn test_non_canonical_mentions_are_skipped() {
        let doc = Document::new("pain began")
            .with_mention(event(0, 4))
            .with_mention(Span::subtype(0, 4, "EVENT"))
            .with_mention(event(5, 10));
        let pairs = AllPairs::new(ArgumentKinds::same("EVENT")).candidates(&doc, &doc.extent());
        assert_eq!(pairs, vec![CandidatePair::new(event(0, 4), event(5, 10))]);
    }

    #[test]
    fn test_adjacent_pairs() {
        let doc = Document::new("a b c")
            .with_mention(event(0, 1))
            .with_mention(event(2, 3))
            .with_mention(event(4, 5));
        let pairs =
            AdjacentPairs::new(ArgumentKinds::same("EVENT")).candidates(&doc, &doc.extent());
        assert_eq!(
            pairs,
            vec![
                CandidatePair::new(event(0, 1), event(2, 3)),
                CandidatePair::new(event(2, 3), event(4, 5)),
            ]
        );
    }

    #[test]
    fn test_adjacent_pairs_mixed_kinds() {
        // pain 1/1 fever cough
        let timex = Span::new(5, 8, "TIMEX");
        let doc = Document::new("pain 1/1 fever cough")
            .with_mention(event(0, 4))
            .with_mention(timex.clone())
            .with_mention(event(9, 14))
            .with_mention(event(15, 20));
        let pairs = AdjacentPairs::new(ArgumentKinds::new("EVENT", "TIMEX"))
            .candidates(&doc, &doc.extent());

        assert_eq!(
            pairs,
            vec![
                CandidatePair::new(event(0, 4), timex.clone()),
                CandidatePair::new(event(9, 14), timex),
            ]
        );
    }

    #[test]
    fn test_consecutive_units_first_and_last() {
        let doc = three_sentence_doc();
        let pairs =
            ConsecutiveUnits::new(ArgumentKinds::same("EVENT")).candidates(&doc, &doc.extent());

        // sentence 0 x sentence 1: 2 x 2 pairs; sentence 1 x sentence 2: 2 x 1 pairs
        assert_eq!(pairs.len(), 6);
        assert!(pairs.contains(&CandidatePair::new(event(0, 4), event(21, 29))));
        assert!(pairs.contains(&CandidatePair::new(event(21, 29), event(32, 37))));
        assert!(!pairs.contains(&CandidatePair::new(event(0, 4), event(32, 37))));
    }

    #[test]
    fn test_consecutive_units_inside_one_sentence_is_empty() {
        let doc = three_sentence_doc();
        let scope = doc.sentences[0].clone();
        let strategy = ConsecutiveUnits::new(ArgumentKinds::same("EVENT"));
        assert!(strategy.candidates(&doc, &scope).is_empty());
    }

    #[test]
    fn test_effective_scope_widens_for_consecutive_units() {
        let consecutive = ConsecutiveUnits::new(ArgumentKinds::same("EVENT"));
        assert_eq!(effective_scope(&consecutive, ScopeKind::Sentence), ScopeKind::Segment);
        assert_eq!(effective_scope(&consecutive, ScopeKind::Document), ScopeKind::Document);

        let adjacent = AdjacentPairs::new(ArgumentKinds::same("EVENT"));
        assert_eq!(effective_scope(&adjacent, ScopeKind::Sentence), ScopeKind::Sentence);

        let filtered = DependencyFiltered::new(Box::new(consecutive));
        assert_eq!(effective_scope(&filtered, ScopeKind::Sentence), ScopeKind::Segment);
    }

    #[test]
    fn test_container_shadowing() {
        // m1 C1 m2 C2 m3
        let doc = Document::new("m1 C1 m2 C2 m3")
            .with_mention(event(0, 2))
            .with_mention(Span::new(3, 5, "TIMEX"))
            .with_mention(event(6, 8))
            .with_mention(Span::new(9, 11, "TIMEX"))
            .with_mention(event(12, 14));
        let strategy = ContainerPairs::of_kind("EVENT", "TIMEX");
        let pairs = strategy.candidates(&doc, &doc.extent());

        let c1 = Span::new(3, 5, "TIMEX");
        let c2 = Span::new(9, 11, "TIMEX");
        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&CandidatePair::new(c1.clone(), event(0, 2))));
        assert!(pairs.contains(&CandidatePair::new(c1, event(6, 8))));
        assert!(pairs.contains(&CandidatePair::new(c2.clone(), event(6, 8))));
        assert!(pairs.contains(&CandidatePair::new(c2, event(12, 14))));
    }

    #[test]
    fn test_gold_containers_leave_member_pool() {
        let (surgery, bleeding, fever) = (event(0, 7), event(12, 20), event(25, 30));
        let doc = Document::new("surgery with bleeding and fever")
            .with_mention(surgery.clone())
            .with_mention(bleeding.clone())
            .with_mention(fever.clone())
            .with_relation(Relation::new("CONTAINS", surgery.clone(), bleeding.clone()));

        let strategy = ContainerPairs::from_gold("EVENT", "CONTAINS", "-1");
        let pairs = strategy.candidates(&doc, &doc.extent());

        assert_eq!(
            pairs,
            vec![
                CandidatePair::new(surgery.clone(), bleeding),
                CandidatePair::new(surgery, fever),
            ]
        );
    }

    #[test]
    fn test_no_containers_no_pairs() {
        let doc = three_sentence_doc();
        let strategy = ContainerPairs::from_gold("EVENT", "CONTAINS", "-1");
        assert!(strategy.candidates(&doc, &doc.extent()).is_empty());
    }

    #[test]
    fn test_dependency_filter() {
        // "pain began after surgery . fever"
        let graph = DependencyGraph::new(vec![
            DependencyNode::new(0, 4, Some(1)),
            DependencyNode::new(5, 10, None),
            DependencyNode::new(11, 16, Some(1)),
            DependencyNode::new(17, 24, Some(2)),
            DependencyNode::new(27, 32, None),
        ]);
        let doc = Document::new("pain began after surgery . fever")
            .with_mention(event(0, 4))
            .with_mention(event(5, 10))
            .with_mention(event(17, 24))
            .with_mention(event(27, 32))
            .with_dependencies(graph);

        let inner = Box::new(AllPairs::new(ArgumentKinds::same("EVENT")));
        let pairs = DependencyFiltered::new(inner).candidates(&doc, &doc.extent());
        // fever is a separate tree
        assert_eq!(pairs.len(), 3);

        let inner = Box::new(AllPairs::new(ArgumentKinds::same("EVENT")));
        let governed = DependencyFiltered::new(inner)
            .with_governance(true)
            .candidates(&doc, &doc.extent());
        // pain/surgery meet at "began", which is neither argument
        assert_eq!(governed.len(), 2);
        assert!(!governed.contains(&CandidatePair::new(event(0, 4), event(17, 24))));
    }

    #[test]
    fn test_dependency_filter_without_parse_passes_through() {
        let doc = three_sentence_doc();
        let inner = Box::new(AdjacentPairs::new(ArgumentKinds::same("EVENT")));
        let pairs = DependencyFiltered::new(inner).candidates(&doc, &doc.extent());
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn test_finalize_drops_reverse_duplicates() {
        let (a, b) = (event(0, 1), event(2, 3));
        let pairs = finalize_pairs(vec![
            CandidatePair::new(a.clone(), b.clone()),
            CandidatePair::new(b.clone(), a.clone()),
            CandidatePair::new(a.clone(), a.clone()),
        ]);
        assert_eq!(pairs, vec![CandidatePair::new(a, b)]);
    }

    #[test]
    fn test_strategy_kind_parse() {
        assert_eq!(StrategyKind::from_str("Adjacent"), Some(StrategyKind::Adjacent));
        assert_eq!(StrategyKind::from_str("all-pairs"), Some(StrategyKind::All));
        assert_eq!(StrategyKind::Container.to_string(), "container");
        assert!(StrategyKind::from_str("random").is_none());
    }

    #[test]
    fn test_strategy_kind_build() {
        let doc = three_sentence_doc();
        let relations = RelationConfig::default();
        let strategy = StrategyKind::Adjacent.build(ArgumentKinds::same("EVENT"), &relations);
        assert_eq!(strategy.name(), "adjacent");
        assert_eq!(strategy.candidates(&doc, &doc.extent()).len(), 4);

        let strategy = StrategyKind::Dependency.build(ArgumentKinds::same("EVENT"), &relations);
        assert_eq!(strategy.name(), "dependency");
    }
}
