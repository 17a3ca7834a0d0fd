//! Relation categories
//!
//! Category inversion for argument pairs presented in reverse order, and the
//! per-document gold relation lookup that applies it.

use std::collections::{HashMap, HashSet};

use tlink_core::{Relation, RelationConfig, Span};

// ============================================================================
// Category Inversion
// ============================================================================

/// Maps a category to the label it takes when its arguments are swapped.
///
/// Symmetric categories map to themselves, categories with a modelled
/// opposite map to that opposite, and every other category gains (or loses)
/// the inversion marker. Applying [`CategoryInversion::invert`] twice always
/// returns the original category.
#[derive(Debug, Clone)]
pub struct CategoryInversion {
    marker: String,
    symmetric: HashSet<String>,
    opposites: HashMap<String, String>,
}

impl CategoryInversion {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            symmetric: HashSet::new(),
            opposites: HashMap::new(),
        }
    }

    pub fn from_config(config: &RelationConfig) -> Self {
        let mut inversion = Self::new(config.inversion_marker.clone());
        for category in &config.symmetric {
            inversion = inversion.with_symmetric(category.clone());
        }
        for (a, b) in &config.opposites {
            inversion = inversion.with_opposites(a.clone(), b.clone());
        }
        inversion
    }

    pub fn with_symmetric(mut self, category: impl Into<String>) -> Self {
        self.symmetric.insert(category.into());
        self
    }

    /// Declare `a` and `b` as each other's inverse
    pub fn with_opposites(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        self.opposites.insert(a.clone(), b.clone());
        self.opposites.insert(b, a);
        self
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Label of `category` with its arguments swapped
    pub fn invert(&self, category: &str) -> String {
        if self.symmetric.contains(category) {
            return category.to_string();
        }
        if let Some(opposite) = self.opposites.get(category) {
            return opposite.clone();
        }
        match self.strip_marker(category) {
            Some(base) => base.to_string(),
            None => format!("{}{}", category, self.marker),
        }
    }

    /// True if `label` says the relation holds with arguments reversed
    pub fn is_inverted(&self, label: &str) -> bool {
        self.strip_marker(label).is_some()
    }

    /// `label` without its last marker, if that marker means "reversed".
    ///
    /// Trailing markers alternate between reversing and restoring, so only
    /// an odd count strips. On a symmetric or opposite category the first
    /// marker is part of the name and does not count.
    fn strip_marker<'a>(&self, label: &'a str) -> Option<&'a str> {
        let marker = self.marker.as_str();
        if marker.is_empty() {
            return None;
        }

        let mut root = label;
        let mut count = 0usize;
        while let Some(base) = root.strip_suffix(marker).filter(|b| !b.is_empty()) {
            root = base;
            count += 1;
        }
        if self.symmetric.contains(root) || self.opposites.contains_key(root) {
            count = count.saturating_sub(1);
        }

        if count % 2 == 1 {
            label.strip_suffix(marker)
        } else {
            None
        }
    }

    /// Build the relation a predicted `label` describes for the pair
    /// (`arg1`, `arg2`). A marked label loses the marker and has its
    /// arguments swapped.
    pub fn materialize(&self, label: &str, arg1: Span, arg2: Span) -> Relation {
        match self.strip_marker(label) {
            Some(base) => Relation::new(base, arg2, arg1),
            None => Relation::new(label, arg1, arg2),
        }
    }
}

impl Default for CategoryInversion {
    fn default() -> Self {
        Self::from_config(&RelationConfig::default())
    }
}

// ============================================================================
// Gold Relation Index
// ============================================================================

#[derive(Debug, Clone)]
struct GoldEntry {
    category: String,
    /// The relation was stored with its arguments in non-canonical order
    reversed: bool,
}

/// Gold relations of one document, keyed by their argument pair sorted into
/// canonical span order
#[derive(Debug, Clone, Default)]
pub struct GoldRelationIndex {
    entries: HashMap<(Span, Span), GoldEntry>,
    duplicates: usize,
    rejected: usize,
}

fn canonical_key(arg1: &Span, arg2: &Span) -> ((Span, Span), bool) {
    if arg2 < arg1 {
        ((arg2.clone(), arg1.clone()), true)
    } else {
        ((arg1.clone(), arg2.clone()), false)
    }
}

impl GoldRelationIndex {
    /// Index gold relations. A second relation over the same argument pair
    /// (in either order) is logged and ignored; so is a malformed one.
    pub fn from_relations<'a>(relations: impl IntoIterator<Item = &'a Relation>) -> Self {
        let mut index = Self::default();

        for relation in relations {
            if relation.category.trim().is_empty()
                || relation.arg1.begin > relation.arg1.end
                || relation.arg2.begin > relation.arg2.end
            {
                tracing::warn!(relation = %relation, "Malformed gold relation ignored");
                index.rejected += 1;
                continue;
            }

            let (key, reversed) = canonical_key(&relation.arg1, &relation.arg2);
            if let Some(existing) = index.entries.get(&key) {
                tracing::warn!(
                    kept = %existing.category,
                    ignored = %relation,
                    "Duplicate gold relation for argument pair; keeping first"
                );
                index.duplicates += 1;
                continue;
            }
            index.entries.insert(
                key,
                GoldEntry {
                    category: relation.category.clone(),
                    reversed,
                },
            );
        }

        index
    }

    /// Gold label for the ordered pair (`arg1`, `arg2`), inverted through
    /// `inversion` when the gold relation runs the other way. `None` means
    /// no relation.
    pub fn resolve(
        &self,
        arg1: &Span,
        arg2: &Span,
        inversion: &CategoryInversion,
    ) -> Option<String> {
        let (key, reversed) = canonical_key(arg1, arg2);
        let entry = self.entries.get(&key)?;
        if entry.reversed == reversed {
            Some(entry.category.clone())
        } else {
            Some(inversion.invert(&entry.category))
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Relations dropped because their pair was already indexed
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Relations dropped as malformed
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

// ============================================================================
// Tests
// ============================================================================
