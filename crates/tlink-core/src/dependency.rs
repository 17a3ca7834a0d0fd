//! Dependency parse access
//!
//! Candidate filtering only needs one question answered: do two spans
//! share a syntactic ancestor, and which node is it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Span;

/// A node of a dependency parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub begin: usize,
    pub end: usize,

    /// Part-of-speech tag
    #[serde(default)]
    pub pos: String,

    /// Index of the governing node; `None` for the root
    #[serde(default)]
    pub head: Option<usize>,
}

impl DependencyNode {
    pub fn new(begin: usize, end: usize, head: Option<usize>) -> Self {
        Self {
            begin,
            end,
            pos: String::new(),
            head,
        }
    }

    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = pos.into();
        self
    }

    /// True if this node lies inside `span`
    pub fn within(&self, span: &Span) -> bool {
        span.begin <= self.begin && self.end <= span.end
    }
}

/// Read access to a dependency parse
pub trait DependencyIndex {
    /// Lowest node that governs (directly or transitively) the heads of both spans
    fn common_ancestor(&self, a: &Span, b: &Span) -> Option<DependencyNode>;
}

/// Dependency parse stored as a node list with head pointers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<DependencyNode>,
}

impl DependencyGraph {
    pub fn new(nodes: Vec<DependencyNode>) -> Self {
        Self { nodes }
    }

    /// Head node of `span`: the first node inside the span whose governor
    /// lies outside it
    pub fn head_of(&self, span: &Span) -> Option<usize> {
        self.nodes.iter().position(|node| {
            node.within(span)
                && match node.head.and_then(|h| self.nodes.get(h)) {
                    Some(governor) => !governor.within(span),
                    None => true,
                }
        })
    }

    /// `index` followed by its governors up to the root
    fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut chain = vec![index];
        let mut current = index;
        // bounded walk; a malformed parse may contain a cycle
        while chain.len() <= self.nodes.len() {
            match self.nodes.get(current).and_then(|n| n.head) {
                Some(head) if head < self.nodes.len() && !chain.contains(&head) => {
                    chain.push(head);
                    current = head;
                }
                _ => break,
            }
        }
        chain
    }
}

impl DependencyIndex for DependencyGraph {
    fn common_ancestor(&self, a: &Span, b: &Span) -> Option<DependencyNode> {
        let head_a = self.head_of(a)?;
        let head_b = self.head_of(b)?;

        let above_a: HashSet<usize> = self.ancestors(head_a).into_iter().collect();
        self.ancestors(head_b)
            .into_iter()
            .find(|idx| above_a.contains(idx))
            .and_then(|idx| self.nodes.get(idx).cloned())
    }
}
