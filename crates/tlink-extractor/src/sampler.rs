//! Class-imbalance sampling
//!
//! Two mechanisms for skewed label distributions during training:
//! - stochastic retention of negative examples with a fixed probability
//! - SMOTE-style synthesis of extra minority examples from their nearest
//!   same-label neighbours
//!
//! Both draw from one seeded generator, so a run is reproducible for a given
//! seed and document order. The minority pool is drained once per processing
//! unit; a sampler must not be shared between concurrently processed
//! documents.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tlink_core::{Feature, FeatureValue, Instance, SamplerConfig};

/// Negative retention plus minority oversampling
#[derive(Debug)]
pub struct ImbalanceSampler {
    negative_retention: f64,
    neighbors: usize,
    rng: StdRng,
    pool: BTreeMap<String, Vec<Instance>>,
}

impl ImbalanceSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            negative_retention: clamp_probability(config.negative_retention),
            neighbors: config.smote_neighbors,
            rng: StdRng::seed_from_u64(config.seed),
            pool: BTreeMap::new(),
        }
    }

    /// Keep every negative and never oversample
    pub fn passthrough() -> Self {
        Self::new(&SamplerConfig::default())
    }

    pub fn with_retention(mut self, probability: f64) -> Self {
        self.negative_retention = clamp_probability(probability);
        self
    }

    pub fn with_neighbors(mut self, k: usize) -> Self {
        self.neighbors = k;
        self
    }

    pub fn negative_retention(&self) -> f64 {
        self.negative_retention
    }

    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Draw the retention coin for one negative example
    pub fn retain_negative(&mut self) -> bool {
        self.rng.gen_bool(self.negative_retention)
    }

    /// Remember a written minority instance as an oversampling source.
    /// Does nothing while oversampling is disabled.
    pub fn observe_minority(&mut self, instance: &Instance) {
        if self.neighbors == 0 {
            return;
        }
        self.pool
            .entry(instance.label.clone())
            .or_default()
            .push(instance.clone());
    }

    /// Number of minority instances waiting for synthesis
    pub fn pending(&self) -> usize {
        self.pool.values().map(Vec::len).sum()
    }

    /// Empty the pool without synthesizing; returns how many were dropped
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending();
        self.pool.clear();
        dropped
    }

    /// Synthesize instances from the pooled minority examples and empty the
    /// pool. Labels are visited in sorted order, sources in arrival order.
    pub fn drain_synthetic(&mut self) -> Vec<Instance> {
        let pool = std::mem::take(&mut self.pool);
        let mut synthetic = Vec::new();

        for (label, instances) in pool {
            if instances.len() < 2 {
                tracing::debug!(label = %label, "Single minority instance; no neighbours to interpolate");
                continue;
            }

            let vectors: Vec<BTreeMap<String, f64>> = instances.iter().map(embed).collect();
            for (i, source) in instances.iter().enumerate() {
                for j in nearest(&vectors, i, self.neighbors) {
                    let gap: f64 = self.rng.gen();
                    synthetic.push(self.interpolate(source, &instances[j], gap));
                }
            }
        }

        if !synthetic.is_empty() {
            tracing::debug!(count = synthetic.len(), "Synthesized minority instances");
        }
        synthetic
    }

    /// New instance between `source` and `neighbor`: numbers move `gap` of
    /// the way towards the neighbour, other values are taken from the
    /// neighbour with probability `gap`.
    fn interpolate(&mut self, source: &Instance, neighbor: &Instance, gap: f64) -> Instance {
        let mut features = Vec::with_capacity(source.features.len());
        for feature in &source.features {
            let other = neighbor.features.iter().find(|f| f.name == feature.name);
            let value = match (&feature.value, other.map(|f| &f.value)) {
                (FeatureValue::Number(x), Some(FeatureValue::Number(y))) => {
                    FeatureValue::Number(x + gap * (y - x))
                }
                (_, Some(theirs)) if self.rng.gen_bool(gap) => theirs.clone(),
                (ours, _) => ours.clone(),
            };
            features.push(Feature::new(feature.name.clone(), value));
        }
        Instance::new(source.label.clone(), features)
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        1.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Sparse vector: numbers and flags by name, text as a one-hot `name=value`
fn embed(instance: &Instance) -> BTreeMap<String, f64> {
    let mut vector = BTreeMap::new();
    for feature in &instance.features {
        match &feature.value {
            FeatureValue::Number(n) => {
                vector.insert(feature.name.clone(), *n);
            }
            FeatureValue::Bool(b) => {
                vector.insert(feature.name.clone(), if *b { 1.0 } else { 0.0 });
            }
            FeatureValue::Text(t) => {
                vector.insert(format!("{}={}", feature.name, t), 1.0);
            }
            FeatureValue::Null => {}
        }
    }
    vector
}

/// Summed over the union of keys in sorted order, so the result does not
/// depend on insertion order and is symmetric
fn squared_distance(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    keys.into_iter()
        .map(|key| {
            let d = a.get(key).copied().unwrap_or(0.0) - b.get(key).copied().unwrap_or(0.0);
            d * d
        })
        .sum()
}

/// Indices of the `k` vectors closest to `vectors[i]`, excluding `i`.
/// Equal distances keep index order.
fn nearest(vectors: &[BTreeMap<String, f64>], i: usize, k: usize) -> Vec<usize> {
    let mut distances: Vec<(f64, usize)> = vectors
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(j, v)| (squared_distance(&vectors[i], v), j))
        .collect();
    distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    distances.into_iter().take(k).map(|(_, j)| j).collect()
}

// ============================================================================
// Tests
// ============================================================================
