//! Clustering Engine
//!
//! Partitions word vectors into k clusters by iterative centroid
//! assignment over Euclidean distance. This is a bounded, reproducible
//! heuristic, not an optimal partition: the output feeds a fuzzy
//! hypothesis layer, so a fixed iteration cap matters more than exactness.
//!
//! Randomness (only used to pad centroid seeds when there are fewer items
//! than clusters) comes from an injected seed, so results are reproducible
//! in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::aggregate::WordVector;
use crate::signal::EmotionVector;

/// Default upper bound on cluster count
pub const DEFAULT_MAX_CLUSTERS: usize = 8;

/// Iteration cap for centroid refinement
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

// ============================================================================
// TYPES
// ============================================================================

/// One cluster of words, ephemeral within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Mean of the member vectors
    pub centroid: EmotionVector,
    /// Member words
    pub members: Vec<String>,
}

/// Clustering knobs
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Upper bound on k regardless of data volume
    pub max_clusters: usize,
    /// Hard cap on refinement iterations
    pub max_iterations: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_clusters: DEFAULT_MAX_CLUSTERS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

// ============================================================================
// CLUSTERING
// ============================================================================

/// Number of clusters for a given data volume: `max(1, floor(sqrt(n)))`,
/// bounded by the configured maximum
pub fn cluster_count(n: usize, max_clusters: usize) -> usize {
    let k = (n as f64).sqrt().floor() as usize;
    k.max(1).min(max_clusters.max(1))
}

/// Partition word vectors into `max(1, floor(sqrt(n)))` clusters
pub fn cluster_word_vectors(
    items: &[WordVector],
    config: &ClusterConfig,
    seed: u64,
) -> Vec<Cluster> {
    let k = cluster_count(items.len(), config.max_clusters);
    cluster_with_k(items, k, config.max_iterations, seed)
}

/// Partition word vectors into exactly `k` clusters (empty ones dropped)
///
/// Seeds are the first `k` items; if fewer items than `k` exist, the seed
/// list is padded with random picks from the items. Refinement stops early
/// once no item changes cluster assignment.
pub fn cluster_with_k(
    items: &[WordVector],
    k: usize,
    max_iterations: usize,
    seed: u64,
) -> Vec<Cluster> {
    if items.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);

    // Seed centroids with the first k items, padding randomly when short
    let mut centroids: Vec<EmotionVector> =
        items.iter().take(k).map(|wv| wv.vector).collect();
    while centroids.len() < k {
        let pick = rng.gen_range(0..items.len());
        centroids.push(items[pick].vector);
    }

    let mut assignments = vec![0usize; items.len()];
    for (i, item) in items.iter().enumerate() {
        assignments[i] = nearest_centroid(&item.vector, &centroids);
    }

    for _ in 0..max_iterations {
        // Recompute each centroid as the mean of its members; a cluster
        // that lost all members keeps its previous centroid
        for (c, centroid) in centroids.iter_mut().enumerate() {
            let member_vectors: Vec<EmotionVector> = items
                .iter()
                .zip(assignments.iter())
                .filter(|(_, a)| **a == c)
                .map(|(item, _)| item.vector)
                .collect();
            if !member_vectors.is_empty() {
                *centroid = EmotionVector::mean_of(&member_vectors);
            }
        }

        let mut changed = false;
        for (i, item) in items.iter().enumerate() {
            let next = nearest_centroid(&item.vector, &centroids);
            if next != assignments[i] {
                assignments[i] = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut clusters: Vec<Cluster> = centroids
        .into_iter()
        .map(|centroid| Cluster {
            centroid,
            members: Vec::new(),
        })
        .collect();
    for (item, a) in items.iter().zip(assignments.iter()) {
        clusters[*a].members.push(item.key.clone());
    }

    clusters.retain(|c| !c.members.is_empty());
    clusters
}

fn nearest_centroid(vector: &EmotionVector, centroids: &[EmotionVector]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = vector.euclidean_distance(centroid);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}
