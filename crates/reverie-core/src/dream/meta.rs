//! Meta-dream synthesis
//!
//! Once dreams accumulate, their hypotheses are clustered *across* dreams
//! by token overlap. Each group of recurring claims becomes a meta-dream
//! whose single hypothesis averages the member confidences. Meta-dreams
//! flow back through the ordinary reinforce-or-append path, so they can
//! merge into existing dreams instead of piling up.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::{normalize_tokens, token_overlap, Dream, DreamKind, LifecycleConfig};
use crate::hypothesis::Hypothesis;

/// Pairwise token overlap above which two hypotheses share a group
pub const META_OVERLAP_THRESHOLD: f64 = 0.4;

/// Meta-dreams emitted per run, at most
pub const MAX_META_DREAMS_PER_RUN: usize = 3;

/// Meta-synthesis knobs
#[derive(Debug, Clone)]
pub struct MetaConfig {
    /// Pairwise token overlap for grouping hypotheses
    pub overlap_threshold: f64,
    /// Cap on meta-dreams per run
    pub max_per_run: usize,
    /// Minimum hypotheses per group
    pub min_group_size: usize,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: META_OVERLAP_THRESHOLD,
            max_per_run: MAX_META_DREAMS_PER_RUN,
            min_group_size: 2,
        }
    }
}

/// Cluster hypotheses across the surviving dreams into meta-dream
/// candidates
///
/// Grouping is greedy: each hypothesis joins the first group whose
/// representative it overlaps, otherwise starts a new group. Only groups
/// spanning more than one dream qualify - a dream restating itself is
/// reinforcement, not a higher-order pattern.
pub fn synthesize_meta_dreams(
    dreams: &[Dream],
    owner: Option<&str>,
    config: &MetaConfig,
    lifecycle: &LifecycleConfig,
    now: DateTime<Utc>,
) -> Vec<Dream> {
    // (source dream index, hypothesis)
    let pool: Vec<(usize, &Hypothesis)> = dreams
        .iter()
        .enumerate()
        .filter(|(_, d)| d.matches_owner(owner))
        .flat_map(|(i, d)| d.hypotheses.iter().map(move |h| (i, h)))
        .collect();

    let mut groups: Vec<Vec<(usize, &Hypothesis)>> = Vec::new();
    for (source, hypothesis) in pool {
        match groups.iter_mut().find(|g| {
            token_overlap(&g[0].1.text, &hypothesis.text) > config.overlap_threshold
        }) {
            Some(group) => group.push((source, hypothesis)),
            None => groups.push(vec![(source, hypothesis)]),
        }
    }

    groups.retain(|g| {
        let sources: BTreeSet<usize> = g.iter().map(|(i, _)| *i).collect();
        g.len() >= config.min_group_size && sources.len() >= 2
    });

    // Larger recurring groups first; mean confidence breaks ties
    groups.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| mean_confidence(b).total_cmp(&mean_confidence(a)))
    });
    groups.truncate(config.max_per_run);

    groups
        .into_iter()
        .map(|group| meta_dream_from_group(&group, owner, lifecycle, now))
        .collect()
}

fn mean_confidence(group: &[(usize, &Hypothesis)]) -> f64 {
    group.iter().map(|(_, h)| h.confidence).sum::<f64>() / group.len() as f64
}

fn meta_dream_from_group(
    group: &[(usize, &Hypothesis)],
    owner: Option<&str>,
    lifecycle: &LifecycleConfig,
    now: DateTime<Utc>,
) -> Dream {
    let summary = shared_token_summary(group);
    let confidence = mean_confidence(group).clamp(0.0, 1.0);

    let mut evidence: Vec<String> = Vec::new();
    let mut salience: f64 = 0.0;
    for (_, hypothesis) in group {
        salience = salience.max(hypothesis.salience);
        for word in &hypothesis.evidence {
            if !evidence.contains(word) {
                evidence.push(word.clone());
            }
        }
    }

    let hypothesis = Hypothesis {
        text: format!("recurring theme across dreams: {summary}"),
        confidence,
        evidence,
        salience: salience.clamp(0.0, 1.0),
    };

    let initial_confidence =
        lifecycle.base_confidence + lifecycle.confidence_span * confidence;

    Dream::new(
        owner,
        summary,
        vec![hypothesis],
        initial_confidence,
        lifecycle.default_decay_rate,
        DreamKind::MetaDream,
        now,
    )
}

/// Tokens common to every member text; falls back to tokens shared by at
/// least two members when the full intersection is empty
fn shared_token_summary(group: &[(usize, &Hypothesis)]) -> String {
    let token_sets: Vec<BTreeSet<String>> = group
        .iter()
        .map(|(_, h)| normalize_tokens(&h.text))
        .collect();

    let mut shared: Vec<String> = token_sets
        .first()
        .map(|first| {
            first
                .iter()
                .filter(|t| token_sets.iter().all(|set| set.contains(*t)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    if shared.is_empty() {
        let mut counted: BTreeSet<String> = BTreeSet::new();
        for (i, set) in token_sets.iter().enumerate() {
            for token in set {
                if token_sets
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && other.contains(token))
                {
                    counted.insert(token.clone());
                }
            }
        }
        shared = counted.into_iter().collect();
    }

    shared.join(" ")
}
