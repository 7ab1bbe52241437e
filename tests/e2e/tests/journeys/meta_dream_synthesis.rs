//! Meta-dream synthesis across existing dreams: overlapping hypotheses
//! collapse into exactly one higher-order outcome per shared theme -
//! either a stored meta-dream or a single merge, never two.

use reverie_core::{
    compose_dream, DreamKind, DreamStore, Hypothesis, LifecycleConfig, RunOptions, RunStatus,
};
use reverie_core::Emotion;
use reverie_e2e_tests::harness::{at_hour, edge_at, sqlite_engine};

fn stored_dream(owner: &str, text: &str) -> reverie_core::Dream {
    compose_dream(
        Some(owner),
        &[Hypothesis {
            text: text.to_string(),
            confidence: 0.7,
            evidence: vec!["work".to_string()],
            salience: 0.6,
        }],
        &LifecycleConfig::default(),
        chrono::Utc::now(),
    )
}

fn seed_unrelated_signal(t: &reverie_e2e_tests::harness::TestEngine) {
    for i in 0..3 {
        edge_at(&t.store, "ada", "garden", Emotion::Calm, 0.5, at_hour(i, 10));
    }
}

#[test]
fn strongly_overlapping_dreams_yield_one_merge_not_two_metas() {
    let t = sqlite_engine();

    // Hypothesis texts sharing well over 40% of their tokens
    t.store
        .replace(&[
            stored_dream("ada", "pressure about work deadlines builds anxiety"),
            stored_dream("ada", "pressure about work meetings builds anxiety"),
        ])
        .unwrap();
    seed_unrelated_signal(&t);

    let report = t.engine.run(Some("ada"), &RunOptions::default());
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.meta_dreams.len(), 1, "one synthesized theme, not two");
    for token in ["pressure", "work", "builds", "anxiety"] {
        assert!(
            report.meta_dreams[0].summary.contains(token),
            "missing {token}"
        );
    }

    // The synthesized meta-dream is itself so close to its sources that it
    // merges back into one of them: exactly one meta outcome overall
    let stored = t.engine.query(Some("ada"), None, 0.0).unwrap();
    let stored_metas = stored
        .iter()
        .filter(|d| d.kind == DreamKind::MetaDream)
        .count();
    let merged_sources = stored
        .iter()
        .filter(|d| d.kind == DreamKind::Dream && d.hits > 0)
        .count();
    assert_eq!(stored_metas + merged_sources, 1);
}

#[test]
fn moderately_overlapping_dreams_store_a_meta_dream() {
    let t = sqlite_engine();

    // Texts sharing 5 of 12 tokens: enough to group (> 0.4), too little
    // for the shared-token summary to merge back into a source (<= 0.45)
    t.store
        .replace(&[
            stored_dream(
                "ada",
                "late night pressure around work deadlines builds steady anxiety every weekday evening",
            ),
            stored_dream(
                "ada",
                "quiet morning pressure because work reviews builds lingering anxiety during night routines",
            ),
        ])
        .unwrap();
    seed_unrelated_signal(&t);

    let report = t.engine.run(Some("ada"), &RunOptions::default());
    assert_eq!(report.meta_dreams.len(), 1);

    let stored = t.engine.query(Some("ada"), None, 0.0).unwrap();
    let metas: Vec<_> = stored
        .iter()
        .filter(|d| d.kind == DreamKind::MetaDream)
        .collect();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0].hypotheses.len(), 1);
    // Mean of the member confidences
    assert!((metas[0].hypotheses[0].confidence - 0.7).abs() < 1e-9);
    for token in ["anxiety", "builds", "night", "pressure", "work"] {
        assert!(metas[0].summary.contains(token), "missing {token}");
    }
}

#[test]
fn disjoint_dreams_produce_no_meta_dream() {
    let t = sqlite_engine();

    t.store
        .replace(&[
            stored_dream("ada", "pressure about work deadlines builds anxiety"),
            stored_dream("ada", "quiet garden mornings bring calm"),
        ])
        .unwrap();

    for i in 0..3 {
        edge_at(&t.store, "ada", "reading", Emotion::Joy, 0.5, at_hour(i, 10));
    }

    let report = t.engine.run(Some("ada"), &RunOptions::default());
    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.meta_dreams.is_empty());
}

#[test]
fn meta_dream_reinforces_on_the_next_pass_instead_of_duplicating() {
    let t = sqlite_engine();

    t.store
        .replace(&[
            stored_dream(
                "ada",
                "late night pressure around work deadlines builds steady anxiety every weekday evening",
            ),
            stored_dream(
                "ada",
                "quiet morning pressure because work reviews builds lingering anxiety during night routines",
            ),
        ])
        .unwrap();
    seed_unrelated_signal(&t);

    t.engine.run(Some("ada"), &RunOptions::default());
    let after_first = t.engine.query(Some("ada"), None, 0.0).unwrap();
    assert_eq!(
        after_first
            .iter()
            .filter(|d| d.kind == DreamKind::MetaDream)
            .count(),
        1
    );

    // The next pass re-synthesizes the same theme; it must reinforce the
    // stored meta-dream rather than add another
    t.engine.run(Some("ada"), &RunOptions::default());
    let after_second = t.engine.query(Some("ada"), None, 0.0).unwrap();
    let metas: Vec<_> = after_second
        .iter()
        .filter(|d| d.kind == DreamKind::MetaDream)
        .collect();
    assert_eq!(metas.len(), 1);
    assert!(metas[0].hits >= 1);
}
