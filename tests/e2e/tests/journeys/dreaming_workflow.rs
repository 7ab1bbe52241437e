//! Full dreaming workflow through the SQLite backend: signal in, dream
//! out, reinforcement on repeat, profile integration, and forgetting.

use reverie_e2e_tests::harness::{seed_night_anxiety, sqlite_engine, sqlite_engine_with_config, reopen};
use reverie_core::{
    DreamStore, EngineConfig, RiskRule, RunOptions, RunStatus,
};

#[test]
fn night_anxiety_signal_becomes_one_dream_with_both_hypotheses() {
    let t = sqlite_engine();
    seed_night_anxiety(&t.store, "ada");

    let report = t.engine.run(Some("ada"), &RunOptions::default());
    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.produced_new);

    let dreams = t.engine.query(Some("ada"), None, 0.0).unwrap();
    assert_eq!(dreams.len(), 1);

    let texts: Vec<&str> = dreams[0].hypotheses.iter().map(|h| h.text.as_str()).collect();
    assert!(
        texts.iter().any(|t| t.contains("anxiety")),
        "expected a cluster hypothesis naming anxiety, got {texts:?}"
    );
    assert!(
        texts
            .iter()
            .any(|t| t.contains("work") && t.contains("late at night")),
        "expected a temporal hypothesis flagging work, got {texts:?}"
    );

    // Every evidence word traces back to an observed edge
    for hypothesis in &dreams[0].hypotheses {
        for word in &hypothesis.evidence {
            assert_eq!(word, "work");
        }
    }
}

#[test]
fn unchanged_signal_reinforces_instead_of_duplicating() {
    let t = sqlite_engine();
    seed_night_anxiety(&t.store, "ada");

    let first = t.engine.run(Some("ada"), &RunOptions::default());
    assert!(first.produced_new);
    assert!(!first.reinforced);

    let second = t.engine.run(Some("ada"), &RunOptions::default());
    assert!(second.reinforced);
    assert!(!second.produced_new);

    let dreams = t.engine.query(Some("ada"), None, 0.0).unwrap();
    assert_eq!(dreams.len(), 1);
    assert_eq!(dreams[0].hits, 1);
}

#[test]
fn empty_store_reports_no_data_and_stays_untouched() {
    let t = sqlite_engine();

    let report = t.engine.run(Some("ada"), &RunOptions::default());
    assert_eq!(report.status, RunStatus::NoData);
    assert!(!report.produced_new);
    assert!(!report.reinforced);

    assert!(t.store.load().unwrap().is_empty());
    assert!(t.store.profile_document("ada").unwrap().is_none());
}

#[test]
fn dreams_survive_reopening_the_database() {
    let t = sqlite_engine();
    seed_night_anxiety(&t.store, "ada");
    t.engine.run(Some("ada"), &RunOptions::default());

    let reverie_e2e_tests::harness::TestEngine { dir, store, engine } = t;
    drop(engine);
    drop(store);

    let t = reopen(dir);
    let dreams = t.engine.query(Some("ada"), None, 0.0).unwrap();
    assert_eq!(dreams.len(), 1);

    // A rerun over the reopened store still reinforces
    let report = t.engine.run(Some("ada"), &RunOptions::default());
    assert!(report.reinforced);
}

#[test]
fn profile_collects_insights_and_risk_flags() {
    let mut config = EngineConfig::default();
    config.risk_rules = vec![RiskRule::new("sleep-disruption", &["late at night"])];
    let t = sqlite_engine_with_config(config);
    seed_night_anxiety(&t.store, "ada");

    t.engine.run(Some("ada"), &RunOptions::default());

    let document = t.store.profile_document("ada").unwrap().unwrap();
    assert!(!document["insights"].as_array().unwrap().is_empty());
    assert_eq!(document["flags"][0], "sleep-disruption");

    // Flags stay a set across runs
    t.engine.run(Some("ada"), &RunOptions::default());
    let document = t.store.profile_document("ada").unwrap().unwrap();
    assert_eq!(document["flags"].as_array().unwrap().len(), 1);
}

#[test]
fn purge_deletes_old_dreams_permanently() {
    let t = sqlite_engine();
    seed_night_anxiety(&t.store, "ada");
    t.engine.run(Some("ada"), &RunOptions::default());

    // Age the stored dream past the cutoff
    let mut dreams = t.store.load().unwrap();
    dreams[0].created_at = chrono::Utc::now() - chrono::Duration::days(120);
    t.store.replace(&dreams).unwrap();

    let report = t.engine.purge(30).unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.remaining, 0);
    assert!(t.engine.query(Some("ada"), None, 0.0).unwrap().is_empty());
}
