//! End-to-end screener runs over hand-built batches.

use radar_screener::data::RawRecord;
use radar_screener::screener::{
    FilterStage, Label, ScoringProfile, ScreenerConfig, ScreenerPipeline,
};

fn raw(symbol: &str, rank: Option<u32>, change_pct: f64, volume: f64) -> RawRecord {
    RawRecord {
        rank,
        name: Some(format!("{} Inc", symbol)),
        symbol: Some(symbol.to_string()),
        price: Some(25.0),
        change_pct: Some(change_pct),
        previous_close: None,
        volume: Some(volume),
    }
}

fn crypto_pipeline() -> ScreenerPipeline {
    ScreenerPipeline::new(ScreenerConfig::for_profile(ScoringProfile::Ranked))
        .unwrap()
        .with_universe("crypto")
}

fn stocks_pipeline() -> ScreenerPipeline {
    let config = ScreenerConfig::for_profile(ScoringProfile::Unranked).with_floors(0.0, -100.0);
    ScreenerPipeline::new(config).unwrap().with_universe("us_stocks")
}

fn wide_batch() -> Vec<RawRecord> {
    vec![
        raw("AAA", Some(1), 12.0, 9.0e9),
        raw("BBB", Some(2), 3.1, 4.0e9),
        raw("CCC", Some(3), 2.4, 2.5e9),
        raw("DDD", Some(7), 8.7, 1.1e9),
        raw("EEE", Some(9), 2.2, 6.0e8),
        raw("FFF", Some(14), 15.5, 3.3e8),
        raw("GGG", Some(21), 4.4, 2.2e8),
        raw("HHH", Some(35), 6.1, 1.9e8),
        raw("III", Some(48), 2.9, 1.4e8),
        raw("JJJ", Some(60), 21.0, 9.0e7),
        raw("KKK", Some(77), 5.3, 7.5e7),
        raw("LLL", Some(90), 3.7, 6.0e7),
    ]
}

#[test]
fn test_everything_filtered_out_is_not_an_error() {
    let result = crypto_pipeline().run(&[
        raw("SLOW", Some(4), 0.3, 8.0e8),
        raw("THIN", Some(80), 9.0, 1.0e6),
    ]);

    assert!(result.rows.is_empty());
    assert!(result.clustering.is_none());
    assert_eq!(result.total_records, 2);

    let change = result
        .filter_results
        .iter()
        .find(|f| f.stage == FilterStage::Change)
        .unwrap();
    assert_eq!(change.passed, 0);
}

#[test]
fn test_dominant_candidate_is_momentum() {
    let config = ScreenerConfig::for_profile(ScoringProfile::Unranked).with_floors(5.0e7, -100.0);
    let result = ScreenerPipeline::new(config)
        .unwrap()
        .with_universe("us_stocks")
        .run(&[
            raw("ROCKET", None, 40.0, 4.0e8),
            raw("STEADY", None, 3.0, 1.2e8),
            raw("CALM", None, 2.5, 1.1e8),
            raw("PENNY", None, 55.0, 1.0e6),
            raw("QUIET", None, 2.0, 1.0e8),
        ]);

    // PENNY has the largest move but trades under the volume floor.
    let volume = result
        .filter_results
        .iter()
        .find(|f| f.stage == FilterStage::Volume)
        .unwrap();
    assert_eq!(volume.eliminated, 1);
    assert!(result.rows.iter().all(|r| r.symbol() != "PENNY"));

    let symbols: Vec<&str> = result.rows.iter().map(|r| r.symbol()).collect();
    assert_eq!(symbols, vec!["ROCKET", "STEADY", "CALM", "QUIET"]);
    assert!(result.was_clustered());
    assert_eq!(result.rows[0].label, Label::Momentum);
    assert!(result.rows[1..].iter().all(|r| r.label == Label::Neutral));
}

#[test]
fn test_unfloored_stocks_keep_every_record() {
    let result = stocks_pipeline().run(&[
        raw("FLAT", None, -3.0, 1.0),
        raw("UP", None, 1.0, 2.0),
        raw("DOWN", None, -50.0, 3.0),
    ]);

    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.rows[0].symbol(), "UP");
}

#[test]
fn test_volume_floor_boundary() {
    let result = crypto_pipeline().run(&[
        raw("EDGE", Some(5), 5.0, 50_000_000.0),
        raw("OVER", Some(6), 5.0, 50_000_001.0),
    ]);

    let symbols: Vec<&str> = result.rows.iter().map(|r| r.symbol()).collect();
    assert_eq!(symbols, vec!["OVER"]);
}

#[test]
fn test_runs_are_reproducible() {
    let first = crypto_pipeline().run(&wide_batch());
    let second = crypto_pipeline().run(&wide_batch());

    assert!(first.was_clustered());
    assert_eq!(first.rows, second.rows);
}

#[test]
fn test_labels_do_not_depend_on_batch_order() {
    let forward = crypto_pipeline().run(&wide_batch());
    let mut reversed_batch = wide_batch();
    reversed_batch.reverse();
    let backward = crypto_pipeline().run(&reversed_batch);

    assert_eq!(forward.rows.len(), backward.rows.len());
    for row in &forward.rows {
        let other = backward
            .rows
            .iter()
            .find(|r| r.symbol() == row.symbol())
            .unwrap();
        assert_eq!(row.score(), other.score());
        assert_eq!(row.label, other.label);
    }
}

#[test]
fn test_momentum_cluster_has_highest_mean_score() {
    let result = crypto_pipeline().run(&wide_batch());
    let summary = result.clustering.as_ref().unwrap();

    let momentum_mean = summary
        .clusters
        .iter()
        .find(|c| c.cluster_id == summary.momentum_cluster)
        .unwrap()
        .mean_score;
    assert!(summary.clusters.iter().all(|c| c.mean_score <= momentum_mean));

    let sizes: usize = summary.clusters.iter().map(|c| c.size).sum();
    assert_eq!(sizes, result.rows.len());
    assert!(!result.momentum().is_empty());
}

#[test]
fn test_candidates_satisfy_both_floors_in_score_order() {
    let result = crypto_pipeline().run(&wide_batch());

    assert!(result
        .rows
        .iter()
        .all(|r| r.scored.snapshot.volume > 50_000_000.0 && r.scored.snapshot.change_pct >= 2.0));
    assert!(result.rows.windows(2).all(|w| w[0].score() >= w[1].score()));

    let mut symbols: Vec<&str> = result.rows.iter().map(|r| r.symbol()).collect();
    symbols.sort_unstable();
    symbols.dedup();
    assert_eq!(symbols.len(), result.rows.len());
}

#[test]
fn test_alerts_are_independent_of_clustering() {
    let mut config = ScreenerConfig::for_profile(ScoringProfile::Ranked).with_alert_min_score(20.0);
    config.min_cluster_sample = 100;
    let result = ScreenerPipeline::new(config).unwrap().run(&wide_batch());

    assert!(!result.was_clustered());
    assert!(result.rows.iter().all(|r| r.label == Label::InsufficientData));

    let alerts = result.alerts.unwrap();
    assert!(!alerts.is_empty());
    assert!(alerts.alerts.iter().all(|a| a.score >= 20.0));
    assert!(alerts.alerts.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_malformed_records_do_not_stop_the_batch() {
    let mut no_volume = raw("NOVOL", Some(8), 6.0, 1.0);
    no_volume.volume = None;
    let mut bad_price = raw("NEG", Some(9), 6.0, 3.0e8);
    bad_price.price = Some(-1.0);
    let mut derived = raw("PREV", Some(10), 0.0, 2.0e8);
    derived.change_pct = None;
    derived.price = Some(110.0);
    derived.previous_close = Some(100.0);

    let result = crypto_pipeline().run(&[no_volume, bad_price, derived, raw("OK", Some(11), 3.0, 2.0e8)]);

    let validation = &result.filter_results[1];
    assert_eq!(validation.stage, FilterStage::Validation);
    assert_eq!(validation.passed, 2);

    let prev = result.rows.iter().find(|r| r.symbol() == "PREV").unwrap();
    assert!((prev.scored.snapshot.change_pct - 10.0).abs() < 1e-9);
}
