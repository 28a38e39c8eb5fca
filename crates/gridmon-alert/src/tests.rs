use crate::manager::{auto_resolve_stale, run_alert_round, submit_candidates};
use crate::patterns::{detect_patterns, oscillation, rapid_change, sustained_deviation};
use crate::rules::{default_rules, Condition, ThresholdRule};
use crate::AlertCandidate;
use chrono::{DateTime, Duration, Utc};
use gridmon_common::types::{
    Alert, Connection, ConnectionStatus, ConnectionType, MetricSample, MetricType, Severity,
};
use gridmon_storage::engine::SqliteStorageEngine;
use gridmon_storage::StorageEngine;
use tempfile::TempDir;

fn rule_by_id(id: &str) -> ThresholdRule {
    default_rules()
        .into_iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("rule {id} should exist"))
}

fn setup_store() -> (TempDir, SqliteStorageEngine) {
    gridmon_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let engine = SqliteStorageEngine::open(&dir.path().join("gridmon.db")).unwrap();
    (dir, engine)
}

fn make_candidate(connection_id: &str, alert_type: &str, severity: Severity) -> AlertCandidate {
    AlertCandidate {
        connection_id: connection_id.to_string(),
        alert_type: alert_type.to_string(),
        severity,
        message: format!("{alert_type} fired"),
    }
}

fn make_sample(
    connection_id: &str,
    metric_type: MetricType,
    value: f64,
    ts: DateTime<Utc>,
) -> MetricSample {
    MetricSample {
        id: gridmon_common::id::next_id(),
        connection_id: connection_id.to_string(),
        metric_type,
        value,
        unit: metric_type.unit().to_string(),
        timestamp: ts,
    }
}

// ---- Threshold rules ----

#[test]
fn greater_than_matches_strict_comparison() {
    let rule = rule_by_id("voltage_high");
    assert!(!rule.evaluate(253.0));
    assert!(rule.evaluate(253.01));
    assert!(rule.evaluate(260.0));
    assert!(!rule.evaluate(230.0));
}

#[test]
fn less_than_matches_strict_comparison() {
    let rule = rule_by_id("voltage_low");
    assert!(!rule.evaluate(207.0));
    assert!(rule.evaluate(206.99));
    assert!(!rule.evaluate(230.0));
}

#[test]
fn deviation_from_is_symmetric_around_nominal() {
    let rule = rule_by_id("frequency_deviation");
    assert!(rule.evaluate(50.51));
    assert!(rule.evaluate(49.49));
    assert!(!rule.evaluate(50.5));
    assert!(!rule.evaluate(49.5));
    assert!(!rule.evaluate(50.0));
}

#[test]
fn deviation_from_is_false_for_non_frequency_metrics() {
    let rule = ThresholdRule {
        id: "bogus_deviation",
        metric_type: MetricType::Voltage,
        condition: Condition::DeviationFrom,
        threshold: 0.5,
        severity: Severity::Medium,
        message: "should never fire",
        enabled: true,
    };
    assert!(!rule.evaluate(300.0));
}

#[test]
fn one_temperature_sample_can_fire_warning_and_critical() {
    let sample = make_sample("conn-1", MetricType::Temperature, 90.0, Utc::now());
    let fired: Vec<_> = default_rules()
        .iter()
        .filter(|r| r.metric_type == MetricType::Temperature && r.evaluate(sample.value))
        .map(|r| r.id)
        .collect();
    assert_eq!(fired, vec!["temperature_warning", "temperature_critical"]);
}

#[test]
fn candidate_message_interpolates_value_unit_and_name() {
    let rule = rule_by_id("voltage_high");
    let sample = make_sample("conn-1", MetricType::Voltage, 260.123, Utc::now());
    let candidate = rule.candidate(&sample, "North Substation");
    assert_eq!(candidate.alert_type, "voltage_high");
    assert_eq!(candidate.severity, Severity::High);
    assert_eq!(
        candidate.message,
        "Critical high voltage detected - 260.12V at North Substation"
    );
}

#[test]
fn condition_round_trips_through_strings() {
    for condition in [
        Condition::GreaterThan,
        Condition::LessThan,
        Condition::DeviationFrom,
    ] {
        let parsed: Condition = condition.to_string().parse().unwrap();
        assert_eq!(parsed, condition);
    }
    assert!("sideways".parse::<Condition>().is_err());
}

// ---- Pattern detection ----

#[test]
fn rapid_change_detects_large_step() {
    // 20% jump between the two newest readings
    let rate = rapid_change(&[120.0, 100.0, 100.0]).expect("should detect");
    assert!((rate - 20.0).abs() < 1e-9);
}

#[test]
fn rapid_change_ignores_small_step_and_short_windows() {
    assert!(rapid_change(&[105.0, 100.0, 100.0]).is_none());
    // Two points are not enough even for a huge step
    assert!(rapid_change(&[200.0, 100.0]).is_none());
}

#[test]
fn rapid_change_guards_zero_previous_value() {
    assert!(rapid_change(&[100.0, 0.0, 50.0]).is_none());
}

#[test]
fn oscillation_detects_alternating_sequence() {
    // 6 points with >= 3 direction reversals
    assert!(oscillation(&[10.0, 12.0, 9.0, 13.0, 8.0, 14.0]));
}

#[test]
fn oscillation_ignores_monotonic_sequence() {
    assert!(!oscillation(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]));
}

#[test]
fn oscillation_needs_at_least_five_points() {
    assert!(!oscillation(&[10.0, 12.0, 9.0, 13.0]));
}

#[test]
fn sustained_deviation_detects_out_of_range_voltage() {
    let values = vec![300.0; 10];
    assert!(sustained_deviation(&values, MetricType::Voltage));
}

#[test]
fn sustained_deviation_ignores_in_range_voltage() {
    let values: Vec<f64> = (0..10)
        .map(|i| if i % 2 == 0 { 230.0 } else { 225.0 })
        .collect();
    assert!(!sustained_deviation(&values, MetricType::Voltage));
}

#[test]
fn sustained_deviation_ignores_positive_power() {
    // Power has no upper bound; only negative readings are out of range
    let values = vec![5000.0; 10];
    assert!(!sustained_deviation(&values, MetricType::Power));
}

#[test]
fn detect_patterns_synthesizes_alert_types() {
    // Oscillating and far outside the [220, 240] voltage range
    let values = vec![300.0, 320.0, 295.0, 325.0, 290.0, 330.0];
    let candidates = detect_patterns("conn-1", "East Feeder", MetricType::Voltage, &values);

    let types: Vec<&str> = candidates.iter().map(|c| c.alert_type.as_str()).collect();
    assert!(types.contains(&"voltage_oscillation"));
    assert!(types.contains(&"sustained_voltage_deviation"));

    let oscillation = candidates
        .iter()
        .find(|c| c.alert_type == "voltage_oscillation")
        .unwrap();
    assert_eq!(oscillation.severity, Severity::Medium);
    assert!(oscillation.message.contains("East Feeder"));

    let sustained = candidates
        .iter()
        .find(|c| c.alert_type == "sustained_voltage_deviation")
        .unwrap();
    assert_eq!(sustained.severity, Severity::Low);
}

#[test]
fn detect_patterns_requires_three_points() {
    let candidates = detect_patterns("conn-1", "East Feeder", MetricType::Voltage, &[300.0, 10.0]);
    assert!(candidates.is_empty());
}

// ---- Dedup and auto-resolve ----

#[test]
fn duplicate_candidate_is_suppressed_across_rounds() {
    let (_dir, store) = setup_store();
    let now = Utc::now();
    let candidate = make_candidate("conn-1", "voltage_high", Severity::High);

    let first = submit_candidates(&store, &[candidate.clone()], now, Duration::minutes(10));
    let second = submit_candidates(
        &store,
        &[candidate],
        now + Duration::minutes(1),
        Duration::minutes(10),
    );

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert_eq!(store.count_open_alerts().unwrap(), 1);
}

#[test]
fn duplicate_candidate_is_suppressed_within_one_batch() {
    let (_dir, store) = setup_store();
    let now = Utc::now();
    let candidates = vec![
        make_candidate("conn-1", "voltage_high", Severity::High),
        make_candidate("conn-1", "voltage_high", Severity::High),
    ];

    let inserted = submit_candidates(&store, &candidates, now, Duration::minutes(10));
    assert_eq!(inserted, 1);
    assert_eq!(store.count_open_alerts().unwrap(), 1);
}

#[test]
fn distinct_alert_types_are_not_deduped() {
    let (_dir, store) = setup_store();
    let now = Utc::now();
    let candidates = vec![
        make_candidate("conn-1", "temperature_warning", Severity::Medium),
        make_candidate("conn-1", "temperature_critical", Severity::High),
        make_candidate("conn-2", "temperature_warning", Severity::Medium),
    ];

    let inserted = submit_candidates(&store, &candidates, now, Duration::minutes(10));
    assert_eq!(inserted, 3);
}

#[test]
fn auto_resolve_boundary_conditions() {
    let (_dir, store) = setup_store();
    let now = Utc::now();

    let make_alert = |alert_type: &str, severity: Severity, hours_ago: i64| Alert {
        id: gridmon_common::id::next_id(),
        connection_id: "conn-1".to_string(),
        alert_type: alert_type.to_string(),
        severity,
        message: format!("{alert_type} fired"),
        resolved: false,
        created_at: now - Duration::hours(hours_ago),
        resolved_at: None,
    };

    store
        .insert_alert(&make_alert("power_factor_low", Severity::Low, 25))
        .unwrap();
    store
        .insert_alert(&make_alert("frequency_deviation", Severity::Medium, 23))
        .unwrap();
    store
        .insert_alert(&make_alert("voltage_high", Severity::High, 100))
        .unwrap();

    let resolved = auto_resolve_stale(&store, now, Duration::hours(24)).unwrap();
    assert_eq!(resolved, 1);

    let open = store.list_open_alerts(10, 0).unwrap();
    let open_types: Vec<&str> = open.iter().map(|a| a.alert_type.as_str()).collect();
    assert!(!open_types.contains(&"power_factor_low"));
    assert!(open_types.contains(&"frequency_deviation"));
    assert!(open_types.contains(&"voltage_high"));
}

// ---- Full alert round ----

fn insert_connection(store: &SqliteStorageEngine, name: &str) -> Connection {
    let now = Utc::now();
    let connection = Connection {
        id: gridmon_common::id::next_id(),
        name: name.to_string(),
        connection_type: ConnectionType::Substation,
        nominal_voltage: 230.0,
        status: ConnectionStatus::Connected,
        created_at: now,
        updated_at: now,
    };
    store.insert_connection(&connection).unwrap();
    connection
}

#[test]
fn alert_round_fires_threshold_rule_on_latest_sample() {
    let (_dir, store) = setup_store();
    let connection = insert_connection(&store, "North Substation");
    let now = Utc::now();

    // Older in-range sample, then an overvoltage spike as the latest
    store
        .write_samples(&[
            make_sample(
                &connection.id,
                MetricType::Voltage,
                231.0,
                now - Duration::minutes(5),
            ),
            make_sample(
                &connection.id,
                MetricType::Voltage,
                260.0,
                now - Duration::minutes(1),
            ),
        ])
        .unwrap();

    let outcome = run_alert_round(
        &store,
        now,
        Duration::minutes(10),
        Duration::minutes(10),
        Duration::hours(24),
    )
    .unwrap();
    assert_eq!(outcome.alerts_generated, 1);

    let open = store.list_open_alerts(10, 0).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].alert_type, "voltage_high");
    assert_eq!(open[0].severity, Severity::High);
    assert!(open[0].message.contains("North Substation"));

    // A second round over the same samples produces no duplicate
    let outcome = run_alert_round(
        &store,
        now + Duration::minutes(1),
        Duration::minutes(10),
        Duration::minutes(10),
        Duration::hours(24),
    )
    .unwrap();
    assert_eq!(outcome.alerts_generated, 0);
    assert_eq!(store.count_open_alerts().unwrap(), 1);
}

#[test]
fn alert_round_detects_patterns_over_window() {
    let (_dir, store) = setup_store();
    let connection = insert_connection(&store, "West Feeder");
    let now = Utc::now();

    // Six oscillating voltage readings, all far outside [220, 240]
    let values = [300.0, 320.0, 295.0, 325.0, 290.0, 330.0];
    let samples: Vec<MetricSample> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            make_sample(
                &connection.id,
                MetricType::Voltage,
                *v,
                now - Duration::seconds(30 * i as i64),
            )
        })
        .collect();
    store.write_samples(&samples).unwrap();

    let outcome = run_alert_round(
        &store,
        now,
        Duration::minutes(10),
        Duration::minutes(10),
        Duration::hours(24),
    )
    .unwrap();

    let open = store.list_open_alerts(10, 0).unwrap();
    let open_types: Vec<&str> = open.iter().map(|a| a.alert_type.as_str()).collect();
    assert!(open_types.contains(&"voltage_oscillation"));
    assert!(open_types.contains(&"sustained_voltage_deviation"));
    // voltage_high also fires on the latest (300 V) sample
    assert!(open_types.contains(&"voltage_high"));
    assert_eq!(outcome.alerts_generated, open.len());
}

#[test]
fn alert_round_with_no_samples_only_sweeps() {
    let (_dir, store) = setup_store();
    let now = Utc::now();

    store
        .insert_alert(&Alert {
            id: gridmon_common::id::next_id(),
            connection_id: "conn-1".to_string(),
            alert_type: "power_factor_low".to_string(),
            severity: Severity::Low,
            message: "stale".to_string(),
            resolved: false,
            created_at: now - Duration::hours(30),
            resolved_at: None,
        })
        .unwrap();

    let outcome = run_alert_round(
        &store,
        now,
        Duration::minutes(10),
        Duration::minutes(10),
        Duration::hours(24),
    )
    .unwrap();
    assert_eq!(outcome.alerts_generated, 0);
    assert_eq!(outcome.alerts_resolved, 1);
}
