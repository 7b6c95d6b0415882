//! End-to-end analysis scenarios
//!
//! Runs the full classify → group → rank → assemble pipeline on small,
//! hand-written snapshots.

use chrono::{DateTime, Utc};
use homeops_doctor::{
    analysis::{Analyzer, HealthStatus, IssueKind, OwnerKind},
    config::AnalysisConfig,
    hub::{DeviceInfo, HubSnapshot, IntegrationInfo, Registry},
    DoctorError,
};
use serde_json::{json, Value};

fn clock() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-02T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn entity(id: &str, state: &str, changed: &str) -> Value {
    json!({
        "entity_id": id,
        "state": state,
        "attributes": {},
        "last_changed": changed,
        "last_updated": changed
    })
}

fn analyzer() -> Analyzer {
    Analyzer::new(AnalysisConfig::default()).unwrap()
}

#[test]
fn test_all_healthy() {
    let snap = HubSnapshot::from_states(vec![
        entity("light.kitchen", "on", "2024-05-02T08:00:00Z"),
        entity("sensor.temp", "21.4", "2024-05-02T11:59:00Z"),
        entity("lock.front", "locked", "2024-05-01T22:00:00Z"),
    ]);

    let report = analyzer().analyze_at(&snap, clock()).unwrap();

    assert_eq!(report.status, HealthStatus::Healthy);
    assert!(report.headline.is_none());
    assert!(report.issues.is_empty());
    assert_eq!(report.summary.unavailable_count, 0);
    assert_eq!(report.summary.entity_count, 3);
}

#[test]
fn test_three_unavailable_lights_without_registry() {
    let snap = HubSnapshot::from_states(vec![
        entity("light.a", "unavailable", "2024-05-02T09:00:00Z"),
        entity("light.b", "unavailable", "2024-05-02T09:00:01Z"),
        entity("light.c", "unavailable", "2024-05-02T09:00:02Z"),
        entity("switch.ok", "on", "2024-05-02T09:00:00Z"),
    ]);

    let report = analyzer().analyze_at(&snap, clock()).unwrap();

    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert_eq!(issue.domain, "light");
    assert_eq!(issue.kind, IssueKind::Unavailable);
    assert_eq!(issue.affected_count, 3);
    assert!(issue.owner.is_none());
    assert_eq!(report.headline.as_ref(), Some(issue));
    assert_eq!(report.summary.unavailable_by_domain.get("light"), Some(&3));
}

#[test]
fn test_five_unavailable_entities_on_one_device() {
    let ids = [
        "light.garage",
        "switch.garage_door",
        "sensor.garage_temp",
        "sensor.garage_humidity",
        "binary_sensor.garage_motion",
    ];
    let snap = HubSnapshot::from_states(
        ids.iter()
            .map(|id| entity(id, "unavailable", "2024-05-02T07:30:00Z"))
            .collect(),
    )
    .with_registry(Registry {
        devices: Some(vec![DeviceInfo {
            id: "9f2c".to_string(),
            name: "Garage hub".to_string(),
            entities: ids.iter().map(|s| s.to_string()).collect(),
        }]),
        integrations: None,
    });

    let report = analyzer().analyze_at(&snap, clock()).unwrap();

    assert_eq!(report.issues.len(), 1, "one device-level issue, not five");
    let issue = &report.issues[0];
    assert_eq!(issue.owner.as_ref().unwrap().kind, OwnerKind::Device);
    assert_eq!(issue.affected_count, 5);
    assert!(issue.title.contains("Garage hub is offline"));
    // Domain counts are unaffected by clustering
    assert_eq!(report.summary.unavailable_count, 5);
    assert_eq!(report.summary.unavailable_by_domain.get("sensor"), Some(&2));
}

#[test]
fn test_empty_snapshot_is_distinct_condition() {
    let result = analyzer().analyze_at(&HubSnapshot::default(), clock());
    assert!(matches!(result, Err(DoctorError::EmptySnapshot)));
}

#[test]
fn test_equal_severity_earlier_timestamp_first() {
    let mut config = AnalysisConfig::default();
    config.critical_domains.clear();
    let analyzer = Analyzer::new(config).unwrap();

    let snap = HubSnapshot::from_states(vec![
        entity("sensor.late", "unavailable", "2024-05-02T11:00:00Z"),
        entity("camera.early", "unavailable", "2024-05-01T03:00:00Z"),
    ]);

    let report = analyzer.analyze_at(&snap, clock()).unwrap();

    assert_eq!(report.issues.len(), 2);
    assert_eq!(report.issues[0].severity, report.issues[1].severity);
    assert_eq!(report.issues[0].domain, "camera");
    assert_eq!(report.headline.as_ref().unwrap().domain, "camera");
}

#[test]
fn test_integration_outage_groups_across_devices() {
    let snap = HubSnapshot::from_states(vec![
        entity("light.hue_1", "unavailable", "2024-05-02T10:00:00Z"),
        entity("light.hue_2", "unavailable", "2024-05-02T10:00:00Z"),
        entity("sensor.hue_motion", "unavailable", "2024-05-02T10:00:00Z"),
        entity("light.ikea", "unavailable", "2024-05-02T10:00:00Z"),
    ])
    .with_registry(Registry {
        devices: None,
        integrations: Some(vec![IntegrationInfo {
            id: "entry-hue".to_string(),
            name: "Philips Hue".to_string(),
            entities: ["light.hue_1", "light.hue_2", "sensor.hue_motion"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }]),
    });

    let report = analyzer().analyze_at(&snap, clock()).unwrap();

    assert_eq!(report.issues.len(), 2);
    let headline = report.headline.as_ref().unwrap();
    assert_eq!(headline.id, "unavailable:integration:entry-hue");
    assert_eq!(headline.affected_count, 3);
    assert!(headline.start_here[0].contains("Philips Hue"));
    assert_eq!(report.issues[1].id, "unavailable:domain:light");
}

#[test]
fn test_unclassifiable_entries_do_not_abort() {
    let snap = HubSnapshot::from_states(vec![
        entity("light.a", "unavailable", "2024-05-02T10:00:00Z"),
        json!({"entity_id": "light.b"}),
        json!("garbage"),
    ]);

    let report = analyzer().analyze_at(&snap, clock()).unwrap();
    assert_eq!(report.summary.unclassifiable_count, 2);
    assert_eq!(report.summary.entity_count, 1);
    assert_eq!(report.issues.len(), 1);
}

#[test]
fn test_update_ranks_below_outage() {
    let snap = HubSnapshot::from_states(vec![
        json!({
            "entity_id": "update.home_assistant_core_update",
            "state": "on",
            "attributes": {"installed_version": "2024.4.4", "latest_version": "2024.5.0"},
            "last_changed": "2024-04-20T00:00:00Z"
        }),
        entity("sensor.outdoor", "unavailable", "2024-05-02T10:00:00Z"),
    ]);

    let report = analyzer().analyze_at(&snap, clock()).unwrap();

    assert_eq!(report.issues[0].kind, IssueKind::Unavailable);
    assert_eq!(report.issues[1].kind, IssueKind::PendingUpdate);
    assert_eq!(report.summary.pending_update_count, 1);
    assert_eq!(
        report.summary.pending_updates[0].installed.as_deref(),
        Some("2024.4.4")
    );
}

#[test]
fn test_stale_detection_opt_in() {
    let mut config = AnalysisConfig::default();
    config.stale_after_secs = Some(6 * 3600);
    let analyzer = Analyzer::new(config).unwrap();

    let snap = HubSnapshot::from_states(vec![
        entity("sensor.freezer_temp", "-18", "2024-04-28T00:00:00Z"),
        entity("sensor.living_temp", "21", "2024-05-02T11:50:00Z"),
    ]);

    let report = analyzer.analyze_at(&snap, clock()).unwrap();
    assert_eq!(report.summary.stale_count, 1);
    assert_eq!(report.issues[0].kind, IssueKind::Stale);
    assert_eq!(report.issues[0].entity_ids, vec!["sensor.freezer_temp".to_string()]);
    assert!(report.issues[0].title.contains("2024-04-28"));
}

#[test]
fn test_json_and_markdown_are_projections_of_same_report() {
    let snap = HubSnapshot::from_states(vec![
        entity("climate.upstairs", "unavailable", "2024-05-02T10:00:00Z"),
    ]);
    let report = analyzer().analyze_at(&snap, clock()).unwrap();

    let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    let md = report.to_markdown();

    let title = json["headline"]["title"].as_str().unwrap();
    assert!(md.contains(title));
    assert_eq!(json["generated_at"], "2024-05-02T12:00:00Z");
}

#[test]
fn test_repeated_registry_id_yields_one_issue() {
    let device = |name: &str, entity: &str| DeviceInfo {
        id: "d1".to_string(),
        name: name.to_string(),
        entities: [entity.to_string()].into_iter().collect(),
    };
    let snap = HubSnapshot::from_states(vec![
        entity("light.a", "unavailable", "2024-05-02T10:00:00Z"),
        entity("light.b", "unavailable", "2024-05-02T10:00:00Z"),
    ])
    .with_registry(Registry {
        devices: Some(vec![device("A", "light.a"), device("B", "light.b")]),
        integrations: None,
    });

    let report = analyzer().analyze_at(&snap, clock()).unwrap();

    let ids: Vec<&str> = report.issues.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["unavailable:device:d1"]);
    assert_eq!(report.issues[0].affected_count, 2);
}
