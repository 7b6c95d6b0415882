//! Property tests for report invariants
//!
//! Snapshots are generated from small vocabularies of domains, states and
//! timestamps so that clustering, ties and critical domains all occur often.

use chrono::{DateTime, Utc};
use homeops_doctor::{
    analysis::Analyzer,
    config::AnalysisConfig,
    hub::{DeviceInfo, HubSnapshot, Registry},
};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use serde_json::json;
use std::collections::BTreeSet;

const DOMAINS: &[&str] = &["light", "switch", "sensor", "binary_sensor", "camera", "lock", "update"];
const STATES: &[&str] = &["on", "off", "unavailable", "unknown", "21.5"];
const TIMES: &[&str] = &[
    "2024-04-01T00:00:00Z",
    "2024-05-01T06:00:00Z",
    "2024-05-02T09:30:00Z",
    "2024-05-02T11:59:59Z",
];

fn clock() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-02T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[derive(Debug, Clone)]
struct ArbSnapshot(HubSnapshot);

impl Arbitrary for ArbSnapshot {
    fn arbitrary(g: &mut Gen) -> Self {
        let count = 1 + usize::arbitrary(g) % 24;
        let mut ids = Vec::with_capacity(count);
        let mut states = Vec::with_capacity(count);

        for i in 0..count {
            let domain = *g.choose(DOMAINS).unwrap();
            let state = *g.choose(STATES).unwrap();
            let changed = *g.choose(TIMES).unwrap();
            let id = format!("{}.e{}", domain, i);
            states.push(json!({
                "entity_id": id,
                "state": state,
                "attributes": {},
                "last_changed": changed,
            }));
            ids.push(id);
        }

        // Assign a random subset of entities to up to three devices
        let mut devices: Vec<DeviceInfo> = (0..3)
            .map(|d| DeviceInfo {
                id: format!("dev{}", d),
                name: format!("Device {}", d),
                entities: BTreeSet::new(),
            })
            .collect();
        for id in &ids {
            let slot = usize::arbitrary(g) % 5;
            if let Some(device) = devices.get_mut(slot) {
                device.entities.insert(id.clone());
            }
        }

        let snapshot = HubSnapshot::from_states(states);
        if bool::arbitrary(g) {
            ArbSnapshot(snapshot.with_registry(Registry {
                devices: Some(devices),
                integrations: None,
            }))
        } else {
            ArbSnapshot(snapshot)
        }
    }
}

fn analyzer() -> Analyzer {
    Analyzer::new(AnalysisConfig::default()).unwrap()
}

#[quickcheck]
fn prop_headline_present_iff_issues(snap: ArbSnapshot) -> bool {
    let report = analyzer().analyze_at(&snap.0, clock()).unwrap();
    match &report.headline {
        Some(headline) => Some(headline) == report.issues.first(),
        None => report.issues.is_empty(),
    }
}

#[quickcheck]
fn prop_headline_has_max_severity(snap: ArbSnapshot) -> bool {
    let report = analyzer().analyze_at(&snap.0, clock()).unwrap();
    let max = report.issues.iter().map(|i| i.severity).max();
    report.headline.map(|h| h.severity) == max
}

#[quickcheck]
fn prop_domain_counts_sum_to_total(snap: ArbSnapshot) -> bool {
    let report = analyzer().analyze_at(&snap.0, clock()).unwrap();
    let sum: usize = report.summary.unavailable_by_domain.values().sum();
    sum == report.summary.unavailable_count
}

#[quickcheck]
fn prop_every_abnormal_entity_in_exactly_one_issue(snap: ArbSnapshot) -> bool {
    let report = analyzer().analyze_at(&snap.0, clock()).unwrap();

    let mut seen = BTreeSet::new();
    for issue in &report.issues {
        if issue.entity_ids.len() != issue.affected_count {
            return false;
        }
        for id in &issue.entity_ids {
            if !seen.insert(id.clone()) {
                return false;
            }
        }
    }

    let abnormal = report.summary.unavailable_count
        + report.summary.pending_update_count
        + report.summary.stale_count;
    seen.len() == abnormal
}

#[quickcheck]
fn prop_issues_sorted(snap: ArbSnapshot) -> bool {
    let report = analyzer().analyze_at(&snap.0, clock()).unwrap();
    report.issues.windows(2).all(|w| {
        let (a, b) = (&w[0], &w[1]);
        (b.severity, a.earliest_affected, &a.id) <= (a.severity, b.earliest_affected, &b.id)
    })
}

#[quickcheck]
fn prop_output_is_deterministic(snap: ArbSnapshot) -> bool {
    let first = analyzer().analyze_at(&snap.0, clock()).unwrap();
    let second = analyzer().analyze_at(&snap.0.clone(), clock()).unwrap();
    first.to_json().unwrap() == second.to_json().unwrap() && first.to_markdown() == second.to_markdown()
}

#[quickcheck]
fn prop_registry_does_not_change_domain_counts(snap: ArbSnapshot) -> bool {
    let with = analyzer().analyze_at(&snap.0, clock()).unwrap();
    let without = analyzer().analyze_at(&snap.0.without_registry(), clock()).unwrap();

    with.summary == without.summary && with.status == without.status
}
