//! Doctor: one diagnostic pass
//!
//! Fetches a snapshot from a [`SnapshotSource`] under a timeout, runs the
//! analyzer on it and renders the result for the terminal. The hub overview
//! only depends on the fetch, so it survives a failed analysis.

use crate::analysis::{Analyzer, HealthStatus, IssueKind, Report};
use crate::errors::{DoctorError, Result};
use crate::hub::{HubSnapshot, SnapshotSource};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Domains listed in the hub overview
const TOP_DOMAINS: usize = 12;

/// What the hub reported about itself, independent of analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubOverview {
    pub ha_version: Option<String>,
    pub location_name: Option<String>,
    pub time_zone: Option<String>,
    pub unit_system: Option<Value>,
    /// Raw entries returned by the hub, including unclassifiable ones
    pub entity_count: usize,
    pub domain_counts: Vec<(String, usize)>,
}

impl HubOverview {
    pub fn from_snapshot(snapshot: &HubSnapshot) -> Self {
        let hub = snapshot.hub.clone().unwrap_or_default();
        Self {
            ha_version: hub.version,
            location_name: hub.location_name,
            time_zone: hub.time_zone,
            unit_system: hub.unit_system,
            entity_count: snapshot.entities.len(),
            domain_counts: snapshot.domain_counts(TOP_DOMAINS),
        }
    }
}

/// Result of one successful pass
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    #[serde(flatten)]
    pub overview: HubOverview,
    pub report: Report,
}

/// A pass whose fetch succeeded; the analysis may still have failed
#[derive(Debug)]
pub struct Checkup {
    pub overview: HubOverview,
    pub report: Result<Report>,
}

impl Checkup {
    pub fn into_diagnosis(self) -> Result<Diagnosis> {
        Ok(Diagnosis {
            overview: self.overview,
            report: self.report?,
        })
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    source: Arc<dyn SnapshotSource>,
    analyzer: Analyzer,
    timeout: Duration,
}

impl Doctor {
    /// Create a new doctor instance
    pub fn new(source: Arc<dyn SnapshotSource>, analyzer: Analyzer, timeout: Duration) -> Self {
        Self {
            source,
            analyzer,
            timeout,
        }
    }

    /// Fetch a snapshot, bounded by the timeout
    pub async fn fetch(&self) -> Result<HubSnapshot> {
        debug!(source = %self.source.describe(), "fetching snapshot");

        match tokio::time::timeout(self.timeout, self.source.fetch_snapshot()).await {
            Ok(result) => result,
            Err(_) => Err(DoctorError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Fetch and analyze, keeping the overview when only the analysis fails.
    ///
    /// Errors only when the fetch itself fails.
    pub async fn examine(&self) -> Result<Checkup> {
        let snapshot = self.fetch().await?;
        let checkup = self.checkup(&snapshot);

        match &checkup.report {
            Ok(report) => info!(
                status = report.status.as_str(),
                issues = report.issues.len(),
                unavailable = report.summary.unavailable_count,
                "diagnosis complete"
            ),
            Err(e) => debug!(entities = checkup.overview.entity_count, error = %e, "analysis failed"),
        }

        Ok(checkup)
    }

    /// Fetch and analyze
    pub async fn run(&self) -> Result<Diagnosis> {
        self.examine().await?.into_diagnosis()
    }

    /// Analyze a snapshot that is already in hand
    pub fn diagnose(&self, snapshot: &HubSnapshot) -> Result<Diagnosis> {
        self.checkup(snapshot).into_diagnosis()
    }

    fn checkup(&self, snapshot: &HubSnapshot) -> Checkup {
        Checkup {
            overview: HubOverview::from_snapshot(snapshot),
            report: self.analyzer.analyze(snapshot),
        }
    }

    /// Display a report in the terminal
    pub fn display_report(report: &Report) {
        println!("\n🔍 HomeOps Doctor\n");

        let status = match report.status {
            HealthStatus::Healthy => "✅ HEALTHY".green(),
            HealthStatus::Warning => "⚠️  WARNING".yellow(),
            HealthStatus::Critical => "❌ CRITICAL".red(),
        };
        println!("Status: {}", status.bold());
        println!();

        match &report.headline {
            None => {
                println!("{}", "No issues detected. All analyzed entities appear to be operating normally.".green());
            }
            Some(headline) => {
                println!("{}", headline.title.bold());
                println!("{}", headline.explanation);
                println!();
                println!("{}", "Start here:".bold());
                for (i, step) in headline.start_here.iter().enumerate() {
                    println!("  {}. {}", i + 1, step);
                }
            }
        }

        if report.issues.len() > 1 {
            println!();
            println!("{:<10} {:<6} {}", "Severity", "Count", "Issue");
            println!("{}", "=".repeat(60));
            for issue in &report.issues {
                let title = match issue.kind {
                    IssueKind::Unavailable => issue.title.red(),
                    IssueKind::Stale => issue.title.yellow(),
                    IssueKind::PendingUpdate => issue.title.cyan(),
                };
                println!("{:<10} {:<6} {}", issue.severity, issue.affected_count, title);
            }
        }

        let s = &report.summary;
        println!();
        println!(
            "{} entities · {} unavailable ({} critical) · {} updates pending",
            s.entity_count, s.unavailable_count, s.critical_unavailable_count, s.pending_update_count
        );
        if s.unclassifiable_count > 0 {
            println!("{}", format!("{} unclassifiable entries skipped", s.unclassifiable_count).dimmed());
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::hub::{HubInfo, StaticSource};
    use async_trait::async_trait;
    use serde_json::json;

    struct SlowSource;

    #[async_trait]
    impl SnapshotSource for SlowSource {
        async fn fetch_snapshot(&self) -> Result<HubSnapshot> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(HubSnapshot::default())
        }

        fn describe(&self) -> String {
            "slow".to_string()
        }
    }

    fn doctor(source: Arc<dyn SnapshotSource>) -> Doctor {
        Doctor::new(
            source,
            Analyzer::new(AnalysisConfig::default()).unwrap(),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_run_produces_diagnosis() {
        let snapshot = HubSnapshot::from_states(vec![
            json!({"entity_id": "light.a", "state": "unavailable", "last_changed": "2024-05-01T00:00:00Z"}),
            json!({"entity_id": "light.b", "state": "on", "last_changed": "2024-05-01T00:00:00Z"}),
            json!({"bogus": true}),
        ])
        .with_hub_info(HubInfo {
            version: Some("2024.5.0".to_string()),
            location_name: Some("Home".to_string()),
            time_zone: Some("Europe/Oslo".to_string()),
            unit_system: Some(json!({"temperature": "°C"})),
        });

        let d = doctor(Arc::new(StaticSource::new(snapshot))).run().await.unwrap();
        assert_eq!(d.overview.ha_version.as_deref(), Some("2024.5.0"));
        assert_eq!(d.overview.unit_system, Some(json!({"temperature": "°C"})));
        assert_eq!(d.overview.entity_count, 3);
        assert_eq!(d.overview.domain_counts, vec![("light".to_string(), 2)]);
        assert_eq!(d.report.summary.unavailable_count, 1);
        assert_eq!(d.report.summary.unclassifiable_count, 1);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let result = doctor(Arc::new(SlowSource)).run().await;
        assert!(matches!(result, Err(DoctorError::Timeout { duration_ms: 50 })));
    }

    #[tokio::test]
    async fn test_empty_snapshot_propagates() {
        let result = doctor(Arc::new(StaticSource::new(HubSnapshot::default()))).run().await;
        assert!(matches!(result, Err(DoctorError::EmptySnapshot)));
    }

    #[tokio::test]
    async fn test_examine_keeps_overview_when_analysis_fails() {
        let snapshot = HubSnapshot::default().with_hub_info(HubInfo {
            version: Some("2024.5.0".to_string()),
            ..Default::default()
        });

        let checkup = doctor(Arc::new(StaticSource::new(snapshot))).examine().await.unwrap();
        assert_eq!(checkup.overview.ha_version.as_deref(), Some("2024.5.0"));
        assert_eq!(checkup.overview.entity_count, 0);
        assert!(checkup.overview.domain_counts.is_empty());
        assert!(matches!(checkup.report, Err(DoctorError::EmptySnapshot)));
    }

    #[tokio::test]
    async fn test_examine_fails_when_fetch_fails() {
        let result = doctor(Arc::new(SlowSource)).examine().await;
        assert!(matches!(result, Err(DoctorError::Timeout { .. })));
    }
}
