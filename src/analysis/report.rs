//! Report assembly and projections
//!
//! A [`Report`] is built once per analysis and never mutated. JSON and
//! Markdown are both projections of the same value.

use crate::analysis::classifier::Classification;
use crate::analysis::grouper::{DomainCount, Grouping};
use crate::analysis::types::{Issue, PendingUpdate, Verdict};
use crate::config::AnalysisConfig;
use crate::errors::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Overall system status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Confirmed: analyzed and nothing abnormal
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

/// Exact aggregates over the analyzed snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Entities that passed validation
    pub entity_count: usize,
    pub unavailable_count: usize,
    pub unavailable_by_domain: BTreeMap<String, usize>,
    pub critical_unavailable_count: usize,
    pub pending_update_count: usize,
    pub pending_updates: Vec<PendingUpdate>,
    pub stale_count: usize,
    pub unclassifiable_count: usize,
    /// Domains with abnormal entities, busiest first
    pub domains: Vec<DomainCount>,
}

/// The health report for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub status: HealthStatus,
    /// Highest-severity issue; `None` iff `issues` is empty
    pub headline: Option<Issue>,
    pub issues: Vec<Issue>,
    pub summary: Summary,
    pub generated_at: DateTime<Utc>,
}

/// Build the report from the pipeline stages.
///
/// `issues` must already be ranked.
pub fn assemble(
    classification: &Classification,
    grouping: &Grouping<'_>,
    issues: Vec<Issue>,
    config: &AnalysisConfig,
    generated_at: DateTime<Utc>,
) -> Report {
    let mut unavailable_by_domain = BTreeMap::new();
    let mut critical_unavailable_count = 0;
    for classified in classification.with_verdict(Verdict::Unavailable) {
        *unavailable_by_domain
            .entry(classified.entity.domain.clone())
            .or_insert(0) += 1;
        if config.is_critical(&classified.entity.domain) {
            critical_unavailable_count += 1;
        }
    }

    let pending_updates: Vec<PendingUpdate> = classification
        .with_verdict(Verdict::PendingUpdate)
        .filter_map(|c| c.entity.update.clone())
        .collect();

    let summary = Summary {
        entity_count: classification.entities.len(),
        unavailable_count: classification.count(Verdict::Unavailable),
        unavailable_by_domain,
        critical_unavailable_count,
        pending_update_count: pending_updates.len(),
        pending_updates,
        stale_count: classification.count(Verdict::Stale),
        unclassifiable_count: classification.unclassifiable.len(),
        domains: grouping.domains.clone(),
    };

    let status = if issues.is_empty() {
        HealthStatus::Healthy
    } else if summary.critical_unavailable_count >= config.critical_threshold {
        HealthStatus::Critical
    } else {
        HealthStatus::Warning
    };

    Report {
        status,
        headline: issues.first().cloned(),
        issues,
        summary,
        generated_at,
    }
}

impl Report {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Pretty JSON, stable field order
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Condensed Markdown for pasting into a forum post or issue
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let stamp = self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);

        let _ = writeln!(md, "## HomeOps Doctor report");
        let _ = writeln!(md);
        let _ = writeln!(md, "**Status:** {} · generated {}", self.status.as_str(), stamp);
        let _ = writeln!(md);

        match &self.headline {
            None => {
                let _ = writeln!(md, "No issues detected. All analyzed entities appear to be operating normally.");
            }
            Some(headline) => {
                let _ = writeln!(md, "### {}", headline.title);
                let _ = writeln!(md);
                let _ = writeln!(md, "{}", headline.explanation);
                let _ = writeln!(md);
                let _ = writeln!(md, "**Start here:**");
                for (i, step) in headline.start_here.iter().enumerate() {
                    let _ = writeln!(md, "{}. {}", i + 1, step);
                }
            }
        }
        let _ = writeln!(md);

        let s = &self.summary;
        let _ = writeln!(md, "### Summary");
        let _ = writeln!(md);
        let _ = writeln!(md, "- Entities analyzed: {}", s.entity_count);
        let _ = writeln!(
            md,
            "- Unavailable: {} ({} in critical domains)",
            s.unavailable_count, s.critical_unavailable_count
        );
        let mut by_unavailable: Vec<&DomainCount> = s.domains.iter().filter(|d| d.unavailable > 0).collect();
        if !by_unavailable.is_empty() {
            by_unavailable.sort_by(|a, b| b.unavailable.cmp(&a.unavailable).then_with(|| a.domain.cmp(&b.domain)));
            let top: Vec<String> = by_unavailable
                .iter()
                .map(|d| format!("{} ({})", d.domain, d.unavailable))
                .collect();
            let _ = writeln!(md, "- Most affected domains: {}", top.join(", "));
        }
        let _ = writeln!(md, "- Pending updates: {}", s.pending_update_count);
        if s.stale_count > 0 {
            let _ = writeln!(md, "- Stale: {}", s.stale_count);
        }
        if s.unclassifiable_count > 0 {
            let _ = writeln!(md, "- Unclassifiable entries skipped: {}", s.unclassifiable_count);
        }

        if self.issues.len() > 1 {
            let _ = writeln!(md);
            let _ = writeln!(md, "### All issues");
            let _ = writeln!(md);
            let _ = writeln!(md, "| Severity | Issue | Entities |");
            let _ = writeln!(md, "|---:|---|---:|");
            for issue in &self.issues {
                // Owner names come from the registry and may contain pipes
                let title = issue.title.replace('|', "\\|");
                let _ = writeln!(md, "| {} | {} | {} |", issue.severity, title, issue.affected_count);
            }
        }

        md
    }
}
