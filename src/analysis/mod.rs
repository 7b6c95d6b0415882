//! Health analysis engine
//!
//! Deterministic pipeline from one [`HubSnapshot`] to one [`Report`]:
//! classify → group → rank → assemble. No I/O, no shared state; the same
//! snapshot, configuration and clock always produce the same report.

pub mod classifier;
pub mod explain;
pub mod grouper;
pub mod ranker;
pub mod report;
pub mod types;

pub use explain::{Explainer, Explanation, StandardExplainer};
pub use report::{HealthStatus, Report, Summary};
pub use types::{EntitySnapshot, Issue, IssueKind, Owner, OwnerKind, PendingUpdate, Verdict};

use crate::config::AnalysisConfig;
use crate::errors::{DoctorError, Result};
use crate::hub::types::HubSnapshot;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Configured analysis pipeline
pub struct Analyzer {
    config: AnalysisConfig,
    explainer: Box<dyn Explainer>,
}

impl Analyzer {
    /// Create an analyzer with the standard wording.
    ///
    /// Fails with `ConfigError` if thresholds or weights are invalid.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Self::with_explainer(config, Box::new(StandardExplainer))
    }

    pub fn with_explainer(config: AnalysisConfig, explainer: Box<dyn Explainer>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, explainer })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze against the current time
    pub fn analyze(&self, snapshot: &HubSnapshot) -> Result<Report> {
        self.analyze_at(snapshot, Utc::now())
    }

    /// Analyze with an explicit clock, used for stale detection and as the
    /// report timestamp
    pub fn analyze_at(&self, snapshot: &HubSnapshot, now: DateTime<Utc>) -> Result<Report> {
        if snapshot.entities.is_empty() {
            warn!("hub returned an empty snapshot");
            return Err(DoctorError::EmptySnapshot);
        }

        let classification = classifier::classify(snapshot, &self.config, now);
        if classification.entities.is_empty() {
            warn!(
                unclassifiable = classification.unclassifiable.len(),
                "no classifiable entities in snapshot"
            );
            return Err(DoctorError::EmptySnapshot);
        }

        let ownership = grouper::OwnershipIndex::from_snapshot(snapshot);
        let grouping = grouper::group(&classification, &ownership);
        let issues = ranker::rank(&grouping, &self.config, self.explainer.as_ref());

        debug!(
            entities = classification.entities.len(),
            unclassifiable = classification.unclassifiable.len(),
            clusters = grouping.clusters.len(),
            issues = issues.len(),
            registry = !ownership.is_empty(),
            "analysis complete"
        );

        Ok(report::assemble(&classification, &grouping, issues, &self.config, now))
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer").field("config", &self.config).finish_non_exhaustive()
    }
}
