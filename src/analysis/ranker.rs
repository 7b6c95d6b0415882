//! Impact ranking
//!
//! Turns clusters into scored [`Issue`]s. One issue per owner cluster
//! (causal grouping) and one per unowned domain group.
//!
//! Score: `(base(kind) + per_entity * min(n - 1, breadth_cap))`, multiplied
//! by `critical_multiplier` when any affected entity is in a critical domain.
//! Order: severity descending, then oldest affected first, then issue id.

use crate::analysis::explain::Explainer;
use crate::analysis::grouper::{Cluster, GroupKey, Grouping};
use crate::analysis::types::{Issue, IssueKind};
use crate::config::{AnalysisConfig, SeverityWeights};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Score one group of affected entities
pub fn severity(kind: IssueKind, affected: usize, critical: bool, weights: &SeverityWeights) -> u32 {
    let base = match kind {
        IssueKind::Unavailable => weights.unavailable,
        IssueKind::Stale => weights.stale,
        IssueKind::PendingUpdate => weights.pending_update,
    };

    let extra = u32::try_from(affected.saturating_sub(1))
        .unwrap_or(u32::MAX)
        .min(weights.breadth_cap);
    let score = base.saturating_add(weights.per_entity.saturating_mul(extra));

    if critical {
        score.saturating_mul(weights.critical_multiplier)
    } else {
        score
    }
}

/// Total order used for the issue list
pub fn compare(a: &Issue, b: &Issue) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| a.earliest_affected.cmp(&b.earliest_affected))
        .then_with(|| a.id.cmp(&b.id))
}

/// Score, explain and order every cluster
pub fn rank(grouping: &Grouping<'_>, config: &AnalysisConfig, explainer: &dyn Explainer) -> Vec<Issue> {
    let mut issues: Vec<Issue> = grouping
        .clusters
        .iter()
        .filter_map(|cluster| build_issue(cluster, config))
        .collect();

    issues.sort_by(compare);

    for issue in &mut issues {
        let text = explainer.explain(issue);
        issue.title = text.title;
        issue.explanation = text.explanation;
        issue.start_here = text.start_here;
    }

    issues
}

fn build_issue(cluster: &Cluster<'_>, config: &AnalysisConfig) -> Option<Issue> {
    let earliest_affected = cluster.members.iter().map(|m| m.entity.last_changed).min()?;

    let entity_ids: Vec<String> = cluster
        .members
        .iter()
        .map(|m| m.entity.entity_id.clone())
        .collect();
    let affected_count = entity_ids.len();

    let critical = cluster
        .members
        .iter()
        .any(|m| config.is_critical(&m.entity.domain));

    let (id, domain, owner) = match &cluster.key {
        GroupKey::Owner(owner) => (
            format!("{}:{}:{}", cluster.kind, owner.kind.as_str(), owner.id),
            dominant_domain(cluster),
            Some(owner.clone()),
        ),
        GroupKey::Domain(domain) => (format!("{}:domain:{}", cluster.kind, domain), domain.clone(), None),
    };

    Some(Issue {
        id,
        kind: cluster.kind,
        title: String::new(),
        domain,
        owner,
        owner_entity_count: cluster.owner_entity_count,
        entity_ids,
        affected_count,
        severity: severity(cluster.kind, affected_count, critical, &config.weights),
        critical,
        earliest_affected,
        explanation: String::new(),
        start_here: Vec::new(),
    })
}

/// Most frequent domain among the members, ties by name
fn dominant_domain(cluster: &Cluster<'_>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for member in &cluster.members {
        *counts.entry(member.entity.domain.as_str()).or_default() += 1;
    }

    // max_by_key keeps the last maximum; iterate in reverse so the smallest name wins ties
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(domain, _)| domain.to_string())
        .unwrap_or_default()
}
