//! Issue wording
//!
//! Explanations are filled in after an issue has been scored and ordered,
//! so swapping the [`Explainer`] can change what the user reads but never
//! what gets ranked first.

use crate::analysis::types::{Issue, IssueKind, OwnerKind};

/// Human-readable text for one issue card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub title: String,
    pub explanation: String,
    pub start_here: Vec<String>,
}

/// Produces the text of an issue from its scored fields
pub trait Explainer: Send + Sync {
    fn explain(&self, issue: &Issue) -> Explanation;
}

/// Deterministic, template-based wording
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardExplainer;

const CHECK_INTEGRATIONS: &str =
    "Check whether the affected integration(s) show errors in Settings → Devices & services.";
const CHECK_COORDINATOR: &str =
    "If the affected devices are Zigbee/Z-Wave, verify the coordinator is online and not rebooting.";
const REVIEW_CHANGES: &str =
    "If this started after an update or restart, review what changed recently before rebooting repeatedly.";

impl Explainer for StandardExplainer {
    fn explain(&self, issue: &Issue) -> Explanation {
        match issue.kind {
            IssueKind::Unavailable => unavailable(issue),
            IssueKind::Stale => stale(issue),
            IssueKind::PendingUpdate => pending_update(issue),
        }
    }
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

fn unavailable(issue: &Issue) -> Explanation {
    let n = issue.affected_count;
    let mut start_here = Vec::new();

    let (title, explanation) = match &issue.owner {
        Some(owner) if owner.kind == OwnerKind::Device => {
            start_here.push(format!(
                "Check power and network connectivity for '{}' before looking at individual entities.",
                owner.name
            ));
            if issue.owner_fully_affected() {
                (
                    format!("{} is offline ({} unavailable)", owner.name, plural(n, "entity", "entities")),
                    format!(
                        "Every entity of device '{}' is unavailable. The device has most likely lost power or \
                         network, or its integration can no longer reach it.",
                        owner.name
                    ),
                )
            } else {
                let total = issue.owner_entity_count.unwrap_or(n);
                (
                    format!("{} of {} entities on {} unavailable", n, total, owner.name),
                    format!(
                        "Part of device '{}' is unavailable while the rest still reports. Look for a \
                         sub-component, channel or feature that stopped responding.",
                        owner.name
                    ),
                )
            }
        }
        Some(owner) => {
            start_here.push(format!(
                "Open the '{}' integration in Settings → Devices & services and look for errors or a \
                 required re-authentication.",
                owner.name
            ));
            (
                format!("{} from {} unavailable", plural(n, "entity", "entities"), owner.name),
                format!(
                    "All affected entities are provided by the '{}' integration, which points at an \
                     integration outage rather than individual devices.",
                    owner.name
                ),
            )
        }
        None => {
            let title = if n == 1 {
                format!("{} is unavailable", issue.entity_ids[0])
            } else {
                format!("{} {} entities unavailable", n, issue.domain)
            };
            let explanation = if issue.critical {
                "Core device domains (lights, climate, locks, media) are unavailable. This usually indicates \
                 an integration outage, coordinator issue, or network/device power problem."
                    .to_string()
            } else {
                format!(
                    "{} in the '{}' domain report no usable state. This usually indicates an integration \
                     outage, coordinator issue, or network/device power problem.",
                    plural(n, "entity", "entities"),
                    issue.domain
                )
            };
            (title, explanation)
        }
    };

    start_here.extend([CHECK_INTEGRATIONS, CHECK_COORDINATOR, REVIEW_CHANGES].map(str::to_string));

    Explanation {
        title,
        explanation,
        start_here,
    }
}

fn stale(issue: &Issue) -> Explanation {
    let since = issue.earliest_affected.format("%Y-%m-%d %H:%M UTC");
    let subject = match &issue.owner {
        Some(owner) => format!("{} on {}", plural(issue.affected_count, "entity", "entities"), owner.name),
        None => plural(
            issue.affected_count,
            &format!("{} entity", issue.domain),
            &format!("{} entities", issue.domain),
        ),
    };

    Explanation {
        title: format!("{} silent since {}", subject, since),
        explanation: "These entities are not marked unavailable but have not changed state within the \
                      freshness window. That often signals a silent failure such as a dead battery or a \
                      dropped mesh route."
            .to_string(),
        start_here: vec![
            "Check batteries and signal strength of the affected devices.".to_string(),
            "Compare the reported value with the device's own app or display.".to_string(),
            "If the value is legitimately constant, remove the domain from analysis.stale_domains.".to_string(),
        ],
    }
}

fn pending_update(issue: &Issue) -> Explanation {
    let title = if issue.affected_count == 1 {
        format!("Update available for {}", issue.entity_ids[0])
    } else {
        format!("{} available", plural(issue.affected_count, "update", "updates"))
    };

    Explanation {
        title,
        explanation: "The hub reports newer versions for these components. Updates are rarely urgent but \
                      often carry fixes for integration problems."
            .to_string(),
        start_here: vec![
            "Review the release notes in Settings → System → Updates.".to_string(),
            "Create a backup before installing.".to_string(),
            "Install one update at a time so a regression can be traced to its cause.".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::Owner;
    use chrono::Utc;

    fn issue(kind: IssueKind, ids: &[&str]) -> Issue {
        Issue {
            id: String::new(),
            kind,
            title: String::new(),
            domain: "light".to_string(),
            owner: None,
            owner_entity_count: None,
            entity_ids: ids.iter().map(|s| s.to_string()).collect(),
            affected_count: ids.len(),
            severity: 0,
            critical: false,
            earliest_affected: Utc::now(),
            explanation: String::new(),
            start_here: Vec::new(),
        }
    }

    #[test]
    fn test_domain_unavailable_wording() {
        let e = StandardExplainer.explain(&issue(IssueKind::Unavailable, &["light.a", "light.b", "light.c"]));
        assert_eq!(e.title, "3 light entities unavailable");
        assert_eq!(e.start_here.len(), 3);
        assert_eq!(e.start_here[0], CHECK_INTEGRATIONS);
    }

    #[test]
    fn test_single_entity_title_names_it() {
        let e = StandardExplainer.explain(&issue(IssueKind::Unavailable, &["light.porch"]));
        assert_eq!(e.title, "light.porch is unavailable");
    }

    #[test]
    fn test_offline_device_wording() {
        let mut i = issue(IssueKind::Unavailable, &["light.a", "sensor.a"]);
        i.owner = Some(Owner {
            kind: OwnerKind::Device,
            id: "d1".to_string(),
            name: "Porch sensor".to_string(),
        });
        i.owner_entity_count = Some(2);

        let e = StandardExplainer.explain(&i);
        assert!(e.title.starts_with("Porch sensor is offline"));
        assert!(e.start_here[0].contains("Porch sensor"));
        assert_eq!(e.start_here.len(), 4);
    }

    #[test]
    fn test_partial_device_wording() {
        let mut i = issue(IssueKind::Unavailable, &["light.a"]);
        i.owner = Some(Owner {
            kind: OwnerKind::Device,
            id: "d1".to_string(),
            name: "Strip".to_string(),
        });
        i.owner_entity_count = Some(4);

        let e = StandardExplainer.explain(&i);
        assert_eq!(e.title, "1 of 4 entities on Strip unavailable");
    }

    #[test]
    fn test_update_wording() {
        let e = StandardExplainer.explain(&issue(IssueKind::PendingUpdate, &["update.a", "update.b"]));
        assert_eq!(e.title, "2 updates available");
        let e = StandardExplainer.explain(&issue(IssueKind::PendingUpdate, &["update.core"]));
        assert_eq!(e.title, "Update available for update.core");
    }
}
