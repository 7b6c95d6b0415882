//! Analysis type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated entity from one poll. Immutable; rebuilt on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    pub entity_id: String,

    /// Prefix of the id before the first `.`
    pub domain: String,

    pub state: String,

    pub last_changed: DateTime<Utc>,

    /// False when the hub reports the entity as not present
    pub available: bool,

    /// Set for `update.*` entities that have a newer version available
    pub update: Option<PendingUpdate>,
}

/// An available update reported by the hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub entity_id: String,
    pub installed: Option<String>,
    pub latest: Option<String>,
}

/// Classifier verdict for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Normal,
    Unavailable,
    Stale,
    PendingUpdate,
}

impl Verdict {
    /// Issue kind for abnormal verdicts
    pub fn issue_kind(&self) -> Option<IssueKind> {
        match self {
            Verdict::Normal => None,
            Verdict::Unavailable => Some(IssueKind::Unavailable),
            Verdict::Stale => Some(IssueKind::Stale),
            Verdict::PendingUpdate => Some(IssueKind::PendingUpdate),
        }
    }

    pub fn is_abnormal(&self) -> bool {
        !matches!(self, Verdict::Normal)
    }
}

/// Kind of detected abnormality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Unavailable,
    Stale,
    PendingUpdate,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Unavailable => "unavailable",
            IssueKind::Stale => "stale",
            IssueKind::PendingUpdate => "pending_update",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity together with its verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntity {
    pub entity: EntitySnapshot,
    pub verdict: Verdict,
}

/// What owns an entity in the hub's registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Device,
    Integration,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Device => "device",
            OwnerKind::Integration => "integration",
        }
    }
}

/// Registry owner of a group of entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: String,
    pub name: String,
}

/// One detected, explainable health problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Stable id derived from kind and grouping key
    pub id: String,

    pub kind: IssueKind,

    /// One-line summary shown on the card
    pub title: String,

    /// Owning domain (dominant domain for owner-level issues)
    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,

    /// Entities of the owner present in the snapshot, abnormal or not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_entity_count: Option<usize>,

    /// Sorted affected entity ids
    pub entity_ids: Vec<String>,

    pub affected_count: usize,

    pub severity: u32,

    /// Touches at least one critical domain
    pub critical: bool,

    /// Oldest last-changed among affected entities
    pub earliest_affected: DateTime<Utc>,

    pub explanation: String,

    /// Ordered "start here" steps
    pub start_here: Vec<String>,
}

impl Issue {
    /// True when every entity the owner has in the snapshot is affected
    pub fn owner_fully_affected(&self) -> bool {
        self.owner_entity_count
            .is_some_and(|total| total > 0 && total == self.affected_count)
    }
}
