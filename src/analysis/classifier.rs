//! Entity classification
//!
//! Labels every entity of a snapshot as normal, unavailable, stale or
//! pending-update. Pure function of the snapshot, the configuration and the
//! analysis clock. Entries that cannot be validated are set aside as
//! [`UnclassifiableEntity`] and counted; they never abort the report.

use crate::analysis::types::{ClassifiedEntity, EntitySnapshot, PendingUpdate, Verdict};
use crate::config::AnalysisConfig;
use crate::errors::UnclassifiableEntity;
use crate::hub::types::{HubSnapshot, RawEntityState};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

/// Classifier output for one snapshot
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Valid entities sorted by id
    pub entities: Vec<ClassifiedEntity>,
    pub unclassifiable: Vec<UnclassifiableEntity>,
}

impl Classification {
    pub fn abnormal(&self) -> impl Iterator<Item = &ClassifiedEntity> {
        self.entities.iter().filter(|e| e.verdict.is_abnormal())
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.entities.iter().filter(|e| e.verdict == verdict).count()
    }

    pub fn with_verdict(&self, verdict: Verdict) -> impl Iterator<Item = &ClassifiedEntity> {
        self.entities.iter().filter(move |e| e.verdict == verdict)
    }
}

/// Classify every entity of the snapshot
pub fn classify(snapshot: &HubSnapshot, config: &AnalysisConfig, now: DateTime<Utc>) -> Classification {
    let mut classification = Classification::default();
    let mut seen = BTreeSet::new();

    for raw in &snapshot.entities {
        match validate(raw) {
            Ok(entity) => {
                if !seen.insert(entity.entity_id.clone()) {
                    classification.unclassifiable.push(UnclassifiableEntity::new(
                        Some(&entity.entity_id),
                        "duplicate entity_id in snapshot",
                    ));
                    continue;
                }
                let verdict = verdict(&entity, config, now);
                classification.entities.push(ClassifiedEntity { entity, verdict });
            }
            Err(unclassifiable) => {
                debug!(%unclassifiable, "skipping unclassifiable entity");
                classification.unclassifiable.push(unclassifiable);
            }
        }
    }

    classification
        .entities
        .sort_by(|a, b| a.entity.entity_id.cmp(&b.entity.entity_id));

    classification
}

/// Turn a raw hub entry into a validated entity
pub fn validate(raw: &RawEntityState) -> Result<EntitySnapshot, UnclassifiableEntity> {
    if let Some(err) = &raw.decode_error {
        return Err(UnclassifiableEntity::new(None, format!("malformed entry: {}", err)));
    }

    let entity_id = match raw.entity_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => return Err(UnclassifiableEntity::new(None, "missing entity_id")),
    };

    let domain = match entity_id.split_once('.') {
        Some((domain, object_id)) if !domain.is_empty() && !object_id.is_empty() => domain,
        _ => {
            return Err(UnclassifiableEntity::new(
                Some(entity_id),
                "entity_id is not of the form <domain>.<object_id>",
            ))
        }
    };

    let state = raw
        .state
        .as_deref()
        .ok_or_else(|| UnclassifiableEntity::new(Some(entity_id), "missing state"))?;

    let last_changed = raw
        .last_changed
        .as_deref()
        .ok_or_else(|| UnclassifiableEntity::new(Some(entity_id), "missing last_changed"))?;

    let last_changed = DateTime::parse_from_rfc3339(last_changed)
        .map_err(|e| UnclassifiableEntity::new(Some(entity_id), format!("invalid last_changed: {}", e)))?
        .with_timezone(&Utc);

    let update = if domain == "update" {
        pending_update(entity_id, state, raw)
    } else {
        None
    };

    Ok(EntitySnapshot {
        entity_id: entity_id.to_string(),
        domain: domain.to_string(),
        state: state.to_string(),
        last_changed,
        available: raw.available.unwrap_or(true),
        update,
    })
}

/// An `update.*` entity has a pending update when it is `on`, or when the
/// latest and installed versions are both known and differ.
fn pending_update(entity_id: &str, state: &str, raw: &RawEntityState) -> Option<PendingUpdate> {
    let installed = raw.attribute_str("installed_version").map(str::to_string);
    let latest = raw.attribute_str("latest_version").map(str::to_string);

    let versions_differ = matches!((&installed, &latest), (Some(i), Some(l)) if i != l);

    if state == "on" || versions_differ {
        Some(PendingUpdate {
            entity_id: entity_id.to_string(),
            installed,
            latest,
        })
    } else {
        None
    }
}

/// Verdict precedence: unavailable > pending-update > stale > normal
fn verdict(entity: &EntitySnapshot, config: &AnalysisConfig, now: DateTime<Utc>) -> Verdict {
    if !entity.available || config.unavailable_states.iter().any(|s| s == &entity.state) {
        return Verdict::Unavailable;
    }

    if entity.update.is_some() {
        return Verdict::PendingUpdate;
    }

    if let Some(window) = config.stale_after_secs {
        let window = i64::try_from(window).unwrap_or(i64::MAX);
        let age = (now - entity.last_changed).num_seconds();
        if config.stale_domains.contains(&entity.domain) && age > window {
            return Verdict::Stale;
        }
    }

    Verdict::Normal
}
