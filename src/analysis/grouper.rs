//! Grouping of abnormal entities
//!
//! Abnormal entities are counted per domain and, when registry data says
//! who owns them, clustered per owning device or integration. Entities
//! without an owner stay at domain level, so removing registry data only
//! removes clustering and never changes the domain counts.

use crate::analysis::classifier::Classification;
use crate::analysis::types::{ClassifiedEntity, IssueKind, Owner, OwnerKind, Verdict};
use crate::hub::types::HubSnapshot;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

/// Entity id → owner lookup built from registry data.
///
/// Device ownership wins over integration ownership. When two registry
/// entries claim the same entity, the one with the smaller id wins. Entries
/// repeating an id are merged into the first one, keeping its name.
#[derive(Debug, Clone, Default)]
pub struct OwnershipIndex {
    owners: BTreeMap<String, Owner>,
}

impl OwnershipIndex {
    pub fn from_snapshot(snapshot: &HubSnapshot) -> Self {
        let mut index = Self::default();
        let mut known: BTreeMap<(OwnerKind, String), Owner> = BTreeMap::new();

        let mut devices: Vec<_> = snapshot.devices.iter().flatten().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        for device in devices {
            let owner = canonical_owner(&mut known, OwnerKind::Device, &device.id, &device.name);
            index.claim(&owner, device.entities.iter());
        }

        let mut integrations: Vec<_> = snapshot.integrations.iter().flatten().collect();
        integrations.sort_by(|a, b| a.id.cmp(&b.id));
        for integration in integrations {
            let owner = canonical_owner(&mut known, OwnerKind::Integration, &integration.id, &integration.name);
            index.claim(&owner, integration.entities.iter());
        }

        index
    }

    fn claim<'a>(&mut self, owner: &Owner, entity_ids: impl Iterator<Item = &'a String>) {
        for entity_id in entity_ids {
            self.owners
                .entry(entity_id.clone())
                .or_insert_with(|| owner.clone());
        }
    }

    pub fn owner_of(&self, entity_id: &str) -> Option<&Owner> {
        self.owners.get(entity_id)
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

fn canonical_owner(known: &mut BTreeMap<(OwnerKind, String), Owner>, kind: OwnerKind, id: &str, name: &str) -> Owner {
    match known.entry((kind, id.to_string())) {
        Entry::Occupied(entry) => {
            let owner = entry.get();
            if owner.name != name {
                debug!(kind = kind.as_str(), id, kept = %owner.name, dropped = name, "duplicate registry id");
            }
            owner.clone()
        }
        Entry::Vacant(entry) => entry
            .insert(Owner {
                kind,
                id: id.to_string(),
                name: name.to_string(),
            })
            .clone(),
    }
}

/// Abnormal entity counts for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub abnormal: usize,
    pub unavailable: usize,
    pub stale: usize,
    pub pending_update: usize,
}

/// What a cluster is keyed on
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupKey {
    Owner(Owner),
    Domain(String),
}

/// Abnormal entities of one kind sharing a key
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    pub key: GroupKey,
    pub kind: IssueKind,
    /// Sorted by entity id
    pub members: Vec<&'a ClassifiedEntity>,
    /// Entities the owner has in the snapshot, for owner clusters
    pub owner_entity_count: Option<usize>,
}

/// Grouper output
#[derive(Debug, Clone, Default)]
pub struct Grouping<'a> {
    /// Busiest domain first, ties by name
    pub domains: Vec<DomainCount>,
    /// Ordered by key, then kind
    pub clusters: Vec<Cluster<'a>>,
}

/// Group the abnormal entities of a classification
pub fn group<'a>(classification: &'a Classification, ownership: &OwnershipIndex) -> Grouping<'a> {
    let mut domains: BTreeMap<&str, DomainCount> = BTreeMap::new();
    let mut clusters: BTreeMap<(GroupKey, IssueKind), Vec<&'a ClassifiedEntity>> = BTreeMap::new();
    let mut owner_sizes: BTreeMap<&Owner, usize> = BTreeMap::new();

    for classified in &classification.entities {
        let entity = &classified.entity;
        let owner = ownership.owner_of(&entity.entity_id);

        if let Some(owner) = owner {
            *owner_sizes.entry(owner).or_default() += 1;
        }

        let Some(kind) = classified.verdict.issue_kind() else {
            continue;
        };

        let count = domains.entry(&entity.domain).or_insert_with(|| DomainCount {
            domain: entity.domain.clone(),
            abnormal: 0,
            unavailable: 0,
            stale: 0,
            pending_update: 0,
        });
        count.abnormal += 1;
        match classified.verdict {
            Verdict::Unavailable => count.unavailable += 1,
            Verdict::Stale => count.stale += 1,
            Verdict::PendingUpdate => count.pending_update += 1,
            Verdict::Normal => {}
        }

        let key = match owner {
            Some(owner) => GroupKey::Owner(owner.clone()),
            None => GroupKey::Domain(entity.domain.clone()),
        };
        clusters.entry((key, kind)).or_default().push(classified);
    }

    let mut domains: Vec<DomainCount> = domains.into_values().collect();
    domains.sort_by(|a, b| b.abnormal.cmp(&a.abnormal).then_with(|| a.domain.cmp(&b.domain)));

    let clusters = clusters
        .into_iter()
        .map(|((key, kind), members)| {
            let owner_entity_count = match &key {
                GroupKey::Owner(owner) => owner_sizes.get(owner).copied(),
                GroupKey::Domain(_) => None,
            };
            Cluster {
                key,
                kind,
                members,
                owner_entity_count,
            }
        })
        .collect();

    Grouping { domains, clusters }
}
