//! Service membership and subscriptions.
//!
//! Registrations mutate the live maps immediately; subscribers only see them
//! once the update loop publishes a new [`MembershipSnapshot`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered member of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub address: String,
    /// Milliseconds since the Unix epoch.
    pub registered_at_ms: u64,
}

/// Members of one service, keyed by member id.
pub type ServiceMembership = BTreeMap<String, MemberInfo>;

/// Published view of every service's membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub version: u64,
    pub services: BTreeMap<String, ServiceMembership>,
}

/// The part of a snapshot a subscriber asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberUpdate {
    pub version: u64,
    pub services: BTreeMap<String, ServiceMembership>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub subscriber_id: String,
    pub services: BTreeSet<String>,
}

/// Outcome of a registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    Updated,
    Unchanged,
}

/// Live membership plus the last published snapshot.
#[derive(Debug)]
pub struct Membership {
    services: DashMap<String, ServiceMembership>,
    subscriptions: DashMap<Uuid, Subscription>,
    dirty: AtomicBool,
    published: ArcSwap<MembershipSnapshot>,
}

impl Membership {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            subscriptions: DashMap::new(),
            dirty: AtomicBool::new(false),
            published: ArcSwap::from_pointee(MembershipSnapshot::default()),
        }
    }

    /// Add or re-address a member of `service_id`.
    pub fn register_member(&self, service_id: &str, member_id: &str, address: &str) -> Registration {
        let mut members = self.services.entry(service_id.to_string()).or_default();
        let outcome = match members.get_mut(member_id) {
            Some(existing) if existing.address == address => Registration::Unchanged,
            Some(existing) => {
                existing.address = address.to_string();
                Registration::Updated
            }
            None => {
                members.insert(
                    member_id.to_string(),
                    MemberInfo {
                        address: address.to_string(),
                        registered_at_ms: now_ms(),
                    },
                );
                Registration::Added
            }
        };
        drop(members);

        if outcome != Registration::Unchanged {
            self.dirty.store(true, Ordering::Release);
        }
        outcome
    }

    /// Remove a member; returns false if it was not registered.
    pub fn unregister_member(&self, service_id: &str, member_id: &str) -> bool {
        let removed = match self.services.get_mut(service_id) {
            Some(mut members) => members.remove(member_id).is_some(),
            None => false,
        };
        if removed {
            self.services.remove_if(service_id, |_, members| members.is_empty());
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    pub fn subscribe(&self, subscriber_id: &str, services: impl IntoIterator<Item = String>) -> Uuid {
        let id = Uuid::new_v4();
        self.subscriptions.insert(
            id,
            Subscription {
                id,
                subscriber_id: subscriber_id.to_string(),
                services: services.into_iter().collect(),
            },
        );
        id
    }

    pub fn unsubscribe(&self, id: &Uuid) -> bool {
        self.subscriptions.remove(id).is_some()
    }

    pub fn subscription(&self, id: &Uuid) -> Option<Subscription> {
        self.subscriptions.get(id).map(|s| s.value().clone())
    }

    /// All subscriptions, ordered by subscriber id.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut all: Vec<Subscription> = self.subscriptions.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.subscriber_id.cmp(&b.subscriber_id).then(a.id.cmp(&b.id)));
        all
    }

    /// Publish a new snapshot if anything changed since the last one.
    ///
    /// Returns the new version, or `None` when nothing was published.
    pub fn publish(&self) -> Option<u64> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        let services: BTreeMap<String, ServiceMembership> = self
            .services
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let version = self.published.load().version + 1;
        self.published
            .store(Arc::new(MembershipSnapshot { version, services }));
        Some(version)
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> Arc<MembershipSnapshot> {
        self.published.load_full()
    }

    /// Updates for a subscription newer than `since`.
    ///
    /// `Ok(None)` means nothing newer has been published.
    pub fn updates_for(&self, id: &Uuid, since: u64) -> Result<Option<SubscriberUpdate>, UnknownSubscription> {
        let subscription = self.subscription(id).ok_or(UnknownSubscription(*id))?;
        let snapshot = self.snapshot();
        if snapshot.version <= since {
            return Ok(None);
        }

        let services = subscription
            .services
            .iter()
            .map(|service| {
                let members = snapshot.services.get(service).cloned().unwrap_or_default();
                (service.clone(), members)
            })
            .collect();
        Ok(Some(SubscriberUpdate {
            version: snapshot.version,
            services,
        }))
    }

    /// Members currently registered, published or not.
    pub fn live_members(&self) -> usize {
        self.services.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Default for Membership {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown subscription {0}")]
pub struct UnknownSubscription(pub Uuid);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
