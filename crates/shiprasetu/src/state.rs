//! The shared state container.
//!
//! [`SharedState`] owns the four collections and keeps them mirrored in a
//! [`PersistentStore`]. Every mutation is applied in memory and saved to its
//! key before the call returns. Reloads (explicit or from the synchronizer)
//! replace memory with whatever storage currently holds.
//!
//! A collection whose last save failed is marked dirty. Memory stays
//! authoritative for it: reloads retry the save instead of reading storage
//! until a write succeeds.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::records::{
    default_alerts, default_ghat_statuses, default_recommendations, default_route_paths, Alert,
    CrowdLevel, FieldUpdate, GhatStatus, Recommendation, RoutePath,
};
use crate::storage::{CollectionKey, LoadSource, PersistentStore};

/// Outcome of an id-addressed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// The record was found and changed.
    Applied,
    /// No record had the id; nothing changed.
    NotFound,
}

impl Mutation {
    /// `true` if the record was found.
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Turn `NotFound` into an error for callers that want one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the mutation found nothing.
    pub fn or_not_found(self, collection: &'static str, id: i64) -> Result<()> {
        match self {
            Self::Applied => Ok(()),
            Self::NotFound => Err(Error::not_found(collection, id)),
        }
    }
}

/// An owned copy of all four collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Alerts, most recent first.
    pub alerts: Vec<Alert>,
    /// Recommendations, oldest first.
    pub recommendations: Vec<Recommendation>,
    /// Ghat statuses.
    pub ghat_statuses: Vec<GhatStatus>,
    /// Route paths.
    pub route_paths: Vec<RoutePath>,
}

impl Snapshot {
    /// The built-in collections.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            alerts: default_alerts(),
            recommendations: default_recommendations(),
            ghat_statuses: default_ghat_statuses(),
            route_paths: default_route_paths(),
        }
    }
}

/// What a reload falls back to when storage has nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Defaults,
    Current,
}

#[derive(Debug)]
struct Inner {
    data: Snapshot,
    dirty: [bool; 4],
}

/// Handle to the shared collections.
///
/// Cloning is cheap and every clone sees the same state. Readers get owned
/// copies; all changes go through the methods below.
#[derive(Debug, Clone)]
pub struct SharedState {
    store: PersistentStore,
    inner: Arc<Mutex<Inner>>,
}

impl SharedState {
    /// Load all four collections from `store`, using the built-in defaults
    /// for any key that is missing or unreadable.
    #[must_use]
    pub fn new(store: PersistentStore) -> Self {
        let state = Self {
            store,
            inner: Arc::new(Mutex::new(Inner {
                data: Snapshot::default(),
                dirty: [false; 4],
            })),
        };
        {
            let mut inner = state.lock();
            for key in CollectionKey::ALL {
                state.reload_one(&mut inner, key, Fallback::Defaults);
            }
        }
        info!(namespace = state.store.namespace(), "Shared state loaded");
        state
    }

    /// The persistence adapter behind this state.
    #[must_use]
    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Copy of the alerts, most recent first.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().data.alerts.clone()
    }

    /// Copy of the recommendations, oldest first.
    #[must_use]
    pub fn recommendations(&self) -> Vec<Recommendation> {
        self.lock().data.recommendations.clone()
    }

    /// Copy of the ghat statuses.
    #[must_use]
    pub fn ghat_statuses(&self) -> Vec<GhatStatus> {
        self.lock().data.ghat_statuses.clone()
    }

    /// Copy of the route paths.
    #[must_use]
    pub fn route_paths(&self) -> Vec<RoutePath> {
        self.lock().data.route_paths.clone()
    }

    /// Copy of all four collections taken under one lock.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.lock().data.clone()
    }

    /// Collections whose latest save failed and have not been written since.
    #[must_use]
    pub fn unsaved(&self) -> Vec<CollectionKey> {
        let inner = self.lock();
        CollectionKey::ALL
            .into_iter()
            .filter(|key| inner.dirty[key.index()])
            .collect()
    }

    /// A fresh id for `collection`: the current Unix time in milliseconds,
    /// bumped past the largest id already present.
    #[must_use]
    pub fn next_id(&self, collection: CollectionKey) -> i64 {
        let inner = self.lock();
        let data = &inner.data;
        let max = match collection {
            CollectionKey::Alerts => data.alerts.iter().map(|a| a.id).max(),
            CollectionKey::Recommendations => data.recommendations.iter().map(|r| r.id).max(),
            CollectionKey::GhatStatuses => data.ghat_statuses.iter().map(|g| g.id).max(),
            CollectionKey::RoutePaths => data.route_paths.iter().map(|p| p.id).max(),
        };
        let now = Utc::now().timestamp_millis();
        max.map_or(now, |max| now.max(max.saturating_add(1)))
    }

    // ── Alerts ─────────────────────────────────────────────────────

    /// Put `alert` at the front of the feed.
    pub fn add_alert(&self, alert: Alert) {
        let mut inner = self.lock();
        debug!(id = alert.id, "Adding alert");
        inner.data.alerts.insert(0, alert);
        self.persist(&mut inner, CollectionKey::Alerts);
    }

    /// Remove the alert with `id`.
    pub fn delete_alert(&self, id: i64) -> Mutation {
        let mut inner = self.lock();
        let mutation = remove_by_id(&mut inner.data.alerts, id, |a| a.id);
        if mutation.is_applied() {
            self.persist(&mut inner, CollectionKey::Alerts);
        } else {
            debug!(id, "No alert to delete");
        }
        mutation
    }

    /// Replace every alert.
    pub fn update_alerts(&self, alerts: Vec<Alert>) {
        let mut inner = self.lock();
        inner.data.alerts = alerts;
        self.persist(&mut inner, CollectionKey::Alerts);
    }

    // ── Recommendations ────────────────────────────────────────────

    /// Append `recommendation`.
    pub fn add_recommendation(&self, recommendation: Recommendation) {
        let mut inner = self.lock();
        debug!(id = recommendation.id, "Adding recommendation");
        inner.data.recommendations.push(recommendation);
        self.persist(&mut inner, CollectionKey::Recommendations);
    }

    /// Remove the recommendation with `id`.
    pub fn delete_recommendation(&self, id: i64) -> Mutation {
        let mut inner = self.lock();
        let mutation = remove_by_id(&mut inner.data.recommendations, id, |r| r.id);
        if mutation.is_applied() {
            self.persist(&mut inner, CollectionKey::Recommendations);
        } else {
            debug!(id, "No recommendation to delete");
        }
        mutation
    }

    /// Replace every recommendation.
    pub fn update_recommendations(&self, recommendations: Vec<Recommendation>) {
        let mut inner = self.lock();
        inner.data.recommendations = recommendations;
        self.persist(&mut inner, CollectionKey::Recommendations);
    }

    // ── Ghat statuses ──────────────────────────────────────────────

    /// Set a ghat's crowd level, deriving its occupancy and wait time.
    pub fn update_ghat_status(
        &self,
        id: i64,
        status: CrowdLevel,
        remarks: FieldUpdate<String>,
    ) -> Mutation {
        let mut inner = self.lock();
        let Some(ghat) = inner.data.ghat_statuses.iter_mut().find(|g| g.id == id) else {
            debug!(id, "No ghat to update");
            return Mutation::NotFound;
        };
        ghat.apply_status(status);
        remarks.apply(&mut ghat.remarks);
        debug!(id, %status, capacity = ghat.current_capacity, "Ghat status updated");
        self.persist(&mut inner, CollectionKey::GhatStatuses);
        Mutation::Applied
    }

    /// Replace every ghat status.
    ///
    /// Occupancy above a ghat's maximum is clamped.
    pub fn update_ghat_statuses(&self, mut ghat_statuses: Vec<GhatStatus>) {
        clamp_ghats(&mut ghat_statuses);
        let mut inner = self.lock();
        inner.data.ghat_statuses = ghat_statuses;
        self.persist(&mut inner, CollectionKey::GhatStatuses);
    }

    // ── Route paths ────────────────────────────────────────────────

    /// Set a route's crowd level, notes and open flag.
    pub fn update_route_path(
        &self,
        id: i64,
        crowd_level: CrowdLevel,
        notes: FieldUpdate<String>,
        is_active: bool,
    ) -> Mutation {
        let mut inner = self.lock();
        let Some(path) = inner.data.route_paths.iter_mut().find(|p| p.id == id) else {
            debug!(id, "No route path to update");
            return Mutation::NotFound;
        };
        path.crowd_level = crowd_level;
        notes.apply(&mut path.notes);
        path.is_active = is_active;
        self.persist(&mut inner, CollectionKey::RoutePaths);
        Mutation::Applied
    }

    /// Open or close a route, leaving its crowd level and notes alone.
    pub fn set_route_active(&self, id: i64, is_active: bool) -> Mutation {
        let mut inner = self.lock();
        let Some(path) = inner.data.route_paths.iter_mut().find(|p| p.id == id) else {
            debug!(id, "No route path to toggle");
            return Mutation::NotFound;
        };
        path.is_active = is_active;
        self.persist(&mut inner, CollectionKey::RoutePaths);
        Mutation::Applied
    }

    /// Replace every route path.
    pub fn update_route_paths(&self, route_paths: Vec<RoutePath>) {
        let mut inner = self.lock();
        inner.data.route_paths = route_paths;
        self.persist(&mut inner, CollectionKey::RoutePaths);
    }

    // ── Reloads ────────────────────────────────────────────────────

    /// Re-read all four collections now.
    ///
    /// A key with nothing usable in storage keeps its in-memory value.
    /// Returns the collections whose contents changed.
    pub fn refresh_data(&self) -> Vec<CollectionKey> {
        let mut inner = self.lock();
        CollectionKey::ALL
            .into_iter()
            .filter(|&key| self.reload_one(&mut inner, key, Fallback::Current))
            .collect()
    }

    /// Reload the given collections plus any with unsaved changes.
    ///
    /// A key with nothing usable in storage resets to the built-in defaults.
    /// Returns the collections whose contents changed.
    pub fn poll_reload(&self, keys: &[CollectionKey]) -> Vec<CollectionKey> {
        let mut inner = self.lock();
        let due: Vec<CollectionKey> = CollectionKey::ALL
            .into_iter()
            .filter(|key| keys.contains(key) || inner.dirty[key.index()])
            .collect();
        due.into_iter()
            .filter(|&key| self.reload_one(&mut inner, key, Fallback::Defaults))
            .collect()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Save one collection, marking it dirty on failure.
    fn persist(&self, inner: &mut Inner, key: CollectionKey) {
        let data = &inner.data;
        let result = match key {
            CollectionKey::Alerts => self.store.save(key.as_str(), &data.alerts),
            CollectionKey::Recommendations => self.store.save(key.as_str(), &data.recommendations),
            CollectionKey::GhatStatuses => self.store.save(key.as_str(), &data.ghat_statuses),
            CollectionKey::RoutePaths => self.store.save(key.as_str(), &data.route_paths),
        };
        let dirty = &mut inner.dirty[key.index()];
        match result {
            Ok(()) => *dirty = false,
            Err(e) => {
                warn!(%key, error = %e, "Failed to save, keeping in-memory state");
                *dirty = true;
            }
        }
    }

    /// Reload one collection. Returns `true` if memory changed.
    fn reload_one(&self, inner: &mut Inner, key: CollectionKey, fallback: Fallback) -> bool {
        if inner.dirty[key.index()] {
            self.persist(inner, key);
            if inner.dirty[key.index()] {
                debug!(%key, "Unsaved changes, skipping reload");
                return false;
            }
        }

        let data = &mut inner.data;
        let (changed, source) = match key {
            CollectionKey::Alerts => {
                reload_into(&self.store, key, &mut data.alerts, fallback, default_alerts)
            }
            CollectionKey::Recommendations => reload_into(
                &self.store,
                key,
                &mut data.recommendations,
                fallback,
                default_recommendations,
            ),
            CollectionKey::GhatStatuses => {
                let result = reload_into(
                    &self.store,
                    key,
                    &mut data.ghat_statuses,
                    fallback,
                    default_ghat_statuses,
                );
                if clamp_ghats(&mut data.ghat_statuses) {
                    self.persist(inner, key);
                    (true, result.1)
                } else {
                    result
                }
            }
            CollectionKey::RoutePaths => reload_into(
                &self.store,
                key,
                &mut data.route_paths,
                fallback,
                default_route_paths,
            ),
        };

        // Missing or corrupt keys are rewritten so storage holds the value in use.
        if matches!(source, LoadSource::Missing | LoadSource::Corrupt) {
            self.persist(inner, key);
        }
        if changed {
            debug!(%key, ?source, "Collection reloaded with changes");
        }
        changed
    }
}

/// Load `key` into `slot`. Returns whether `slot` changed and where the value came from.
fn reload_into<T>(
    store: &PersistentStore,
    key: CollectionKey,
    slot: &mut Vec<T>,
    fallback: Fallback,
    defaults: fn() -> Vec<T>,
) -> (bool, LoadSource)
where
    T: Clone + PartialEq + Serialize + DeserializeOwned,
{
    let fallback = match fallback {
        Fallback::Defaults => defaults(),
        Fallback::Current => slot.clone(),
    };
    let (value, source) = store.load_with_source(key.as_str(), fallback);
    let changed = *slot != value;
    *slot = value;
    (changed, source)
}

fn remove_by_id<T>(items: &mut Vec<T>, id: i64, id_of: impl Fn(&T) -> i64) -> Mutation {
    let before = items.len();
    items.retain(|item| id_of(item) != id);
    if items.len() < before {
        Mutation::Applied
    } else {
        Mutation::NotFound
    }
}

/// Clamp every ghat's occupancy to its maximum. Returns `true` if any changed.
fn clamp_ghats(ghats: &mut [GhatStatus]) -> bool {
    let mut any = false;
    for ghat in ghats.iter_mut() {
        if ghat.clamp_capacity() {
            warn!(id = ghat.id, name = %ghat.name, "Ghat occupancy exceeded maximum, clamped");
            any = true;
        }
    }
    any
}
