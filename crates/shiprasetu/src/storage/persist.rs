//! Typed JSON persistence over a [`KeyValueStore`].

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::Result;

/// The four shared collections and their logical storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    /// Broadcast alerts, most recent first.
    Alerts,
    /// Route recommendations, oldest first.
    Recommendations,
    /// Ghat crowd statuses.
    GhatStatuses,
    /// Route paths on the crowd map.
    RoutePaths,
}

impl CollectionKey {
    /// Every collection, in load order.
    pub const ALL: [Self; 4] = [
        Self::Alerts,
        Self::Recommendations,
        Self::GhatStatuses,
        Self::RoutePaths,
    ];

    /// Logical key, without the namespace prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alerts => "alerts",
            Self::Recommendations => "recommendations",
            Self::GhatStatuses => "ghat_statuses",
            Self::RoutePaths => "route_paths",
        }
    }

    /// Position in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Alerts => 0,
            Self::Recommendations => 1,
            Self::GhatStatuses => 2,
            Self::RoutePaths => 3,
        }
    }
}

impl std::fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a loaded value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Decoded from storage.
    Stored,
    /// Nothing (or an empty string) was stored; the fallback was used.
    Missing,
    /// The stored text did not decode; the fallback was used.
    Corrupt,
    /// The backend could not be read; the fallback was used.
    Unreadable,
}

impl LoadSource {
    /// `true` unless the value was decoded from storage.
    #[must_use]
    pub fn is_fallback(self) -> bool {
        !matches!(self, Self::Stored)
    }
}

/// Maps typed values to namespaced JSON blobs.
///
/// Cloning is cheap; clones share the backend.
#[derive(Debug, Clone)]
pub struct PersistentStore {
    backend: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl PersistentStore {
    /// Wrap `backend`, prefixing every key with `{namespace}_`.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    /// The key prefix in use.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The physical key for a logical one.
    #[must_use]
    pub fn key(&self, logical: &str) -> String {
        format!("{}_{logical}", self.namespace)
    }

    /// Load the value under `logical`, or `fallback` if it cannot be had.
    ///
    /// Never fails. Decode and read failures are logged.
    pub fn load<T: DeserializeOwned>(&self, logical: &str, fallback: T) -> T {
        self.load_with_source(logical, fallback).0
    }

    /// Like [`Self::load`], also reporting whether the fallback was used.
    pub fn load_with_source<T: DeserializeOwned>(
        &self,
        logical: &str,
        fallback: T,
    ) -> (T, LoadSource) {
        let key = self.key(logical);
        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                debug!(%key, "Nothing stored, using fallback");
                return (fallback, LoadSource::Missing);
            }
            Err(e) => {
                warn!(%key, error = %e, "Failed to read from storage, using fallback");
                return (fallback, LoadSource::Unreadable);
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => (value, LoadSource::Stored),
            Err(e) => {
                warn!(%key, error = %e, "Failed to parse stored JSON, using fallback");
                (fallback, LoadSource::Corrupt)
            }
        }
    }

    /// Serialize `value` and store it under `logical`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn save<T: Serialize + ?Sized>(&self, logical: &str, value: &T) -> Result<()> {
        let key = self.key(logical);
        let json = serde_json::to_string(value)?;
        self.backend.set(&key, &json)?;
        debug!(%key, bytes = json.len(), "Saved to storage");
        Ok(())
    }

    /// Remove the value under `logical`. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn remove(&self, logical: &str) -> Result<bool> {
        self.backend.remove(&self.key(logical))
    }

    /// BLAKE3 hash of the raw text under `logical`.
    ///
    /// `None` if nothing is stored or the backend cannot be read.
    #[must_use]
    pub fn fingerprint(&self, logical: &str) -> Option<String> {
        let key = self.key(logical);
        match self.backend.get(&key) {
            Ok(raw) => raw.map(|text| blake3::hash(text.as_bytes()).to_hex().to_string()),
            Err(e) => {
                warn!(%key, error = %e, "Failed to read from storage for fingerprint");
                None
            }
        }
    }

    /// Remove the four collection keys, as if storage had been cleared.
    ///
    /// Returns how many keys existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn clear_collections(&self) -> Result<usize> {
        let mut removed = 0;
        for key in CollectionKey::ALL {
            if self.remove(key.as_str())? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Write raw text under `logical`, bypassing serialization.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn store_raw(&self, logical: &str, text: &str) -> Result<()> {
        self.backend.set(&self.key(logical), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::records::{default_ghat_statuses, default_route_paths, Alert, GhatStatus};
    use crate::storage::SqliteStore;

    fn create_test_store() -> PersistentStore {
        let backend = SqliteStore::open_in_memory().expect("failed to create test store");
        PersistentStore::new(Arc::new(backend), "shiprasetu")
    }

    /// A backend whose every call fails.
    #[derive(Debug)]
    struct BrokenBackend;

    impl KeyValueStore for BrokenBackend {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::internal("disk on fire"))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::internal("quota exceeded"))
        }
        fn remove(&self, _key: &str) -> Result<bool> {
            Err(Error::internal("disk on fire"))
        }
    }

    #[test]
    fn test_key_is_namespaced() {
        let store = create_test_store();
        assert_eq!(store.key("alerts"), "shiprasetu_alerts");
        assert_eq!(
            store.key(CollectionKey::GhatStatuses.as_str()),
            "shiprasetu_ghat_statuses"
        );
    }

    #[test]
    fn test_round_trip() {
        let store = create_test_store();
        let ghats = default_ghat_statuses();

        store.save("ghat_statuses", &ghats).unwrap();
        let (loaded, source) = store.load_with_source("ghat_statuses", Vec::<GhatStatus>::new());

        assert_eq!(source, LoadSource::Stored);
        assert_eq!(loaded, ghats);
    }

    #[test]
    fn test_missing_key_uses_fallback() {
        let store = create_test_store();
        let (loaded, source) = store.load_with_source("route_paths", default_route_paths());

        assert_eq!(source, LoadSource::Missing);
        assert_eq!(loaded, default_route_paths());
    }

    #[test]
    fn test_empty_text_uses_fallback() {
        let store = create_test_store();
        store.store_raw("alerts", "").unwrap();

        let (loaded, source) = store.load_with_source("alerts", vec![1, 2, 3]);
        assert_eq!(source, LoadSource::Missing);
        assert_eq!(loaded, vec![1, 2, 3]);
    }

    #[test]
    fn test_corrupt_text_uses_fallback() {
        let store = create_test_store();
        for garbage in ["{not json", "null", r#"{"id":1}"#, r#"[{"id":"x"}]"#] {
            store.store_raw("alerts", garbage).unwrap();

            let fallback: Vec<Alert> = Vec::new();
            let (loaded, source) = store.load_with_source("alerts", fallback.clone());
            assert_eq!(source, LoadSource::Corrupt, "{garbage}");
            assert_eq!(loaded, fallback);
        }
    }

    #[test]
    fn test_unreadable_backend_uses_fallback() {
        let store = PersistentStore::new(Arc::new(BrokenBackend), "shiprasetu");
        let (loaded, source) = store.load_with_source("alerts", vec!["fallback".to_string()]);

        assert_eq!(source, LoadSource::Unreadable);
        assert_eq!(loaded, vec!["fallback".to_string()]);
        assert!(store.fingerprint("alerts").is_none());
    }

    #[test]
    fn test_save_surfaces_backend_failure() {
        let store = PersistentStore::new(Arc::new(BrokenBackend), "shiprasetu");
        assert!(store.save("alerts", &Vec::<Alert>::new()).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let store = create_test_store();
        assert!(store.fingerprint("alerts").is_none());

        store.store_raw("alerts", "[]").unwrap();
        let first = store.fingerprint("alerts").unwrap();
        assert_eq!(store.fingerprint("alerts").unwrap(), first);

        store.store_raw("alerts", "[1]").unwrap();
        assert_ne!(store.fingerprint("alerts").unwrap(), first);
    }

    #[test]
    fn test_clear_collections() {
        let store = create_test_store();
        store.store_raw("alerts", "[]").unwrap();
        store.store_raw("route_paths", "[]").unwrap();
        store.store_raw("current_booking", "{}").unwrap();

        assert_eq!(store.clear_collections().unwrap(), 2);
        assert!(store.fingerprint("alerts").is_none());
        assert!(store.fingerprint("current_booking").is_some());
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let a = PersistentStore::new(Arc::clone(&backend), "a");
        let b = PersistentStore::new(backend, "b");

        a.save("alerts", &vec![1]).unwrap();
        assert_eq!(b.load("alerts", vec![9]), vec![9]);
        assert_eq!(a.load("alerts", vec![9]), vec![1]);
    }

    #[test]
    fn test_collection_key_index_matches_all() {
        for (i, key) in CollectionKey::ALL.iter().enumerate() {
            assert_eq!(key.index(), i);
        }
    }
}
