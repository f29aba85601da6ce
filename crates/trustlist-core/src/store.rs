//! Content document store.
//!
//! Persists the navbar item set and the singleton service document as JSON,
//! each under one well-known key, so reads and writes are always
//! whole-document operations:
//!
//! - `content/navbar` holds every navbar item in insertion order.
//! - `content/service` holds the service document.
//!
//! Service documents written before cards and details carried ids get ids
//! on first read, and those ids are written back immediately so later reads
//! and saves see the same identities.
//!
//! Writes are serialized by an in-process mutex. There is no cross-process
//! locking; two server processes sharing one backend can still lose updates
//! unless clients send a base version with their writes.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;
use trustlist_storage::StorageBackend;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{self, NavbarItem, NavbarPatch, ServiceDocument};

const NAVBAR_KEY: &str = "content/navbar";
const SERVICE_KEY: &str = "content/service";

/// Reads and replaces the site's content documents.
pub struct ContentStore {
    storage: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl ContentStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.storage.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                key: key.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(value).map_err(|e| StoreError::Serialization {
            key: key.to_owned(),
            reason: e.to_string(),
        })?;
        self.storage.put(key, &raw).await?;
        Ok(())
    }

    // ── Navbar ───────────────────────────────────────────────────────

    /// All navbar items, sorted by `order` with ties in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails or the stored set is corrupt.
    pub async fn navbar_items(&self) -> Result<Vec<NavbarItem>, StoreError> {
        let mut items: Vec<NavbarItem> = self.read(NAVBAR_KEY).await?.unwrap_or_default();
        model::sort_navbar(&mut items);
        Ok(items)
    }

    /// Apply `patch` to the item with `id`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no item has that id.
    /// - [`StoreError::Storage`] / [`StoreError::Serialization`] on backend failure.
    pub async fn update_navbar_item(
        &self,
        id: Uuid,
        patch: NavbarPatch,
    ) -> Result<NavbarItem, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut items: Vec<NavbarItem> = self.read(NAVBAR_KEY).await?.unwrap_or_default();
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(StoreError::NotFound {
                kind: "navbar item",
                id,
            })?;
        patch.apply_to(item);
        let updated = item.clone();

        self.write(NAVBAR_KEY, &items).await?;
        info!(id = %id, label = %updated.label, order = updated.order, "navbar item updated");
        Ok(updated)
    }

    /// Replace the whole navbar with the default item set.
    ///
    /// The set is written with a single put, so readers never observe a
    /// partially reseeded navbar.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn reseed_navbar(&self) -> Result<Vec<NavbarItem>, StoreError> {
        let _guard = self.write_lock.lock().await;

        let items = model::default_navbar_items();
        self.write(NAVBAR_KEY, &items).await?;
        info!(count = items.len(), "navbar reseeded");
        Ok(items)
    }

    // ── Service document ─────────────────────────────────────────────

    /// The service document, if one was ever saved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails or the document is corrupt.
    pub async fn service(&self) -> Result<Option<ServiceDocument>, StoreError> {
        match self.read_service().await? {
            None => Ok(None),
            Some((doc, false)) => Ok(Some(doc)),
            Some((_, true)) => {
                let _guard = self.write_lock.lock().await;
                self.load_service_locked().await
            }
        }
    }

    /// Decode the stored document, reporting whether any card or detail
    /// had to be given a fresh id.
    async fn read_service(&self) -> Result<Option<(ServiceDocument, bool)>, StoreError> {
        let Some(value) = self.read::<Value>(SERVICE_KEY).await? else {
            return Ok(None);
        };
        let missing_ids = lacks_ids(&value);
        let doc = serde_json::from_value(value).map_err(|e| StoreError::Serialization {
            key: SERVICE_KEY.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Some((doc, missing_ids)))
    }

    /// Read the service document, persisting any generated ids. Callers hold
    /// `write_lock`.
    async fn load_service_locked(&self) -> Result<Option<ServiceDocument>, StoreError> {
        let Some((doc, missing_ids)) = self.read_service().await? else {
            return Ok(None);
        };
        if missing_ids {
            self.write(SERVICE_KEY, &doc).await?;
            info!(
                version = doc.version,
                cards = doc.cards.len(),
                "assigned ids to stored service document"
            );
        }
        Ok(Some(doc))
    }

    /// Create or fully replace the service document.
    ///
    /// The editable fields of `document` replace the stored ones; version
    /// and timestamps are managed here and ignored on input. When
    /// `base_version` is given it must equal the stored version (0 when no
    /// document exists). Submitting content identical to what is stored is
    /// a no-op that returns the stored document unchanged.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Conflict`] if `base_version` is stale.
    /// - [`StoreError::Storage`] / [`StoreError::Serialization`] on backend failure.
    pub async fn put_service(
        &self,
        document: ServiceDocument,
        base_version: Option<u64>,
    ) -> Result<ServiceDocument, StoreError> {
        let _guard = self.write_lock.lock().await;

        let current = self.load_service_locked().await?;
        let stored_version = current.as_ref().map_or(0, |doc| doc.version);

        if let Some(expected) = base_version {
            if expected != stored_version {
                return Err(StoreError::Conflict {
                    expected,
                    actual: stored_version,
                });
            }
        }

        if let Some(current) = current.as_ref() {
            if current.same_content(&document) {
                return Ok(current.clone());
            }
        }

        let now = Utc::now();
        let next = ServiceDocument {
            image_link: document.image_link,
            promo: document.promo,
            cards: document.cards,
            version: stored_version.saturating_add(1),
            created_at: current.and_then(|doc| doc.created_at).or(Some(now)),
            updated_at: Some(now),
        };

        self.write(SERVICE_KEY, &next).await?;
        info!(
            version = next.version,
            cards = next.cards.len(),
            "service document replaced"
        );
        Ok(next)
    }
}

fn lacks_ids(value: &Value) -> bool {
    let missing = |item: &Value| item.get("id").is_none_or(Value::is_null);
    value
        .get("cards")
        .and_then(Value::as_array)
        .is_some_and(|cards| {
            cards.iter().any(|card| {
                missing(card)
                    || card
                        .get("detail")
                        .and_then(Value::as_array)
                        .is_some_and(|details| details.iter().any(missing))
            })
        })
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore").finish_non_exhaustive()
    }
}
