//! In-process document store.
//!
//! [`MemoryStore`] keeps every collection as an insertion-ordered list of
//! documents behind one `RwLock`. It exists for development and tests: it
//! enforces the same contracts as the production backend — generated object
//! ids, equality filters, key-wise patches, collection-wide unique indexes —
//! without a network round-trip. Nothing is persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::Document;
use bson::oid::ObjectId;
use parking_lot::RwLock;

use crate::backend::{DocumentStore, StoreError, UpdateOutcome};
use crate::oid::ID_KEY;

/// An in-memory [`DocumentStore`].
///
/// ```
/// use trellis_store::backends::memory::MemoryStore;
/// use trellis_store::backend::DocumentStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), trellis_store::backend::StoreError> {
/// let store = MemoryStore::new();
/// let id = store.insert_one("devices", bson::doc! { "domain": "a" }).await?;
/// assert_eq!(store.count("devices", bson::doc! {}).await?, 1);
/// # let _ = id;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

#[derive(Default)]
struct MemoryCollection {
    /// Insertion order doubles as the backend's stable find order.
    documents: Vec<Document>,
    unique_keys: Vec<String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryCollection {
    fn position(&self, filter: &Document) -> Option<usize> {
        self.documents.iter().position(|doc| matches(doc, filter))
    }

    /// Checks `candidate`'s indexed values against every document except the
    /// one at `skip`.
    fn check_unique(
        &self,
        name: &str,
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<(), StoreError> {
        for key in &self.unique_keys {
            let Some(value) = candidate.get(key) else {
                continue;
            };
            let collision = self
                .documents
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .any(|(_, doc)| doc.get(key) == Some(value));
            if collision {
                return Err(StoreError::DuplicateKey {
                    collection: name.to_string(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| document.get(key) == Some(value))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<ObjectId, StoreError> {
        let mut collections = self.collections.write();
        let target = collections.entry(collection.to_string()).or_default();

        let id = match document.get(ID_KEY) {
            None => {
                let id = ObjectId::new();
                document.insert(ID_KEY, id);
                id
            }
            Some(bson::Bson::ObjectId(id)) => *id,
            Some(_) => {
                return Err(StoreError::Corrupt {
                    collection: collection.to_string(),
                    message: "document carries a non-object id".to_string(),
                });
            }
        };

        if target
            .documents
            .iter()
            .any(|doc| doc.get(ID_KEY) == document.get(ID_KEY))
        {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                key: ID_KEY.to_string(),
            });
        }
        target.check_unique(collection, &document, None)?;

        target.documents.push(document);
        Ok(id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read();
        let Some(target) = collections.get(collection) else {
            return Ok(None);
        };
        Ok(target
            .documents
            .iter()
            .find(|doc| matches(doc, &filter))
            .cloned())
    }

    async fn find_latest(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read();
        let Some(target) = collections.get(collection) else {
            return Ok(None);
        };
        Ok(target
            .documents
            .iter()
            .rev()
            .find(|doc| matches(doc, &filter))
            .cloned())
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let collections = self.collections.read();
        let Some(target) = collections.get(collection) else {
            return Ok(0);
        };
        Ok(target
            .documents
            .iter()
            .filter(|doc| matches(doc, &filter))
            .count() as u64)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        patch: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut collections = self.collections.write();
        let Some(target) = collections.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };
        let Some(index) = target.position(&filter) else {
            return Ok(UpdateOutcome::default());
        };

        target.check_unique(collection, &patch, Some(index))?;

        let mut modified = false;
        let document = &mut target.documents[index];
        for (key, value) in patch {
            if document.get(&key) != Some(&value) {
                modified = true;
            }
            document.insert(key, value);
        }
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let mut collections = self.collections.write();
        let Some(target) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match target.position(&filter) {
            Some(index) => {
                target.documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn create_unique_index(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write();
        let target = collections.entry(collection.to_string()).or_default();
        if target.unique_keys.iter().any(|existing| existing == key) {
            return Ok(());
        }

        // Mirrors the production backend: the index cannot be built over
        // already-duplicated values.
        for (i, document) in target.documents.iter().enumerate() {
            let Some(value) = document.get(key) else {
                continue;
            };
            if target.documents[..i]
                .iter()
                .any(|prior| prior.get(key) == Some(value))
            {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    key: key.to_string(),
                });
            }
        }

        target.unique_keys.push(key.to_string());
        Ok(())
    }
}
