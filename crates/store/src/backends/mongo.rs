//! MongoDB document store.
//!
//! The production backend. Each trait call is one driver round-trip against
//! a `Collection<Document>`; connections come from the driver's own pool,
//! bounded by [`MongoStoreConfig::max_pool_size`] — acquisition waits when
//! the pool is exhausted and the connection is released when the call
//! returns. Server-side unique indexes surface duplicate-key violations
//! (code 11000), which are translated to [`StoreError::DuplicateKey`] so the
//! collection layer can report them as a caller error rather than a backend
//! failure.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::Deserialize;

use crate::backend::{DocumentStore, StoreError, UpdateOutcome};
use crate::oid::ID_KEY;

/// Server error code for a unique-index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Connection settings for [`MongoStore`].
///
/// Every field has a default, so a partial configuration fragment
/// deserializes cleanly:
///
/// ```
/// use trellis_store::backends::mongo::MongoStoreConfig;
///
/// let config: MongoStoreConfig =
///     serde_json::from_str(r#"{ "database": "fleet-prod" }"#).unwrap();
/// assert_eq!(config.database, "fleet-prod");
/// assert_eq!(config.max_pool_size, 10);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MongoStoreConfig {
    /// Connection string.
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database holding every collection.
    #[serde(default = "default_database")]
    pub database: String,

    /// Upper bound on the driver's connection pool.
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "trellis".to_string()
}

fn default_max_pool_size() -> u32 {
    10
}

impl Default for MongoStoreConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            max_pool_size: default_max_pool_size(),
        }
    }
}

/// A [`DocumentStore`] backed by MongoDB.
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connects with the given configuration.
    pub async fn connect(config: MongoStoreConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(connection_failed)?;
        options.max_pool_size = Some(config.max_pool_size);
        let client = Client::with_options(options).map_err(connection_failed)?;
        Ok(Self {
            database: client.database(&config.database),
        })
    }

    /// Connects to `uri` and uses `database`, with default pool settings.
    pub async fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Result<Self, StoreError> {
        Self::connect(MongoStoreConfig {
            uri: uri.into(),
            database: database.into(),
            ..MongoStoreConfig::default()
        })
        .await
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<ObjectId, StoreError> {
        let result = self
            .collection(collection)
            .insert_one(document)
            .await
            .map_err(|err| translate(collection, err))?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Corrupt {
                collection: collection.to_string(),
                message: "server returned a non-object id for an insert".to_string(),
            })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one(filter)
            .await
            .map_err(|err| translate(collection, err))
    }

    async fn find_latest(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        // Object ids embed their creation instant, so descending `_id` is
        // newest-first.
        self.collection(collection)
            .find_one(filter)
            .sort(doc! { ID_KEY: -1 })
            .await
            .map_err(|err| translate(collection, err))
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.collection(collection)
            .count_documents(filter)
            .await
            .map_err(|err| translate(collection, err))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        patch: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": patch })
            .await
            .map_err(|err| translate(collection, err))?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .delete_one(filter)
            .await
            .map_err(|err| translate(collection, err))?;
        Ok(result.deleted_count)
    }

    async fn create_unique_index(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut keys = Document::new();
        keys.insert(key, 1_i32);
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection(collection)
            .create_index(model)
            .await
            .map_err(|err| translate(collection, err))?;
        Ok(())
    }
}

fn connection_failed(err: mongodb::error::Error) -> StoreError {
    StoreError::ConnectionFailed {
        message: err.to_string(),
    }
}

fn translate(collection: &str, err: mongodb::error::Error) -> StoreError {
    match duplicate_key_index(&err) {
        Some(key) => StoreError::DuplicateKey {
            collection: collection.to_string(),
            key,
        },
        None => StoreError::backend(err),
    }
}

fn duplicate_key_index(err: &mongodb::error::Error) -> Option<String> {
    let message = match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            &write.message
        }
        ErrorKind::Command(command) if command.code == DUPLICATE_KEY_CODE => &command.message,
        _ => return None,
    };
    Some(index_name(message))
}

/// Pulls the index name out of a server duplicate-key message, e.g.
/// `E11000 duplicate key error collection: trellis.devices index: 2_1 dup
/// key: { 2: "..." }`.
fn index_name(message: &str) -> String {
    message
        .split_once("index: ")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}
