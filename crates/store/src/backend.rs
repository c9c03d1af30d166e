//! The storage backend seam.
//!
//! A [`DocumentStore`] is the narrow interface a typed collection drives:
//! single-document insert/find/count/update/delete plus unique-index
//! declaration. Implementations own their connection handling — each call is
//! one backend round-trip on a connection acquired for the duration of the
//! call and released on return, never held across calls.
//!
//! Backend failures are reported as [`StoreError`] and do not escape the
//! typed collection: they are translated into the public status algebra at
//! that boundary, exactly once.

use async_trait::async_trait;
use bson::Document;
use bson::oid::ObjectId;
use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert or update violated a declared unique index.
    #[error("duplicate value for unique key {key} in {collection}")]
    DuplicateKey {
        /// Collection holding the index.
        collection: String,
        /// Document key the index covers.
        key: String,
    },

    /// A connection could not be acquired or the backend is unreachable.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        /// Driver-reported reason.
        message: String,
    },

    /// A stored document violated an invariant the store relies on.
    #[error("corrupt document in {collection}: {message}")]
    Corrupt {
        /// Collection holding the document.
        collection: String,
        /// What was wrong with it.
        message: String,
    },

    /// Any other backend failure.
    #[error("backend error: {message}")]
    Backend {
        /// Driver-reported reason.
        message: String,
        /// Underlying driver error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Wraps an arbitrary driver error.
    pub fn backend(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}

/// Matched/modified counts reported by an update round-trip.
///
/// A patch that finds its target but changes nothing reports `matched == 1,
/// modified == 0`; only `matched == 0` means the document does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Documents the filter matched (0 or 1 for single-document updates).
    pub matched: u64,
    /// Documents actually rewritten.
    pub modified: u64,
}

/// A document storage backend.
///
/// Filters are conjunctions of key equalities. Patches are key-wise
/// overwrites: every key in the patch replaces the stored value under that
/// key, keys not mentioned are left alone (merge-patch semantics).
///
/// Implementations must provide per-document atomicity for insert, update,
/// and delete; nothing here assumes cross-document transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Inserts `document` into `collection`, generating an object id when
    /// the document does not carry one. Returns the document's id.
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<ObjectId, StoreError>;

    /// Returns the first document in `collection` matching `filter`, in the
    /// backend's stable order.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Returns the most recently inserted document in `collection` matching
    /// `filter`.
    async fn find_latest(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Counts the documents in `collection` matching `filter`.
    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;

    /// Applies `patch` as a key-wise overwrite to the first document
    /// matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        patch: Document,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Deletes the first document matching `filter`. Returns the number of
    /// documents removed (0 or 1).
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;

    /// Declares the values under `key` unique across the whole collection,
    /// domains included. Idempotent.
    async fn create_unique_index(&self, collection: &str, key: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::DuplicateKey {
            collection: "devices".to_string(),
            key: "2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate value for unique key 2 in devices"
        );

        let err = StoreError::ConnectionFailed {
            message: "pool timed out".to_string(),
        };
        assert_eq!(err.to_string(), "connection failed: pool timed out");
    }

    #[test]
    fn test_backend_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "socket gone");
        let err = StoreError::backend(io);
        assert!(err.to_string().contains("socket gone"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_update_outcome_distinguishes_unmodified() {
        let outcome = UpdateOutcome {
            matched: 1,
            modified: 0,
        };
        assert_eq!(outcome.matched, 1);
        assert_ne!(outcome, UpdateOutcome::default());
    }
}
