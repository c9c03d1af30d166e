//! Tenant-scoped typed collections.
//!
//! A [`Collection<R>`] is the CRUD façade for one record type over one named
//! backend collection. Every document it writes is stamped with the caller's
//! [`Domain`]; every identifier lookup filters on id *and* domain, so a
//! caller can never observe a document from another domain — a cross-domain
//! identifier behaves exactly like one that does not exist.
//!
//! Identifier arguments are validated before any backend access: a malformed
//! id is `InvalidArgument`, never a backend round-trip and never a masked
//! not-found. Backend failures are translated here, exactly once —
//! duplicate-key violations become `InvalidArgument("unique key collision")`
//! and everything else becomes `Internal` with a logged diagnostic. Expected
//! outcomes (`NotFound`, `InvalidArgument`) are never logged.

use std::marker::PhantomData;
use std::sync::Arc;

use bson::Document;
use tracing::error;

use crate::backend::{DocumentStore, StoreError};
use crate::codec;
use crate::domain::{DOMAIN_KEY, Domain};
use crate::error::{Error, Result};
use crate::oid::{self, ID_KEY};
use crate::schema::Record;

/// CRUD over one record type in one backend collection.
///
/// Cloning is cheap and clones share the underlying store.
///
/// ```
/// use std::sync::Arc;
/// use trellis_store::backends::memory::MemoryStore;
/// use trellis_store::schema::{Field, FieldAccess, Record, ScalarAccess};
/// use trellis_store::{Collection, Domain};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Note {
///     body: Option<String>,
/// }
///
/// static NOTE_SCHEMA: [Field<Note>; 1] = [Field {
///     tag: 1,
///     name: "body",
///     access: FieldAccess::Scalar(ScalarAccess::String {
///         get: |r: &Note| r.body.as_deref(),
///         set: |r: &mut Note, v| r.body = Some(v),
///     }),
/// }];
///
/// impl Record for Note {
///     const NAME: &'static str = "Note";
///
///     fn schema() -> &'static [Field<Self>] {
///         &NOTE_SCHEMA
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> trellis_store::Result<()> {
/// let notes = Collection::<Note>::new(Arc::new(MemoryStore::new()), "notes");
/// let domain = Domain::new("greenhouse-12");
///
/// let note = Note {
///     body: Some("check the ph probe".to_string()),
/// };
/// let id = notes.create(&domain, &note).await?;
/// assert_eq!(notes.get(&id, &domain).await?, note);
/// # Ok(())
/// # }
/// ```
pub struct Collection<R: Record> {
    store: Arc<dyn DocumentStore>,
    name: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Collection<R> {
    /// Binds a typed collection to `name` on the given store.
    pub fn new(store: Arc<dyn DocumentStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            _record: PhantomData,
        }
    }

    /// The backend collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares the field `tag` unique across the whole collection, domains
    /// included. Idempotent; meant to run once at service construction.
    ///
    /// Returns `false` when the backend refuses the index, which is logged.
    pub async fn create_unique_index(&self, tag: u32) -> bool {
        match self
            .store
            .create_unique_index(&self.name, &tag.to_string())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!(
                    collection = %self.name,
                    backend = self.store.name(),
                    error = %err,
                    "unique index declaration failed"
                );
                false
            }
        }
    }

    /// Succeeds iff a document with this id exists in `domain`.
    ///
    /// A malformed `id` is `InvalidArgument` before any backend access; an
    /// id that exists under a different domain is `NotFound`.
    pub async fn contains(&self, id: &str, domain: &Domain) -> Result<()> {
        let filter = id_and_domain_filter(id, domain)?;
        self.contains_matching(filter).await
    }

    /// Succeeds iff at least one document matches `filter`.
    ///
    /// The filter is taken as-is: callers scope it to a domain themselves.
    /// Used for existence checks keyed by arbitrary fields, such as
    /// cross-references.
    pub async fn contains_matching(&self, filter: Document) -> Result<()> {
        let domain = filter_domain(&filter);
        let count = self
            .store
            .count(&self.name, filter)
            .await
            .map_err(|err| self.store_failure("count", &domain, err))?;
        if count > 0 {
            Ok(())
        } else {
            Err(Error::not_found("no such resource"))
        }
    }

    /// Fetches and decodes the document with this id in `domain`.
    pub async fn get(&self, id: &str, domain: &Domain) -> Result<R> {
        let filter = id_and_domain_filter(id, domain)?;
        self.get_matching(filter).await
    }

    /// Fetches and decodes the first document matching `filter`.
    ///
    /// The filter is taken as-is; callers scope it to a domain themselves.
    pub async fn get_matching(&self, filter: Document) -> Result<R> {
        self.get_matching_with_id(filter)
            .await
            .map(|(_, record)| record)
    }

    /// Fetches and decodes the first document matching `filter`, returning
    /// its identifier alongside the record.
    ///
    /// For callers that locate a document by field filter and still need its
    /// identifier, which lives under `_id` and is not part of the record.
    pub async fn get_matching_with_id(&self, filter: Document) -> Result<(String, R)> {
        let domain = filter_domain(&filter);
        let found = self
            .store
            .find_one(&self.name, filter)
            .await
            .map_err(|err| self.store_failure("find", &domain, err))?;
        self.decode_found(found, &domain)
    }

    /// Fetches and decodes the most recently created document matching
    /// `filter`, returning its identifier alongside the record.
    pub async fn get_latest_matching(&self, filter: Document) -> Result<(String, R)> {
        let domain = filter_domain(&filter);
        let found = self
            .store
            .find_latest(&self.name, filter)
            .await
            .map_err(|err| self.store_failure("find", &domain, err))?;
        self.decode_found(found, &domain)
    }

    /// Decodes a fetched document and extracts its identifier. A stored
    /// document that no longer decodes is reported as `Internal`: this
    /// collection is the only writer, so a mismatch means the backend holds
    /// something it should not.
    fn decode_found(&self, found: Option<Document>, domain: &str) -> Result<(String, R)> {
        let Some(document) = found else {
            return Err(Error::not_found("no such resource"));
        };
        let id = oid::document_id(&document).inspect_err(|err| {
            error!(
                collection = %self.name,
                backend = self.store.name(),
                domain = %domain,
                error = %err,
                "stored document has no usable id"
            );
        })?;
        let record = codec::document_to_record(&document).map_err(|err| {
            error!(
                collection = %self.name,
                backend = self.store.name(),
                domain = %domain,
                error = %err,
                "stored document failed to decode"
            );
            Error::internal("stored document failed to decode")
        })?;
        Ok((id, record))
    }

    /// Encodes `record`, stamps `domain`, and inserts a new document.
    ///
    /// Returns the backend-generated identifier in canonical form. Callers
    /// typically re-fetch to observe generated fields. A violated unique
    /// index is `InvalidArgument("unique key collision")`.
    pub async fn create(&self, domain: &Domain, record: &R) -> Result<String> {
        let mut document = Document::new();
        document.insert(DOMAIN_KEY, domain.as_str());
        for (key, value) in codec::record_to_document(record)? {
            document.insert(key, value);
        }

        let id = self
            .store
            .insert_one(&self.name, document)
            .await
            .map_err(|err| self.store_failure("insert", domain.as_str(), err))?;
        Ok(id.to_hex())
    }

    /// Applies `record` as a merge patch to the document with this id in
    /// `domain`.
    ///
    /// Only present fields are written; everything else keeps its stored
    /// value. No matching document is `NotFound`; a patch that matches but
    /// changes nothing is still `Ok`.
    pub async fn update(&self, id: &str, domain: &Domain, record: &R) -> Result<()> {
        let filter = id_and_domain_filter(id, domain)?;
        let patch = codec::record_to_document(record)?;
        let outcome = self
            .store
            .update_one(&self.name, filter, patch)
            .await
            .map_err(|err| self.store_failure("update", domain.as_str(), err))?;
        if outcome.matched == 0 {
            return Err(Error::not_found("no such resource"));
        }
        Ok(())
    }

    /// Deletes the document with this id in `domain`.
    pub async fn delete(&self, id: &str, domain: &Domain) -> Result<()> {
        let filter = id_and_domain_filter(id, domain)?;
        let deleted = self
            .store
            .delete_one(&self.name, filter)
            .await
            .map_err(|err| self.store_failure("delete", domain.as_str(), err))?;
        if deleted == 0 {
            return Err(Error::not_found("no such resource"));
        }
        Ok(())
    }

    /// Translates a backend failure into the public algebra. Duplicate keys
    /// are a caller error; everything else is logged and reported internal.
    fn store_failure(&self, operation: &'static str, domain: &str, err: StoreError) -> Error {
        match err {
            StoreError::DuplicateKey { .. } => Error::invalid_argument("unique key collision"),
            err => {
                error!(
                    collection = %self.name,
                    backend = self.store.name(),
                    domain = %domain,
                    error = %err,
                    "{} round-trip failed",
                    operation
                );
                Error::internal(format!("{operation} round-trip failed"))
            }
        }
    }
}

fn id_and_domain_filter(id: &str, domain: &Domain) -> Result<Document> {
    let id = oid::parse(id)?;
    let mut filter = Document::new();
    filter.insert(ID_KEY, id);
    filter.insert(DOMAIN_KEY, domain.as_str());
    Ok(filter)
}

/// Domain label for diagnostics, read back out of a caller-built filter.
fn filter_domain(filter: &Document) -> String {
    filter.get_str(DOMAIN_KEY).unwrap_or("").to_string()
}
