//! Identifier validation and extraction.
//!
//! Document primary keys are 12-byte object identifiers, canonically written
//! as 24 lowercase hex characters. Every collection entry point that takes
//! an identifier runs it through [`parse`] before building a filter, so a
//! malformed identifier is rejected as `InvalidArgument` without ever
//! reaching the backend — it must never surface as a generic not-found.

use bson::Bson;
use bson::Document;
use bson::oid::ObjectId;

use crate::error::{Error, Result};

/// Document key under which the primary identifier is stored.
pub const ID_KEY: &str = "_id";

/// Returns `true` iff `id` is a well-formed object identifier.
///
/// Well-formed means exactly 24 ASCII hex digits; both upper and lower case
/// are accepted on input, the canonical form is lowercase. The check is
/// allocation-free.
///
/// ```
/// use trellis_store::oid;
///
/// assert!(oid::is_valid("662a2b4a9bd1e5c3a0f0a1b2"));
/// assert!(oid::is_valid("662A2B4A9BD1E5C3A0F0A1B2"));
/// assert!(!oid::is_valid("not-an-oid"));
/// ```
pub fn is_valid(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validates `id` and parses it into an [`ObjectId`].
///
/// Fails with `InvalidArgument("invalid uid")` for anything [`is_valid`]
/// rejects.
pub fn parse(id: &str) -> Result<ObjectId> {
    if !is_valid(id) {
        return Err(Error::invalid_argument("invalid uid"));
    }
    ObjectId::parse_str(id).map_err(|_| Error::invalid_argument("invalid uid"))
}

/// Reads the primary identifier out of a stored document.
///
/// Returns the canonical 24-hex form. A stored document without a proper
/// `_id` indicates backend inconsistency and is reported as `Internal`.
pub fn document_id(document: &Document) -> Result<String> {
    match document.get(ID_KEY) {
        Some(Bson::ObjectId(id)) => Ok(id.to_hex()),
        _ => Err(Error::internal("stored document has no object id")),
    }
}
