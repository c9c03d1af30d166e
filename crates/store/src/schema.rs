//! Static field schemas for storable record types.
//!
//! A record type describes itself through an ordered, compile-time table of
//! [`Field`] entries: one numeric tag, one name (diagnostics only), and a
//! pair of fn-pointer accessors per field. The codec walks this table to
//! encode and decode; nothing else about the type is inspected at runtime.
//!
//! Tags are the persisted key space. They must be unique within a record
//! type and stable across releases — renaming a Rust field is free, renaming
//! a tag is a data migration.
//!
//! # Declaring a record
//!
//! ```
//! use trellis_store::schema::{Field, FieldAccess, Record, ScalarAccess};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Probe {
//!     label: Option<String>,
//!     channel: Option<u32>,
//! }
//!
//! static PROBE_SCHEMA: [Field<Probe>; 2] = [
//!     Field {
//!         tag: 1,
//!         name: "label",
//!         access: FieldAccess::Scalar(ScalarAccess::String {
//!             get: |r: &Probe| r.label.as_deref(),
//!             set: |r: &mut Probe, v| r.label = Some(v),
//!         }),
//!     },
//!     Field {
//!         tag: 2,
//!         name: "channel",
//!         access: FieldAccess::Scalar(ScalarAccess::UInt32 {
//!             get: |r: &Probe| r.channel,
//!             set: |r: &mut Probe, v| r.channel = Some(v),
//!         }),
//!     },
//! ];
//!
//! impl Record for Probe {
//!     const NAME: &'static str = "Probe";
//!
//!     fn schema() -> &'static [Field<Self>] {
//!         &PROBE_SCHEMA
//!     }
//! }
//! ```

use bson::Document;

use crate::error::Result;

/// A storable record type with a static field schema.
///
/// Optional fields are `Option<T>` (`Some` = present, `None` = absent) and
/// repeated fields are `Vec<T>` (empty = absent). Absence is meaningful: the
/// codec never writes a key for an absent field, which is what makes
/// merge-patch updates leave untouched fields alone.
pub trait Record: Default + Send + Sync + 'static {
    /// Type name used in log messages and decode diagnostics.
    const NAME: &'static str;

    /// The ordered field table for this type.
    fn schema() -> &'static [Field<Self>];
}

/// One entry in a record's field table.
pub struct Field<R> {
    /// Stable numeric tag; the document key is its decimal string.
    pub tag: u32,
    /// Field name, used only in diagnostics — never persisted.
    pub name: &'static str,
    /// How the field is read from and written into the record.
    pub access: FieldAccess<R>,
}

/// Accessor pair for one field, by shape.
pub enum FieldAccess<R> {
    /// A single optional scalar value.
    Scalar(ScalarAccess<R>),
    /// An ordered list of scalar values.
    Repeated(ListAccess<R>),
    /// A single optional nested record, erased behind [`NestedRecord`].
    Nested {
        /// Borrows the nested record when present.
        get: fn(&R) -> Option<&dyn NestedRecord>,
        /// Creates the nested record if absent and borrows it mutably.
        ensure: fn(&mut R) -> &mut dyn NestedRecord,
    },
    /// An ordered list of nested records.
    RepeatedNested {
        /// Borrows every element in order.
        get: fn(&R) -> Vec<&dyn NestedRecord>,
        /// Appends a default element and borrows it mutably.
        push: fn(&mut R) -> &mut dyn NestedRecord,
    },
}

/// Accessors for a single optional scalar field.
///
/// Get returns `None` when the field is absent; set marks it present.
/// Unsigned kinds wider than the document's native signed range are stored
/// narrowed to signed 64-bit — a permanent format limitation, not a bug.
pub enum ScalarAccess<R> {
    /// 32-bit float, stored as a double.
    Float {
        get: fn(&R) -> Option<f32>,
        set: fn(&mut R, f32),
    },
    /// 64-bit float.
    Double {
        get: fn(&R) -> Option<f64>,
        set: fn(&mut R, f64),
    },
    /// Boolean.
    Bool {
        get: fn(&R) -> Option<bool>,
        set: fn(&mut R, bool),
    },
    /// Signed 32-bit integer.
    Int32 {
        get: fn(&R) -> Option<i32>,
        set: fn(&mut R, i32),
    },
    /// Signed 64-bit integer.
    Int64 {
        get: fn(&R) -> Option<i64>,
        set: fn(&mut R, i64),
    },
    /// Unsigned 32-bit integer, stored widened as a signed 64-bit.
    UInt32 {
        get: fn(&R) -> Option<u32>,
        set: fn(&mut R, u32),
    },
    /// Unsigned 64-bit integer, stored narrowed as a signed 64-bit.
    UInt64 {
        get: fn(&R) -> Option<u64>,
        set: fn(&mut R, u64),
    },
    /// Enumeration, stored as its numeric value.
    Enum {
        get: fn(&R) -> Option<i32>,
        set: fn(&mut R, i32),
    },
    /// UTF-8 string.
    String {
        get: fn(&R) -> Option<&str>,
        set: fn(&mut R, String),
    },
}

/// Accessors for a repeated scalar field.
///
/// Get borrows the whole list; push appends one decoded element. Element
/// order is significant and preserved by the codec.
pub enum ListAccess<R> {
    /// Repeated 32-bit float.
    Float {
        get: fn(&R) -> &[f32],
        push: fn(&mut R, f32),
    },
    /// Repeated 64-bit float.
    Double {
        get: fn(&R) -> &[f64],
        push: fn(&mut R, f64),
    },
    /// Repeated boolean.
    Bool {
        get: fn(&R) -> &[bool],
        push: fn(&mut R, bool),
    },
    /// Repeated signed 32-bit integer.
    Int32 {
        get: fn(&R) -> &[i32],
        push: fn(&mut R, i32),
    },
    /// Repeated signed 64-bit integer.
    Int64 {
        get: fn(&R) -> &[i64],
        push: fn(&mut R, i64),
    },
    /// Repeated unsigned 32-bit integer.
    UInt32 {
        get: fn(&R) -> &[u32],
        push: fn(&mut R, u32),
    },
    /// Repeated unsigned 64-bit integer.
    UInt64 {
        get: fn(&R) -> &[u64],
        push: fn(&mut R, u64),
    },
    /// Repeated enumeration value.
    Enum {
        get: fn(&R) -> &[i32],
        push: fn(&mut R, i32),
    },
    /// Repeated UTF-8 string.
    String {
        get: fn(&R) -> &[String],
        push: fn(&mut R, String),
    },
}

impl<R> FieldAccess<R> {
    /// Name of the stored representation this field expects, for
    /// decode diagnostics.
    pub fn expects(&self) -> &'static str {
        match self {
            FieldAccess::Scalar(scalar) => scalar.expects(),
            FieldAccess::Repeated(_) | FieldAccess::RepeatedNested { .. } => "array",
            FieldAccess::Nested { .. } => "document",
        }
    }
}

impl<R> ScalarAccess<R> {
    /// Name of the stored representation this scalar expects.
    pub fn expects(&self) -> &'static str {
        match self {
            ScalarAccess::Float { .. } | ScalarAccess::Double { .. } => "double",
            ScalarAccess::Bool { .. } => "boolean",
            ScalarAccess::Int32 { .. } | ScalarAccess::Enum { .. } => "int32",
            ScalarAccess::Int64 { .. }
            | ScalarAccess::UInt32 { .. }
            | ScalarAccess::UInt64 { .. } => "int64",
            ScalarAccess::String { .. } => "string",
        }
    }
}

impl<R> ListAccess<R> {
    /// Name of the stored representation each element expects.
    pub fn element_expects(&self) -> &'static str {
        match self {
            ListAccess::Float { .. } | ListAccess::Double { .. } => "double",
            ListAccess::Bool { .. } => "boolean",
            ListAccess::Int32 { .. } | ListAccess::Enum { .. } => "int32",
            ListAccess::Int64 { .. } | ListAccess::UInt32 { .. } | ListAccess::UInt64 { .. } => {
                "int64"
            }
            ListAccess::String { .. } => "string",
        }
    }
}

/// Object-safe bridge through which the codec recurses into nested records
/// without naming their concrete type.
///
/// Blanket-implemented for every [`Record`] by the codec; field tables only
/// erase to it.
pub trait NestedRecord {
    /// Encodes this record as a document.
    fn to_document(&self) -> Result<Document>;

    /// Resets this record to default values, then decodes `document`
    /// into it.
    fn decode_from(&mut self, document: &Document) -> Result<()>;
}

/// Appends a default element to `list` and returns it.
///
/// Helper for `RepeatedNested` push accessors in field tables.
pub fn push_default<T: Default>(list: &mut Vec<T>) -> &mut T {
    let end = list.len();
    list.push(T::default());
    &mut list[end]
}

/// Returns the first tag that appears more than once in `R`'s schema.
///
/// Tag collisions silently corrupt stored data, so record test suites
/// assert this returns `None`.
pub fn duplicate_tag<R: Record>() -> Option<u32> {
    let schema = R::schema();
    for (i, field) in schema.iter().enumerate() {
        if schema[..i].iter().any(|other| other.tag == field.tag) {
            return Some(field.tag);
        }
    }
    None
}
