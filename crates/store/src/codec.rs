//! Record ↔ document codec.
//!
//! Encoding walks the record's field table in order and writes one document
//! entry per present field, keyed by the field's decimal tag. Absent fields
//! produce no key at all, which is what lets an encoded record double as a
//! merge patch. Decoding is the inverse: it starts from a default record and
//! only touches fields whose tag appears in the document, so
//! `document_to_record(record_to_document(r)) == r` including absence.
//!
//! Stored representations are canonical: Float widens to double, UInt32
//! widens to int64, UInt64 narrows to int64 (a permanent one-bit range
//! reduction), Enum stores its numeric value as int32. Decoding accepts
//! exactly these representations; a mismatched stored kind is an
//! `InvalidArgument`, never a coercion.

use bson::{Bson, Document};

use crate::error::{Error, Result};
use crate::schema::{Field, FieldAccess, ListAccess, NestedRecord, Record, ScalarAccess};

/// Encodes `record` as a document keyed by decimal field tags.
///
/// Absent fields (unset options, empty lists) are skipped entirely. Any
/// failure aborts the whole encode; no partial document escapes.
pub fn record_to_document<R: Record>(record: &R) -> Result<Document> {
    let mut document = Document::new();
    for field in R::schema() {
        encode_field(record, field, &mut document)?;
    }
    Ok(document)
}

/// Decodes a document into a fresh record.
///
/// Fields whose tag the document does not mention stay at their defaults;
/// document keys that match no schema tag are ignored. Repeated fields
/// preserve document order.
pub fn document_to_record<R: Record>(document: &Document) -> Result<R> {
    let mut record = R::default();
    decode_into(&mut record, document)?;
    Ok(record)
}

impl<R: Record> NestedRecord for R {
    fn to_document(&self) -> Result<Document> {
        record_to_document(self)
    }

    fn decode_from(&mut self, document: &Document) -> Result<()> {
        decode_into(self, document)
    }
}

fn encode_field<R: Record>(record: &R, field: &Field<R>, out: &mut Document) -> Result<()> {
    let key = field.tag.to_string();
    match &field.access {
        FieldAccess::Scalar(scalar) => {
            if let Some(value) = encode_scalar(record, scalar) {
                out.insert(key, value);
            }
        }
        FieldAccess::Repeated(list) => {
            let elements = encode_list(record, list);
            if !elements.is_empty() {
                out.insert(key, Bson::Array(elements));
            }
        }
        FieldAccess::Nested { get, .. } => {
            if let Some(nested) = get(record) {
                out.insert(key, Bson::Document(nested.to_document()?));
            }
        }
        FieldAccess::RepeatedNested { get, .. } => {
            let nested = get(record);
            if !nested.is_empty() {
                let mut elements = Vec::with_capacity(nested.len());
                for item in nested {
                    elements.push(Bson::Document(item.to_document()?));
                }
                out.insert(key, Bson::Array(elements));
            }
        }
    }
    Ok(())
}

fn encode_scalar<R>(record: &R, access: &ScalarAccess<R>) -> Option<Bson> {
    match access {
        ScalarAccess::Float { get, .. } => get(record).map(|v| Bson::Double(f64::from(v))),
        ScalarAccess::Double { get, .. } => get(record).map(Bson::Double),
        ScalarAccess::Bool { get, .. } => get(record).map(Bson::Boolean),
        ScalarAccess::Int32 { get, .. } => get(record).map(Bson::Int32),
        ScalarAccess::Int64 { get, .. } => get(record).map(Bson::Int64),
        ScalarAccess::UInt32 { get, .. } => get(record).map(|v| Bson::Int64(i64::from(v))),
        // The cast is the documented narrowing: values above i64::MAX come
        // back through the sign bit, and the format accepts that.
        ScalarAccess::UInt64 { get, .. } => get(record).map(|v| Bson::Int64(v as i64)),
        ScalarAccess::Enum { get, .. } => get(record).map(Bson::Int32),
        ScalarAccess::String { get, .. } => get(record).map(|v| Bson::String(v.to_string())),
    }
}

fn encode_list<R>(record: &R, access: &ListAccess<R>) -> Vec<Bson> {
    match access {
        ListAccess::Float { get, .. } => get(record)
            .iter()
            .map(|v| Bson::Double(f64::from(*v)))
            .collect(),
        ListAccess::Double { get, .. } => get(record).iter().map(|v| Bson::Double(*v)).collect(),
        ListAccess::Bool { get, .. } => get(record).iter().map(|v| Bson::Boolean(*v)).collect(),
        ListAccess::Int32 { get, .. } => get(record).iter().map(|v| Bson::Int32(*v)).collect(),
        ListAccess::Int64 { get, .. } => get(record).iter().map(|v| Bson::Int64(*v)).collect(),
        ListAccess::UInt32 { get, .. } => get(record)
            .iter()
            .map(|v| Bson::Int64(i64::from(*v)))
            .collect(),
        ListAccess::UInt64 { get, .. } => get(record)
            .iter()
            .map(|v| Bson::Int64(*v as i64))
            .collect(),
        ListAccess::Enum { get, .. } => get(record).iter().map(|v| Bson::Int32(*v)).collect(),
        ListAccess::String { get, .. } => get(record)
            .iter()
            .map(|v| Bson::String(v.clone()))
            .collect(),
    }
}

fn decode_into<R: Record>(record: &mut R, document: &Document) -> Result<()> {
    // The one reset: fields the document does not mention end up default.
    *record = R::default();
    for field in R::schema() {
        let key = field.tag.to_string();
        let Some(value) = document.get(&key) else {
            continue;
        };
        decode_field(record, field, value)?;
    }
    Ok(())
}

fn decode_field<R: Record>(record: &mut R, field: &Field<R>, value: &Bson) -> Result<()> {
    match &field.access {
        FieldAccess::Scalar(scalar) => decode_scalar(record, field, scalar, value),
        FieldAccess::Repeated(list) => {
            let Bson::Array(elements) = value else {
                return Err(mismatch::<R>(field, field.access.expects(), value));
            };
            for element in elements {
                decode_list_element(record, field, list, element)?;
            }
            Ok(())
        }
        FieldAccess::Nested { ensure, .. } => {
            let Bson::Document(sub) = value else {
                return Err(mismatch::<R>(field, field.access.expects(), value));
            };
            ensure(record).decode_from(sub)
        }
        FieldAccess::RepeatedNested { push, .. } => {
            let Bson::Array(elements) = value else {
                return Err(mismatch::<R>(field, field.access.expects(), value));
            };
            for element in elements {
                let Bson::Document(sub) = element else {
                    return Err(mismatch::<R>(field, "document", element));
                };
                push(record).decode_from(sub)?;
            }
            Ok(())
        }
    }
}

fn decode_scalar<R: Record>(
    record: &mut R,
    field: &Field<R>,
    access: &ScalarAccess<R>,
    value: &Bson,
) -> Result<()> {
    match (access, value) {
        (ScalarAccess::Float { set, .. }, Bson::Double(v)) => set(record, *v as f32),
        (ScalarAccess::Double { set, .. }, Bson::Double(v)) => set(record, *v),
        (ScalarAccess::Bool { set, .. }, Bson::Boolean(v)) => set(record, *v),
        (ScalarAccess::Int32 { set, .. }, Bson::Int32(v)) => set(record, *v),
        (ScalarAccess::Int64 { set, .. }, Bson::Int64(v)) => set(record, *v),
        (ScalarAccess::UInt32 { set, .. }, Bson::Int64(v)) => set(record, *v as u32),
        (ScalarAccess::UInt64 { set, .. }, Bson::Int64(v)) => set(record, *v as u64),
        (ScalarAccess::Enum { set, .. }, Bson::Int32(v)) => set(record, *v),
        (ScalarAccess::String { set, .. }, Bson::String(v)) => set(record, v.clone()),
        (access, value) => return Err(mismatch::<R>(field, access.expects(), value)),
    }
    Ok(())
}

fn decode_list_element<R: Record>(
    record: &mut R,
    field: &Field<R>,
    access: &ListAccess<R>,
    value: &Bson,
) -> Result<()> {
    match (access, value) {
        (ListAccess::Float { push, .. }, Bson::Double(v)) => push(record, *v as f32),
        (ListAccess::Double { push, .. }, Bson::Double(v)) => push(record, *v),
        (ListAccess::Bool { push, .. }, Bson::Boolean(v)) => push(record, *v),
        (ListAccess::Int32 { push, .. }, Bson::Int32(v)) => push(record, *v),
        (ListAccess::Int64 { push, .. }, Bson::Int64(v)) => push(record, *v),
        (ListAccess::UInt32 { push, .. }, Bson::Int64(v)) => push(record, *v as u32),
        (ListAccess::UInt64 { push, .. }, Bson::Int64(v)) => push(record, *v as u64),
        (ListAccess::Enum { push, .. }, Bson::Int32(v)) => push(record, *v),
        (ListAccess::String { push, .. }, Bson::String(v)) => push(record, v.clone()),
        (access, value) => return Err(mismatch::<R>(field, access.element_expects(), value)),
    }
    Ok(())
}

fn mismatch<R: Record>(field: &Field<R>, expected: &'static str, found: &Bson) -> Error {
    Error::invalid_argument(format!(
        "type mismatch for {}.{}: expected {}, found {}",
        R::NAME,
        field.name,
        expected,
        stored_type_name(found),
    ))
}

fn stored_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "boolean",
        Bson::Int32(_) => "int32",
        Bson::Int64(_) => "int64",
        Bson::Null => "null",
        Bson::ObjectId(_) => "objectid",
        _ => "unsupported",
    }
}
