//! Merging of extracted document fields into one fiscal profile.
//!
//! Documents arrive from the extraction layer as loosely named field maps.
//! Names are normalised and resolved through a fixed alias table, stored
//! documents are re-validated against their type's schema, and the
//! consolidator merges everything by precedence (user override, then the
//! most recently ingested document, then earlier documents, then defaults).

mod aliases;
mod consolidator;
mod documents;

pub use aliases::{canonical_field_name, fields};
pub use consolidator::{Consolidation, Consolidator, MissingField};
pub use documents::{
    DocumentSchema, DocumentType, ExtractedFieldSet, FieldKind, FieldSpec, FieldValue,
    MAX_AMOUNT, SchemaRegistry, StoredFieldSet,
};
