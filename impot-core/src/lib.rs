pub mod calculations;
pub mod consolidation;
pub mod error;
pub mod models;
pub mod rules;

mod text;

#[cfg(test)]
pub(crate) mod test_support;

pub use calculations::{TaxEngine, calculate_input};
pub use consolidation::{
    Consolidation, Consolidator, DocumentType, ExtractedFieldSet, FieldValue, MissingField,
    SchemaRegistry, StoredFieldSet,
};
pub use error::{EngineError, RuleTableError, ValidationError};
pub use models::*;
pub use rules::{RuleTableSource, RuleTableStore};
