use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aliases::{canonical_field_name, fields};
use crate::error::ValidationError;
use crate::models::{Regime, SituationFamiliale};
use crate::text::normalize_key;

/// A single extracted value. Numbers (and numeric strings) are amounts,
/// anything else is kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Amount(Decimal),
    Text(String),
}

impl FieldValue {
    /// The value as an amount. Text is accepted when it reads as a number
    /// in French notation (`"28 000,50 €"`).
    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            Self::Amount(amount) => Some(*amount),
            Self::Text(text) => parse_amount(text),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Amount(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Amount(amount) => write!(f, "{amount}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<Decimal> for FieldValue {
    fn from(amount: Decimal) -> Self {
        Self::Amount(amount)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€' && *c != '\u{202f}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    Decimal::from_str(&cleaned).ok()
}

/// Source document types the extraction layer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Avis d'imposition (assessment notice).
    AvisImposition,
    /// Déclaration 2042 (annual income return).
    DeclarationRevenus,
    /// URSSAF statement of declared turnover and paid contributions.
    AttestationUrssaf,
    /// Déclaration 2035 / 2031 (professional profit declaration).
    DeclarationResultats,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        Self::AvisImposition,
        Self::DeclarationRevenus,
        Self::AttestationUrssaf,
        Self::DeclarationResultats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AvisImposition => "avis_imposition",
            Self::DeclarationRevenus => "declaration_revenus",
            Self::AttestationUrssaf => "attestation_urssaf",
            Self::DeclarationResultats => "declaration_resultats",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_key(s).as_str() {
            "avis_imposition" | "avis_d_imposition" | "avis" => Some(Self::AvisImposition),
            "declaration_revenus" | "declaration_2042" | "2042" => Some(Self::DeclarationRevenus),
            "attestation_urssaf" | "urssaf" => Some(Self::AttestationUrssaf),
            "declaration_resultats" | "declaration_2035" | "2035" | "declaration_2031"
            | "2031" => Some(Self::DeclarationResultats),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownDocumentType(s.to_string()))
    }
}

/// Shape a schema field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-negative amount in euros.
    Amount,
    /// Amount that may be negative (a deficit).
    SignedAmount,
    /// Quotient-familial parts: 0.5 to 10, in quarter steps.
    Parts,
    /// Non-negative whole number.
    Count,
    Regime,
    Situation,
}

impl FieldKind {
    /// Checks `value` against this kind, naming `field` on failure.
    pub fn check(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> Result<(), ValidationError> {
        match self {
            Self::Amount => {
                let amount = require_amount(field, value)?;
                check_non_negative(field, amount)
            }
            Self::SignedAmount => require_amount(field, value).map(|_| ()),
            Self::Parts => check_nb_parts(require_amount(field, value)?),
            Self::Count => check_count(field, require_amount(field, value)?).map(|_| ()),
            Self::Regime => {
                let text = require_text(field, value)?;
                Regime::from_str(text).map(|_| ())
            }
            Self::Situation => {
                let text = require_text(field, value)?;
                SituationFamiliale::parse(text)
                    .map(|_| ())
                    .ok_or_else(|| {
                        ValidationError::invalid(field, text, "unknown family situation")
                    })
            }
        }
    }
}

/// Largest magnitude accepted for any amount, in euros. Sums of every
/// income component stay far inside `Decimal` range below it.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Parses `value` as an amount no larger than [`MAX_AMOUNT`] in magnitude.
pub(crate) fn require_amount(
    field: &str,
    value: &FieldValue,
) -> Result<Decimal, ValidationError> {
    let amount = value
        .as_amount()
        .ok_or_else(|| ValidationError::invalid(field, value, "expected an amount"))?;
    if amount.abs() > MAX_AMOUNT {
        return Err(ValidationError::invalid(
            field,
            amount,
            "exceeds the largest accepted amount",
        ));
    }
    Ok(amount)
}

pub(crate) fn require_text<'v>(
    field: &str,
    value: &'v FieldValue,
) -> Result<&'v str, ValidationError> {
    value
        .as_text()
        .ok_or_else(|| ValidationError::invalid(field, value, "expected text"))
}

pub(crate) fn check_non_negative(
    field: &str,
    amount: Decimal,
) -> Result<(), ValidationError> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::invalid(field, amount, "must not be negative"));
    }
    Ok(())
}

pub(crate) fn check_count(
    field: &str,
    amount: Decimal,
) -> Result<u32, ValidationError> {
    check_non_negative(field, amount)?;
    if !amount.fract().is_zero() {
        return Err(ValidationError::invalid(field, amount, "must be a whole number"));
    }
    amount
        .to_u32()
        .ok_or_else(|| ValidationError::invalid(field, amount, "is out of range"))
}

/// Accepted `nb_parts`: 0.5 to 10 inclusive, by quarter parts.
pub(crate) fn check_nb_parts(nb_parts: Decimal) -> Result<(), ValidationError> {
    let min = Decimal::new(5, 1);
    let max = Decimal::TEN;
    if nb_parts < min || nb_parts > max {
        return Err(ValidationError::invalid(
            fields::NB_PARTS,
            nb_parts,
            "must be between 0.5 and 10",
        ));
    }
    if !(nb_parts * Decimal::from(4)).fract().is_zero() {
        return Err(ValidationError::invalid(
            fields::NB_PARTS,
            nb_parts,
            "must be a multiple of 0.25",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn spec(
    name: &'static str,
    kind: FieldKind,
) -> FieldSpec {
    FieldSpec { name, kind }
}

/// The fields a document type is expected to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSchema {
    pub document_type: DocumentType,
    pub fields: Vec<FieldSpec>,
}

impl DocumentSchema {
    pub fn field(
        &self,
        name: &str,
    ) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks every known field of `values`; fields outside the schema are
    /// left alone.
    pub fn validate(
        &self,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<(), ValidationError> {
        for (name, value) in values {
            match self.field(name) {
                Some(spec) => spec.kind.check(name, value)?,
                None => debug!(
                    document_type = %self.document_type,
                    field = %name,
                    "field outside schema passed through"
                ),
            }
        }
        Ok(())
    }

    fn builtin(document_type: DocumentType) -> Self {
        use FieldKind::*;

        let fields = match document_type {
            DocumentType::AvisImposition => vec![
                spec(fields::NB_PARTS, Parts),
                spec(fields::SITUATION_FAMILIALE, Situation),
                spec(fields::ENFANTS_A_CHARGE, Count),
                spec(fields::SALARY, Amount),
                spec(fields::PROFESSIONAL_GROSS, Amount),
                spec(fields::RENTAL_INCOME, Amount),
                spec(fields::CAPITAL_INCOME, Amount),
                spec(fields::PAS_WITHHELD, Amount),
                spec(fields::TAX_REDUCTIONS, Amount),
            ],
            DocumentType::DeclarationRevenus => vec![
                spec(fields::NB_PARTS, Parts),
                spec(fields::SITUATION_FAMILIALE, Situation),
                spec(fields::ENFANTS_A_CHARGE, Count),
                spec(fields::REGIME, Regime),
                spec(fields::SALARY, Amount),
                spec(fields::PROFESSIONAL_GROSS, Amount),
                spec(fields::RENTAL_INCOME, Amount),
                spec(fields::CAPITAL_INCOME, Amount),
                spec(fields::DEDUCTIBLE_EXPENSES, Amount),
                spec(fields::BENEFICE_NET, SignedAmount),
                spec(fields::PER_CONTRIBUTIONS, Amount),
                spec(fields::TAX_REDUCTIONS, Amount),
                spec(fields::PAS_WITHHELD, Amount),
            ],
            DocumentType::AttestationUrssaf => vec![
                spec(fields::REGIME, Regime),
                spec(fields::URSSAF_DECLARED_CA, Amount),
                spec(fields::URSSAF_PAID, Amount),
                spec(fields::URSSAF_EXPECTED, Amount),
            ],
            DocumentType::DeclarationResultats => vec![
                spec(fields::REGIME, Regime),
                spec(fields::PROFESSIONAL_GROSS, Amount),
                spec(fields::DEDUCTIBLE_EXPENSES, Amount),
                spec(fields::BENEFICE_NET, SignedAmount),
            ],
        };
        Self {
            document_type,
            fields,
        }
    }
}

/// Document type → schema mapping used to re-validate stored documents.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<DocumentType, DocumentSchema>,
}

impl SchemaRegistry {
    /// A registry with no schemas; every decode fails until one is registered.
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// The schemas of every built-in document type.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for document_type in DocumentType::ALL {
            registry.register(DocumentSchema::builtin(document_type));
        }
        registry
    }

    /// Adds a schema, replacing any previous one for the same type.
    pub fn register(
        &mut self,
        schema: DocumentSchema,
    ) {
        self.schemas.insert(schema.document_type, schema);
    }

    pub fn get(
        &self,
        document_type: DocumentType,
    ) -> Option<&DocumentSchema> {
        self.schemas.get(&document_type)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Fields extracted from one document, keyed by canonical name.
///
/// Only built through [`ExtractedFieldSet::new`] or
/// [`StoredFieldSet::decode`], so every key has been through alias
/// resolution. Serialized sets are read back as [`StoredFieldSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedFieldSet {
    pub document_type: DocumentType,
    pub fields: BTreeMap<String, FieldValue>,
}

impl ExtractedFieldSet {
    /// Builds a field set, resolving every name through the alias table.
    /// When two raw names resolve to the same field the later one wins.
    pub fn new<K, I>(
        document_type: DocumentType,
        raw_fields: I,
    ) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, FieldValue)>,
    {
        let fields = raw_fields
            .into_iter()
            .map(|(name, value)| (canonical_field_name(name.as_ref()), value))
            .collect();
        Self {
            document_type,
            fields,
        }
    }

    pub fn get(
        &self,
        field: &str,
    ) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Checks the fields against the schema registered for this type.
    pub fn validate(
        &self,
        registry: &SchemaRegistry,
    ) -> Result<(), ValidationError> {
        let schema = registry
            .get(self.document_type)
            .ok_or_else(|| ValidationError::UnknownDocumentType(self.document_type.to_string()))?;
        schema.validate(&self.fields)
    }
}

/// A field set as read back from storage: untrusted until decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFieldSet {
    pub document_type: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl StoredFieldSet {
    /// Re-validates the stored fields against the schema of their document
    /// type and returns them as a trusted field set.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownDocumentType`] when the type is unknown or
    /// has no registered schema, [`ValidationError::InvalidField`] naming
    /// the first field that no longer satisfies the schema.
    pub fn decode(
        self,
        registry: &SchemaRegistry,
    ) -> Result<ExtractedFieldSet, ValidationError> {
        let document_type = DocumentType::from_str(&self.document_type)?;
        let set = ExtractedFieldSet::new(document_type, self.fields);
        set.validate(registry)?;
        Ok(set)
    }
}
