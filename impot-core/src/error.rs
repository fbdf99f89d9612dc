//! Error types shared by the consolidator, the rule tables and the engine.

use rust_decimal::Decimal;
use thiserror::Error;

/// Input that cannot be turned into a trustworthy calculation request.
///
/// Every variant names the offending field or value so the API layer can
/// point the user at it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field the calculators cannot proceed without is absent.
    #[error("missing mandatory field '{field}'")]
    MissingField { field: String },

    /// The regime identifier is not one of the supported regimes.
    #[error("unsupported regime '{0}'")]
    UnknownRegime(String),

    /// A stored document claims a type no schema exists for.
    #[error("unknown document type '{0}'")]
    UnknownDocumentType(String),

    /// A field is present but its value is unusable.
    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidField {
        field: String,
        value: String,
        reason: String,
    },

    /// `field` had to be derived but one of its inputs is missing.
    #[error("cannot derive '{field}': '{missing}' is missing")]
    DerivationFailed { field: String, missing: String },
}

impl ValidationError {
    pub(crate) fn invalid(
        field: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }
}

/// Rule tables that are absent or internally inconsistent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleTableError {
    #[error("no rule tables available for tax year {0}")]
    UnknownTaxYear(i32),

    #[error("no tax brackets provided")]
    NoBrackets,

    #[error("bracket lower bounds must be strictly increasing, got {previous} then {next}")]
    UnorderedBrackets { previous: Decimal, next: Decimal },

    #[error("{what} must be between 0 and 1, got {rate}")]
    InvalidRate { what: String, rate: Decimal },

    #[error("{what} must be non-negative, got {amount}")]
    NegativeAmount { what: String, amount: Decimal },

    #[error("no definition for regime '{0}'")]
    MissingRegime(String),

    #[error("regime '{regime}' defined more than once")]
    DuplicateRegime { regime: String },

    #[error("regime '{regime}': {reason}")]
    InvalidAbattement { regime: String, reason: String },

    #[error("rule tables for {found} returned when {requested} was requested")]
    YearMismatch { requested: i32, found: i32 },

    #[error("rule table source failed: {0}")]
    Source(String),
}

/// Umbrella error returned by the calculation pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    RuleTable(#[from] RuleTableError),
}
