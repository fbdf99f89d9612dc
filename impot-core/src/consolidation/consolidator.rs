use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::aliases::{canonical_field_name, fields};
use super::documents::{
    DocumentType, ExtractedFieldSet, FieldValue, SchemaRegistry, StoredFieldSet, check_count,
    check_nb_parts, check_non_negative, require_amount, require_text,
};
use crate::error::ValidationError;
use crate::models::{CalculationInput, FieldSource, FiscalProfile, Regime, SituationFamiliale};

type AmountSlot = fn(&mut FiscalProfile) -> &mut Decimal;

/// Amount fields that fall back to zero when nothing supplies them, with
/// the profile slot each one fills.
const ZERO_DEFAULT_AMOUNTS: [(&str, AmountSlot); 9] = [
    (fields::SALARY, |p| &mut p.salary),
    (fields::PROFESSIONAL_GROSS, |p| &mut p.professional_gross),
    (fields::RENTAL_INCOME, |p| &mut p.rental_income),
    (fields::CAPITAL_INCOME, |p| &mut p.capital_income),
    (fields::DEDUCTIBLE_EXPENSES, |p| &mut p.deductible_expenses),
    (fields::PER_CONTRIBUTIONS, |p| &mut p.per_contributions),
    (fields::URSSAF_PAID, |p| &mut p.urssaf_paid),
    (fields::PAS_WITHHELD, |p| &mut p.pas_withheld),
    (fields::TAX_REDUCTIONS, |p| &mut p.tax_reductions),
];

/// A field the calculators can do without but that a complete file should
/// provide, with the document it is normally read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingField {
    pub field: String,
    pub expected_document: DocumentType,
}

impl MissingField {
    fn new(
        field: &str,
        expected_document: DocumentType,
    ) -> Self {
        Self {
            field: field.to_string(),
            expected_document,
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "Champ « {} » non renseigné : document attendu {}.",
            self.field, self.expected_document
        )
    }
}

/// Output of a successful consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Consolidation {
    pub profile: FiscalProfile,
    pub diagnostics: Vec<MissingField>,
}

impl Consolidation {
    /// Consolidates a profile with no diagnostics attached.
    pub fn from_profile(profile: FiscalProfile) -> Self {
        Self {
            profile,
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics rendered as result warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

/// Merges extracted documents and user overrides into one [`FiscalProfile`].
///
/// Documents are kept in ingestion order. When a field is resolved the
/// user override wins, then the most recently ingested document carrying
/// the field, then the regime default.
#[derive(Debug, Clone, Default)]
pub struct Consolidator {
    documents: Vec<ExtractedFieldSet>,
    overrides: BTreeMap<String, FieldValue>,
}

impl Consolidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly extracted document.
    pub fn ingest(
        &mut self,
        document: ExtractedFieldSet,
    ) {
        debug!(
            document_type = %document.document_type,
            position = self.documents.len(),
            fields = document.fields.len(),
            "document ingested"
        );
        self.documents.push(document);
    }

    /// Adds a document read back from storage after re-validating it.
    ///
    /// # Errors
    ///
    /// Whatever [`StoredFieldSet::decode`] rejects; nothing is ingested then.
    pub fn ingest_stored(
        &mut self,
        stored: StoredFieldSet,
        registry: &SchemaRegistry,
    ) -> Result<(), ValidationError> {
        let document = stored.decode(registry)?;
        self.ingest(document);
        Ok(())
    }

    /// Records a user-supplied value. The name goes through alias resolution.
    pub fn override_field(
        &mut self,
        name: &str,
        value: FieldValue,
    ) {
        let field = canonical_field_name(name);
        debug!(%field, %value, "user override");
        self.overrides.insert(field, value);
    }

    /// Records every value of a wire request as a user override.
    pub fn apply_input(
        &mut self,
        input: &CalculationInput,
    ) {
        for (field, value) in input.overrides() {
            self.override_field(field, value);
        }
    }

    pub fn documents(&self) -> &[ExtractedFieldSet] {
        &self.documents
    }

    /// Produces the fiscal profile.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingField`] when `nb_parts` or `regime` is
    ///   supplied by nobody
    /// - [`ValidationError::UnknownRegime`] for an unsupported regime id
    /// - [`ValidationError::InvalidField`] for any unusable value
    /// - [`ValidationError::DerivationFailed`] under a réel regime when
    ///   neither `benefice_net` nor `professional_gross` is supplied
    pub fn consolidate(&self) -> Result<Consolidation, ValidationError> {
        let mut provenance = BTreeMap::new();

        let (value, source) = self
            .resolve(fields::REGIME)
            .ok_or_else(|| ValidationError::missing(fields::REGIME))?;
        let regime = Regime::from_str(require_text(fields::REGIME, value)?)?;
        provenance.insert(fields::REGIME.to_string(), source);

        let (value, source) = self
            .resolve(fields::NB_PARTS)
            .ok_or_else(|| ValidationError::missing(fields::NB_PARTS))?;
        let nb_parts = require_amount(fields::NB_PARTS, value)?;
        check_nb_parts(nb_parts)?;
        provenance.insert(fields::NB_PARTS.to_string(), source);

        let mut profile = FiscalProfile::new(nb_parts, regime);

        if let Some((value, source)) = self.resolve(fields::SITUATION_FAMILIALE) {
            let text = require_text(fields::SITUATION_FAMILIALE, value)?;
            let situation = SituationFamiliale::parse(text).ok_or_else(|| {
                ValidationError::invalid(
                    fields::SITUATION_FAMILIALE,
                    text,
                    "unknown family situation",
                )
            })?;
            profile.situation_familiale = Some(situation);
            provenance.insert(fields::SITUATION_FAMILIALE.to_string(), source);
        }

        let (children, source) = match self.resolve(fields::ENFANTS_A_CHARGE) {
            Some((value, source)) => {
                let amount = require_amount(fields::ENFANTS_A_CHARGE, value)?;
                (check_count(fields::ENFANTS_A_CHARGE, amount)?, source)
            }
            None => (0, FieldSource::Default),
        };
        profile.enfants_a_charge = children;
        provenance.insert(fields::ENFANTS_A_CHARGE.to_string(), source);

        for (field, slot) in ZERO_DEFAULT_AMOUNTS {
            let (amount, source) = match self.resolve(field) {
                Some((value, source)) => {
                    let amount = require_amount(field, value)?;
                    check_non_negative(field, amount)?;
                    (amount, source)
                }
                None => (Decimal::ZERO, FieldSource::Default),
            };
            *slot(&mut profile) = amount;
            provenance.insert(field.to_string(), source);
        }

        let (declared_ca, source) = match self.resolve(fields::URSSAF_DECLARED_CA) {
            Some((value, source)) => {
                let amount = require_amount(fields::URSSAF_DECLARED_CA, value)?;
                check_non_negative(fields::URSSAF_DECLARED_CA, amount)?;
                (amount, source)
            }
            None => (profile.professional_gross, FieldSource::Derived),
        };
        profile.urssaf_declared_ca = declared_ca;
        provenance.insert(fields::URSSAF_DECLARED_CA.to_string(), source);

        match self.resolve(fields::BENEFICE_NET) {
            Some((value, source)) => {
                profile.benefice_net = Some(require_amount(fields::BENEFICE_NET, value)?);
                provenance.insert(fields::BENEFICE_NET.to_string(), source);
            }
            None if regime.is_reel() => {
                if is_defaulted(&provenance, fields::PROFESSIONAL_GROSS) {
                    return Err(ValidationError::DerivationFailed {
                        field: fields::BENEFICE_NET.to_string(),
                        missing: fields::PROFESSIONAL_GROSS.to_string(),
                    });
                }
                let derived = profile.professional_gross - profile.deductible_expenses;
                debug!(%derived, "benefice_net derived from turnover and expenses");
                profile.benefice_net = Some(derived);
                provenance.insert(fields::BENEFICE_NET.to_string(), FieldSource::Derived);
            }
            None => {}
        }

        profile.provenance = provenance;
        let diagnostics = diagnostics(&profile);
        debug!(
            %regime,
            %nb_parts,
            missing = diagnostics.len(),
            "profile consolidated"
        );

        Ok(Consolidation {
            profile,
            diagnostics,
        })
    }

    /// The winning value for `field` and where it came from.
    fn resolve(
        &self,
        field: &str,
    ) -> Option<(&FieldValue, FieldSource)> {
        if let Some(value) = self.overrides.get(field) {
            return Some((value, FieldSource::Override));
        }
        self.documents
            .iter()
            .enumerate()
            .rev()
            .find_map(|(position, document)| {
                document.get(field).map(|value| {
                    let source = FieldSource::Document {
                        document_type: document.document_type,
                        position,
                    };
                    (value, source)
                })
            })
    }
}

fn is_defaulted(
    provenance: &BTreeMap<String, FieldSource>,
    field: &str,
) -> bool {
    matches!(
        provenance.get(field),
        None | Some(FieldSource::Default) | Some(FieldSource::Derived)
    )
}

/// Fields a complete file for the profile's regime should carry.
fn required_fields(profile: &FiscalProfile) -> Vec<(&'static str, DocumentType)> {
    let mut required = vec![
        (fields::PROFESSIONAL_GROSS, DocumentType::DeclarationRevenus),
        (fields::SITUATION_FAMILIALE, DocumentType::AvisImposition),
        (fields::URSSAF_DECLARED_CA, DocumentType::AttestationUrssaf),
        (fields::URSSAF_PAID, DocumentType::AttestationUrssaf),
    ];
    let explicit_profit = matches!(
        profile.source_of(fields::BENEFICE_NET),
        Some(FieldSource::Override) | Some(FieldSource::Document { .. })
    );
    if profile.regime.is_reel() && !explicit_profit {
        required.push((fields::DEDUCTIBLE_EXPENSES, DocumentType::DeclarationResultats));
    }
    required
}

fn diagnostics(profile: &FiscalProfile) -> Vec<MissingField> {
    required_fields(profile)
        .into_iter()
        .filter(|(field, _)| is_defaulted(&profile.provenance, field))
        .map(|(field, document)| MissingField::new(field, document))
        .collect()
}
