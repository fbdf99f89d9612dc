use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::consolidation::DocumentType;
use crate::models::{Regime, SituationFamiliale};

/// Where the consolidated value of a profile field came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSource {
    /// Supplied explicitly by the user.
    Override,
    /// Read from the document ingested at `position` (0-based ingestion order).
    Document {
        document_type: DocumentType,
        position: usize,
    },
    /// Regime-appropriate default, nothing supplied it.
    Default,
    /// Computed from other fields.
    Derived,
}

/// The consolidated view of one taxpayer for one tax year.
///
/// Built by the consolidator and read-only afterwards; the calculators only
/// ever borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalProfile {
    pub nb_parts: Decimal,
    pub situation_familiale: Option<SituationFamiliale>,
    pub enfants_a_charge: u32,

    // Income components
    pub salary: Decimal,
    pub professional_gross: Decimal,
    pub rental_income: Decimal,
    pub capital_income: Decimal,
    pub deductible_expenses: Decimal,

    pub per_contributions: Decimal,
    pub regime: Regime,

    // Social contributions
    pub urssaf_declared_ca: Decimal,
    pub urssaf_paid: Decimal,

    /// Professional profit. Always `Some` under a réel regime once
    /// consolidated; user-supplied values take precedence over derivation.
    pub benefice_net: Option<Decimal>,

    /// Tax already withheld at source during the year.
    pub pas_withheld: Decimal,
    /// Tax reductions and credits already granted.
    pub tax_reductions: Decimal,

    #[serde(default)]
    pub provenance: BTreeMap<String, FieldSource>,
}

impl FiscalProfile {
    /// A profile with every amount at zero and no family details.
    pub fn new(
        nb_parts: Decimal,
        regime: Regime,
    ) -> Self {
        Self {
            nb_parts,
            situation_familiale: None,
            enfants_a_charge: 0,
            salary: Decimal::ZERO,
            professional_gross: Decimal::ZERO,
            rental_income: Decimal::ZERO,
            capital_income: Decimal::ZERO,
            deductible_expenses: Decimal::ZERO,
            per_contributions: Decimal::ZERO,
            regime,
            urssaf_declared_ca: Decimal::ZERO,
            urssaf_paid: Decimal::ZERO,
            benefice_net: None,
            pas_withheld: Decimal::ZERO,
            tax_reductions: Decimal::ZERO,
            provenance: BTreeMap::new(),
        }
    }

    pub fn source_of(
        &self,
        field: &str,
    ) -> Option<&FieldSource> {
        self.provenance.get(field)
    }

    /// Profit taxed under a réel regime: the explicit `benefice_net` when
    /// present, otherwise turnover minus deductible expenses.
    pub fn reel_profit(&self) -> Decimal {
        self.benefice_net
            .unwrap_or(self.professional_gross - self.deductible_expenses)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn new_profile_is_empty() {
        let profile = FiscalProfile::new(dec!(1), Regime::MicroBnc);

        assert_eq!(profile.professional_gross, dec!(0));
        assert_eq!(profile.benefice_net, None);
        assert!(profile.provenance.is_empty());
    }

    #[test]
    fn reel_profit_prefers_explicit_value() {
        let mut profile = FiscalProfile::new(dec!(1), Regime::ReelBnc);
        profile.professional_gross = dec!(50000);
        profile.deductible_expenses = dec!(20000);
        profile.benefice_net = Some(dec!(35000));

        assert_eq!(profile.reel_profit(), dec!(35000));
    }

    #[test]
    fn reel_profit_derives_when_absent() {
        let mut profile = FiscalProfile::new(dec!(1), Regime::MicroBnc);
        profile.professional_gross = dec!(50000);
        profile.deductible_expenses = dec!(20000);

        assert_eq!(profile.reel_profit(), dec!(30000));
    }

    #[test]
    fn field_source_serializes_with_kind_tag() {
        let source = FieldSource::Document {
            document_type: DocumentType::AttestationUrssaf,
            position: 2,
        };

        let json = serde_json::to_value(&source).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "kind": "document",
                "document_type": "attestation_urssaf",
                "position": 2
            })
        );
    }
}
