use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::consolidation::{FieldValue, fields};
use crate::models::{FiscalProfile, Regime, SituationFamiliale};

/// Fully resolved, tax-year scoped input to the calculators.
///
/// Built once from a consolidated profile and never mutated; the regime
/// comparator derives variants with [`TaxCalculationRequest::with_regime`]
/// so that every raw figure stays fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxCalculationRequest {
    pub tax_year: i32,
    pub nb_parts: Decimal,
    pub situation_familiale: Option<SituationFamiliale>,
    pub regime: Regime,
    pub professional_gross: Decimal,
    pub deductible_expenses: Decimal,
    /// Profit taxed under réel, explicit or derived.
    pub reel_profit: Decimal,
    pub salary: Decimal,
    pub rental_income: Decimal,
    pub capital_income: Decimal,
    pub per_contributions: Decimal,
    pub tax_reductions: Decimal,
    pub pas_withheld: Decimal,
    pub urssaf_declared_ca: Decimal,
    pub urssaf_paid: Decimal,
}

impl TaxCalculationRequest {
    pub fn from_profile(
        profile: &FiscalProfile,
        tax_year: i32,
    ) -> Self {
        Self {
            tax_year,
            nb_parts: profile.nb_parts,
            situation_familiale: profile.situation_familiale,
            regime: profile.regime,
            professional_gross: profile.professional_gross,
            deductible_expenses: profile.deductible_expenses,
            reel_profit: profile.reel_profit(),
            salary: profile.salary,
            rental_income: profile.rental_income,
            capital_income: profile.capital_income,
            per_contributions: profile.per_contributions,
            tax_reductions: profile.tax_reductions,
            pas_withheld: profile.pas_withheld,
            urssaf_declared_ca: profile.urssaf_declared_ca,
            urssaf_paid: profile.urssaf_paid,
        }
    }

    /// Same request evaluated under another regime.
    pub fn with_regime(
        &self,
        regime: Regime,
    ) -> Self {
        Self {
            regime,
            ..self.clone()
        }
    }

    /// Non-professional income added to the taxable base as is.
    pub fn other_income(&self) -> Decimal {
        self.salary + self.rental_income + self.capital_income
    }

    pub fn is_couple(&self) -> bool {
        self.situation_familiale
            .is_some_and(|s| s.is_couple())
    }

    /// Parts the household has before children, never more than declared.
    pub fn base_parts(&self) -> Decimal {
        self.situation_familiale
            .map_or(Decimal::ONE, |s| s.base_parts())
            .min(self.nb_parts)
    }
}

/// `person` block of the JSON calculation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonInput {
    pub nb_parts: Option<Decimal>,
    /// Regime id, e.g. `micro_bnc`.
    pub status: Option<String>,
    #[serde(alias = "situation")]
    pub situation_familiale: Option<String>,
    pub enfants_a_charge: Option<u32>,
}

/// `income` block of the JSON calculation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeInput {
    pub professional_gross: Option<Decimal>,
    pub deductible_expenses: Option<Decimal>,
    pub benefice_net: Option<Decimal>,
    pub salary: Option<Decimal>,
    pub rental_income: Option<Decimal>,
    pub capital_income: Option<Decimal>,
}

/// `deductions` block of the JSON calculation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionsInput {
    pub per_contributions: Option<Decimal>,
    pub tax_reductions: Option<Decimal>,
}

/// `social` block of the JSON calculation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialInput {
    pub urssaf_declared_ca: Option<Decimal>,
    pub urssaf_paid: Option<Decimal>,
}

/// The structured request accepted from the API layer.
///
/// Every value present here is a user override: it wins over whatever the
/// ingested documents say.
///
/// ```
/// use impot_core::CalculationInput;
///
/// let json = r#"{
///   "tax_year": 2024,
///   "person": {"nb_parts": 1.0, "status": "micro_bnc"},
///   "income": {"professional_gross": 28000.0, "deductible_expenses": 0.0},
///   "deductions": {"per_contributions": 2000.0},
///   "social": {"urssaf_declared_ca": 28000.0, "urssaf_paid": 6000.0},
///   "pas_withheld": 0.0
/// }"#;
///
/// let input: CalculationInput = serde_json::from_str(json).unwrap();
/// assert_eq!(input.tax_year, 2024);
/// assert_eq!(input.overrides().len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationInput {
    pub tax_year: i32,
    #[serde(default)]
    pub person: PersonInput,
    #[serde(default)]
    pub income: IncomeInput,
    #[serde(default)]
    pub deductions: DeductionsInput,
    #[serde(default)]
    pub social: SocialInput,
    pub pas_withheld: Option<Decimal>,
}

impl CalculationInput {
    /// The supplied values keyed by canonical field name.
    pub fn overrides(&self) -> Vec<(&'static str, FieldValue)> {
        let text = |name, value: &Option<String>| {
            value.as_ref().map(|v| (name, FieldValue::Text(v.clone())))
        };
        let amount = |name, value: Option<Decimal>| value.map(|v| (name, FieldValue::Amount(v)));

        [
            amount(fields::NB_PARTS, self.person.nb_parts),
            text(fields::REGIME, &self.person.status),
            text(fields::SITUATION_FAMILIALE, &self.person.situation_familiale),
            amount(
                fields::ENFANTS_A_CHARGE,
                self.person.enfants_a_charge.map(Decimal::from),
            ),
            amount(fields::PROFESSIONAL_GROSS, self.income.professional_gross),
            amount(fields::DEDUCTIBLE_EXPENSES, self.income.deductible_expenses),
            amount(fields::BENEFICE_NET, self.income.benefice_net),
            amount(fields::SALARY, self.income.salary),
            amount(fields::RENTAL_INCOME, self.income.rental_income),
            amount(fields::CAPITAL_INCOME, self.income.capital_income),
            amount(fields::PER_CONTRIBUTIONS, self.deductions.per_contributions),
            amount(fields::TAX_REDUCTIONS, self.deductions.tax_reductions),
            amount(fields::URSSAF_DECLARED_CA, self.social.urssaf_declared_ca),
            amount(fields::URSSAF_PAID, self.social.urssaf_paid),
            amount(fields::PAS_WITHHELD, self.pas_withheld),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn profile() -> FiscalProfile {
        let mut profile = FiscalProfile::new(dec!(2), Regime::MicroBnc);
        profile.situation_familiale = Some(SituationFamiliale::Marie);
        profile.professional_gross = dec!(50000);
        profile.deductible_expenses = dec!(20000);
        profile.salary = dec!(12000);
        profile.rental_income = dec!(3000);
        profile.capital_income = dec!(500);
        profile
    }

    #[test]
    fn from_profile_resolves_reel_profit() {
        let request = TaxCalculationRequest::from_profile(&profile(), 2024);

        assert_eq!(request.tax_year, 2024);
        assert_eq!(request.reel_profit, dec!(30000));
    }

    #[test]
    fn with_regime_keeps_raw_figures() {
        let request = TaxCalculationRequest::from_profile(&profile(), 2024);

        let reel = request.with_regime(Regime::ReelBnc);

        assert_eq!(reel.regime, Regime::ReelBnc);
        assert_eq!(reel.professional_gross, request.professional_gross);
        assert_eq!(reel.deductible_expenses, request.deductible_expenses);
        assert_eq!(reel.reel_profit, request.reel_profit);
    }

    #[test]
    fn other_income_sums_non_professional_income() {
        let request = TaxCalculationRequest::from_profile(&profile(), 2024);

        assert_eq!(request.other_income(), dec!(15500));
    }

    #[test]
    fn base_parts_follow_situation() {
        let request = TaxCalculationRequest::from_profile(&profile(), 2024);

        assert_eq!(request.base_parts(), dec!(2));
        assert!(request.is_couple());
    }

    #[test]
    fn base_parts_never_exceed_declared_parts() {
        let mut profile = profile();
        profile.nb_parts = dec!(1);

        let request = TaxCalculationRequest::from_profile(&profile, 2024);

        assert_eq!(request.base_parts(), dec!(1));
    }

    #[test]
    fn base_parts_default_to_one_without_situation() {
        let mut profile = profile();
        profile.situation_familiale = None;

        let request = TaxCalculationRequest::from_profile(&profile, 2024);

        assert_eq!(request.base_parts(), dec!(1));
        assert!(!request.is_couple());
    }

    #[test]
    fn input_overrides_skip_absent_values() {
        let input = CalculationInput {
            tax_year: 2024,
            person: PersonInput {
                nb_parts: Some(dec!(1)),
                status: Some("micro_bnc".to_string()),
                ..PersonInput::default()
            },
            income: IncomeInput::default(),
            deductions: DeductionsInput::default(),
            social: SocialInput::default(),
            pas_withheld: None,
        };

        let overrides = input.overrides();

        assert_eq!(
            overrides,
            vec![
                (fields::NB_PARTS, FieldValue::Amount(dec!(1))),
                (fields::REGIME, FieldValue::Text("micro_bnc".to_string())),
            ]
        );
    }

    #[test]
    fn input_deserializes_minimal_request() {
        let input: CalculationInput =
            serde_json::from_str(r#"{"tax_year": 2025, "person": {"status": "reel_bic"}}"#)
                .unwrap();

        assert_eq!(input.tax_year, 2025);
        assert_eq!(input.person.status.as_deref(), Some("reel_bic"));
        assert_eq!(input.income, IncomeInput::default());
        assert_eq!(input.pas_withheld, None);
    }

    #[test]
    fn input_accepts_situation_alias() {
        let input: CalculationInput = serde_json::from_str(
            r#"{"tax_year": 2024, "person": {"situation": "marie", "enfants_a_charge": 2}}"#,
        )
        .unwrap();

        assert_eq!(input.person.situation_familiale.as_deref(), Some("marie"));
        assert_eq!(input.person.enfants_a_charge, Some(2));
    }
}
