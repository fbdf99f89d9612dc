//! Progressive income tax with the quotient familial.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Taxable base: professional income (after abattement or expenses) plus other income, minus PER contributions |
//! | 2    | Part income: taxable base ÷ `nb_parts` |
//! | 3    | Bracket walk on the part income, ascending bands |
//! | 4    | Gross tax: part tax × `nb_parts` (capped per extra half part when a plafonnement is configured) |
//! | 5    | Décote (when configured) and reductions, floored at zero |
//! | 6    | Balance: net tax minus withholding at source |
//!
//! ```
//! use rust_decimal_macros::dec;
//! use impot_core::calculations::IncomeTaxCalculator;
//! use impot_core::{
//!     Bracket, BracketTable, FiscalProfile, Regime, RegimeDefinition, RegimeTable,
//!     RuleTables, TaxCalculationRequest,
//! };
//!
//! let brackets = BracketTable::new(2024, vec![
//!     Bracket::new(dec!(0), dec!(0)),
//!     Bracket::new(dec!(11294), dec!(0.11)),
//!     Bracket::new(dec!(28797), dec!(0.30)),
//!     Bracket::new(dec!(82341), dec!(0.41)),
//!     Bracket::new(dec!(177106), dec!(0.45)),
//! ]).unwrap();
//! let regimes = RegimeTable::new(vec![
//!     RegimeDefinition::new(Regime::MicroBnc, Some(dec!(0.34)), dec!(0.218)),
//!     RegimeDefinition::new(Regime::MicroBicService, Some(dec!(0.50)), dec!(0.212)),
//!     RegimeDefinition::new(Regime::MicroBicVente, Some(dec!(0.71)), dec!(0.123)),
//!     RegimeDefinition::new(Regime::ReelBnc, None, dec!(0.45)),
//!     RegimeDefinition::new(Regime::ReelBic, None, dec!(0.45)),
//! ]).unwrap();
//! let tables = RuleTables::new(brackets, regimes).with_abattement_minimum(dec!(305));
//!
//! let mut profile = FiscalProfile::new(dec!(1), Regime::MicroBnc);
//! profile.professional_gross = dec!(28000);
//! profile.per_contributions = dec!(2000);
//! let request = TaxCalculationRequest::from_profile(&profile, 2024);
//!
//! let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();
//!
//! assert_eq!(result.revenu_imposable, dec!(16480));
//! assert_eq!(result.impot_net, dec!(570.46));
//! ```

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::common::{non_negative, round_half_up};
use crate::calculations::taxable_base::taxable_base;
use crate::consolidation::fields;
use crate::error::ValidationError;
use crate::models::{BracketTable, IncomeTaxResult, RuleTables, TaxCalculationRequest};

/// Computes the `impot` block of a result from the year's rule tables.
#[derive(Debug, Clone, Copy)]
pub struct IncomeTaxCalculator<'a> {
    tables: &'a RuleTables,
}

impl<'a> IncomeTaxCalculator<'a> {
    pub fn new(tables: &'a RuleTables) -> Self {
        Self { tables }
    }

    /// Runs every step for `request` under its own regime.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidField`] when `nb_parts` is not positive.
    pub fn calculate(
        &self,
        request: &TaxCalculationRequest,
    ) -> Result<IncomeTaxResult, ValidationError> {
        let base = taxable_base(request, self.tables);
        let revenu_imposable = base.revenu_imposable;

        let part_income = self.part_income(revenu_imposable, request.nb_parts)?;
        let impot_brut = self.impot_brut(revenu_imposable, request)?;

        let decote = self
            .tables
            .decote
            .as_ref()
            .map_or(Decimal::ZERO, |rule| {
                round_half_up(rule.amount(impot_brut, request.is_couple()))
            });
        let after_decote = non_negative(impot_brut - decote);
        let reductions = request.tax_reductions.min(after_decote);
        let impot_net = round_half_up(non_negative(after_decote - reductions));

        let balance = impot_net - request.pas_withheld;
        let due_now = round_half_up(non_negative(balance));
        let refund_due = round_half_up(non_negative(-balance));

        debug!(
            regime = %request.regime,
            %revenu_imposable,
            %impot_brut,
            %impot_net,
            "income tax computed"
        );

        Ok(IncomeTaxResult {
            revenu_imposable,
            part_income: round_half_up(part_income),
            impot_brut,
            impot_net,
            pas_withheld: request.pas_withheld,
            due_now,
            refund_due,
            abattement: base.abattement,
            decote,
            reductions,
        })
    }

    /// Tax on `revenu_imposable` for a household of `nb_parts`, before
    /// plafonnement, décote and reductions.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidField`] when `nb_parts` is not positive.
    pub fn tax_for_parts(
        &self,
        revenu_imposable: Decimal,
        nb_parts: Decimal,
    ) -> Result<Decimal, ValidationError> {
        let part_income = self.part_income(revenu_imposable, nb_parts)?;
        Ok(bracket_tax(&self.tables.brackets, part_income) * nb_parts)
    }

    fn part_income(
        &self,
        revenu_imposable: Decimal,
        nb_parts: Decimal,
    ) -> Result<Decimal, ValidationError> {
        if nb_parts <= Decimal::ZERO {
            return Err(ValidationError::invalid(
                fields::NB_PARTS,
                nb_parts,
                "must be positive",
            ));
        }
        revenu_imposable
            .checked_div(nb_parts)
            .ok_or_else(|| ValidationError::invalid(fields::NB_PARTS, nb_parts, "division overflow"))
    }

    /// Gross tax, applying the plafonnement when the tables carry one.
    fn impot_brut(
        &self,
        revenu_imposable: Decimal,
        request: &TaxCalculationRequest,
    ) -> Result<Decimal, ValidationError> {
        let uncapped = self.tax_for_parts(revenu_imposable, request.nb_parts)?;

        let Some(cap) = &self.tables.quotient_cap else {
            return Ok(round_half_up(uncapped));
        };
        let base_parts = request.base_parts();
        if request.nb_parts <= base_parts {
            return Ok(round_half_up(uncapped));
        }

        let extra_half_parts = (request.nb_parts - base_parts) * Decimal::TWO;
        let base_tax = self.tax_for_parts(revenu_imposable, base_parts)?;
        let capped = base_tax - cap.per_half_part * extra_half_parts;
        if capped > uncapped {
            debug!(%uncapped, %capped, "quotient familial advantage capped");
        }
        Ok(round_half_up(uncapped.max(capped)))
    }
}

/// Tax on one part: each band taxes the slice of `part_income` between its
/// lower bound and the next band's bound.
pub fn bracket_tax(
    brackets: &BracketTable,
    part_income: Decimal,
) -> Decimal {
    if part_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let mut tax = Decimal::ZERO;
    for (index, bracket) in brackets.brackets().iter().enumerate() {
        if part_income <= bracket.lower_bound {
            break;
        }
        let top = brackets
            .upper_bound(index)
            .map_or(part_income, |upper| upper.min(part_income));
        tax += (top - bracket.lower_bound) * bracket.rate;
    }
    tax
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{DecoteRule, QuotientCap, Regime, SituationFamiliale};
    use crate::test_support::{micro_bnc_profile, tables_2024};

    fn request(gross: Decimal) -> TaxCalculationRequest {
        TaxCalculationRequest::from_profile(&micro_bnc_profile(gross), 2024)
    }

    fn decote_2024() -> DecoteRule {
        DecoteRule {
            threshold_single: dec!(1929),
            threshold_couple: dec!(3191),
            forfait_single: dec!(873),
            forfait_couple: dec!(1444),
            rate: dec!(0.4525),
        }
    }

    // =========================================================================
    // Bracket walk tests
    // =========================================================================

    #[test]
    fn bracket_tax_within_first_taxed_band() {
        let tables = tables_2024();

        // (16480 - 11294) × 11 %
        assert_eq!(bracket_tax(&tables.brackets, dec!(16480)), dec!(570.46));
    }

    #[test]
    fn bracket_tax_across_three_bands() {
        let tables = tables_2024();

        // 17503 × 11 % + 4203 × 30 %
        assert_eq!(bracket_tax(&tables.brackets, dec!(33000)), dec!(3186.23));
    }

    #[test]
    fn bracket_tax_at_a_bound_is_exact() {
        let tables = tables_2024();

        assert_eq!(bracket_tax(&tables.brackets, dec!(11294)), dec!(0));
        assert_eq!(bracket_tax(&tables.brackets, dec!(28797)), dec!(1925.33));
    }

    #[test]
    fn bracket_tax_in_open_top_band() {
        let tables = tables_2024();

        // 1925.33 + 53544 × 30 % + 94765 × 41 % + 22894 × 45 %
        assert_eq!(bracket_tax(&tables.brackets, dec!(200000)), dec!(67144.48));
    }

    #[test]
    fn bracket_tax_of_zero_is_zero() {
        let tables = tables_2024();

        assert_eq!(bracket_tax(&tables.brackets, dec!(0)), dec!(0));
    }

    // =========================================================================
    // calculate tests
    // =========================================================================

    #[test]
    fn single_micro_bnc_with_per() {
        let tables = tables_2024();
        let mut request = request(dec!(28000));
        request.per_contributions = dec!(2000);

        let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();

        assert_eq!(result.revenu_imposable, dec!(16480));
        assert_eq!(result.part_income, dec!(16480));
        assert_eq!(result.impot_brut, dec!(570.46));
        assert_eq!(result.impot_net, dec!(570.46));
        assert_eq!(result.due_now, dec!(570.46));
        assert_eq!(result.abattement, dec!(9520));
    }

    #[test]
    fn two_parts_halve_the_part_income() {
        let tables = tables_2024();
        let mut request = request(dec!(50000));
        request.nb_parts = dec!(2);
        request.situation_familiale = Some(SituationFamiliale::Marie);

        let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();

        assert_eq!(result.revenu_imposable, dec!(33000));
        assert_eq!(result.part_income, dec!(16500));
        assert_eq!(result.impot_brut, dec!(1145.32));
    }

    #[test]
    fn zero_income_gives_zero_tax() {
        let tables = tables_2024();

        let result = IncomeTaxCalculator::new(&tables)
            .calculate(&request(dec!(0)))
            .unwrap();

        assert_eq!(result.revenu_imposable, dec!(0));
        assert_eq!(result.impot_brut, dec!(0));
        assert_eq!(result.impot_net, dec!(0));
    }

    #[test]
    fn reductions_floor_net_tax_at_zero() {
        let tables = tables_2024();
        let mut request = request(dec!(28000));
        request.tax_reductions = dec!(5000);

        let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();

        // 18480 taxable: (18480 - 11294) × 11 % = 790.46
        assert_eq!(result.impot_brut, dec!(790.46));
        assert_eq!(result.reductions, dec!(790.46));
        assert_eq!(result.impot_net, dec!(0));
    }

    #[test]
    fn withholding_above_tax_becomes_a_refund() {
        let tables = tables_2024();
        let mut request = request(dec!(28000));
        request.per_contributions = dec!(2000);
        request.pas_withheld = dec!(800);

        let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();

        assert_eq!(result.due_now, dec!(0));
        assert_eq!(result.refund_due, dec!(229.54));
    }

    #[test]
    fn partial_withholding_leaves_balance_due() {
        let tables = tables_2024();
        let mut request = request(dec!(28000));
        request.per_contributions = dec!(2000);
        request.pas_withheld = dec!(400);

        let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();

        assert_eq!(result.due_now, dec!(170.46));
        assert_eq!(result.refund_due, dec!(0));
    }

    #[test]
    fn decote_applies_when_configured() {
        let tables = tables_2024().with_decote(Some(decote_2024()));
        let mut request = request(dec!(28000));
        request.per_contributions = dec!(2000);

        let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();

        // 873 - 0.4525 × 570.46 = 614.87, capped at the tax itself
        assert_eq!(result.decote, dec!(570.46));
        assert_eq!(result.impot_net, dec!(0));
    }

    #[test]
    fn decote_partially_reduces_tax_near_threshold() {
        let tables = tables_2024().with_decote(Some(decote_2024()));
        let request = request(dec!(40000));

        let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();

        // taxable 26400: 15106 × 11 % = 1661.66; décote 873 - 751.90 = 121.10
        assert_eq!(result.impot_brut, dec!(1661.66));
        assert_eq!(result.decote, dec!(121.10));
        assert_eq!(result.impot_net, dec!(1540.56));
    }

    #[test]
    fn non_positive_parts_are_rejected() {
        let tables = tables_2024();
        let mut request = request(dec!(28000));
        request.nb_parts = dec!(0);

        let err = IncomeTaxCalculator::new(&tables)
            .calculate(&request)
            .unwrap_err();

        assert!(matches!(err, ValidationError::InvalidField { ref field, .. } if field == "nb_parts"));
    }

    // =========================================================================
    // Plafonnement tests
    // =========================================================================

    #[test]
    fn quotient_cap_limits_child_advantage() {
        let tables = tables_2024().with_quotient_cap(Some(QuotientCap {
            per_half_part: dec!(1759),
        }));
        let mut request = request(dec!(0)).with_regime(Regime::ReelBnc);
        request.reel_profit = dec!(100000);
        request.nb_parts = dec!(1.5);
        request.situation_familiale = Some(SituationFamiliale::Celibataire);

        let calculator = IncomeTaxCalculator::new(&tables);
        let uncapped = round_half_up(calculator.tax_for_parts(dec!(100000), dec!(1.5)).unwrap());
        let single = round_half_up(calculator.tax_for_parts(dec!(100000), dec!(1)).unwrap());
        let result = calculator.calculate(&request).unwrap();

        assert!(single - uncapped > dec!(1759));
        assert_eq!(result.impot_brut, single - dec!(1759));
    }

    #[test]
    fn quotient_cap_is_inactive_without_extra_parts() {
        let tables = tables_2024().with_quotient_cap(Some(QuotientCap {
            per_half_part: dec!(1759),
        }));
        let mut request = request(dec!(50000));
        request.nb_parts = dec!(2);
        request.situation_familiale = Some(SituationFamiliale::Marie);

        let result = IncomeTaxCalculator::new(&tables).calculate(&request).unwrap();

        assert_eq!(result.impot_brut, dec!(1145.32));
    }

    #[test]
    fn tax_for_parts_never_increases_with_more_parts() {
        let tables = tables_2024();
        let calculator = IncomeTaxCalculator::new(&tables);

        for income in [dec!(0), dec!(15000), dec!(45000), dec!(120000), dec!(400000)] {
            let one = calculator.tax_for_parts(income, dec!(1)).unwrap();
            let two = calculator.tax_for_parts(income, dec!(2)).unwrap();
            assert!(two <= one, "income {income}: {two} > {one}");
        }
    }
}
