use rust_decimal::Decimal;

use crate::calculations::common::{non_negative, round_half_up};
use crate::models::{RuleTables, TaxCalculationRequest};

/// Household taxable income and how its professional part was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxableBase {
    /// Flat deduction granted on turnover; zero under réel.
    pub abattement: Decimal,
    /// Professional income entering the household total. May be negative
    /// under réel (a deficit).
    pub professional_income: Decimal,
    /// Household total after PER contributions, never negative.
    pub revenu_imposable: Decimal,
}

/// Micro abattement: `gross × rate`, at least the legal minimum, never more
/// than the turnover itself.
pub fn micro_abattement(
    professional_gross: Decimal,
    abattement_rate: Decimal,
    minimum: Decimal,
) -> Decimal {
    (professional_gross * abattement_rate)
        .max(minimum)
        .min(professional_gross)
}

/// Computes the taxable base of `request` under its own regime.
pub fn taxable_base(
    request: &TaxCalculationRequest,
    tables: &RuleTables,
) -> TaxableBase {
    let definition = tables.regime(request.regime);

    let (abattement, professional_income) = match definition.abattement_rate {
        Some(rate) => {
            let abattement = round_half_up(micro_abattement(
                request.professional_gross,
                rate,
                tables.abattement_minimum,
            ));
            (abattement, request.professional_gross - abattement)
        }
        None => (Decimal::ZERO, request.reel_profit),
    };

    let revenu_imposable = round_half_up(non_negative(
        professional_income + request.other_income() - request.per_contributions,
    ));

    TaxableBase {
        abattement,
        professional_income,
        revenu_imposable,
    }
}
