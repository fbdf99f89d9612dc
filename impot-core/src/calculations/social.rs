use rust_decimal::Decimal;

use crate::calculations::common::round_half_up;
use crate::models::{RuleTables, SocialContributions, TaxCalculationRequest};

/// `declared_ca × rate`, rounded to the cent.
pub fn expected_contribution(
    declared_ca: Decimal,
    rate: Decimal,
) -> Decimal {
    round_half_up(declared_ca * rate)
}

/// Expected URSSAF contributions against what was paid. Computes only;
/// anomalies are reported by the coherence validator.
#[derive(Debug, Clone, Copy)]
pub struct SocialContributionsCalculator<'a> {
    tables: &'a RuleTables,
}

impl<'a> SocialContributionsCalculator<'a> {
    pub fn new(tables: &'a RuleTables) -> Self {
        Self { tables }
    }

    pub fn calculate(
        &self,
        request: &TaxCalculationRequest,
    ) -> SocialContributions {
        let rate_used = self.tables.regime(request.regime).social_rate;
        let urssaf_expected = expected_contribution(request.urssaf_declared_ca, rate_used);

        SocialContributions {
            urssaf_expected,
            urssaf_paid: request.urssaf_paid,
            delta: round_half_up(request.urssaf_paid - urssaf_expected),
            rate_used,
        }
    }
}
