use std::cmp::Ordering;

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::common::non_negative;
use crate::calculations::income_tax::IncomeTaxCalculator;
use crate::calculations::social::SocialContributionsCalculator;
use crate::error::ValidationError;
use crate::models::{
    ReasonKind, Recommendation, RecommendationReason, Regime, RegimeComparison, RuleTables,
    TaxCalculationRequest,
};

/// Runs the income tax calculator under the declared regime and its
/// counterpart, holding every raw figure fixed.
#[derive(Debug, Clone, Copy)]
pub struct RegimeComparator<'a> {
    tables: &'a RuleTables,
}

impl<'a> RegimeComparator<'a> {
    pub fn new(tables: &'a RuleTables) -> Self {
        Self { tables }
    }

    /// Compares micro and réel for `request`.
    ///
    /// `delta = impot_micro - impot_reel`: positive when réel costs less.
    /// The regime with the strictly lower net tax is recommended, a tie
    /// keeps the declared one.
    ///
    /// # Errors
    ///
    /// Whatever the income tax calculator rejects.
    pub fn compare(
        &self,
        request: &TaxCalculationRequest,
    ) -> Result<RegimeComparison, ValidationError> {
        let (regime_micro, regime_reel) = pair(request.regime);
        let micro_request = request.with_regime(regime_micro);
        let reel_request = request.with_regime(regime_reel);

        let income_tax = IncomeTaxCalculator::new(self.tables);
        let micro = income_tax.calculate(&micro_request)?;
        let reel = income_tax.calculate(&reel_request)?;

        let socials = SocialContributionsCalculator::new(self.tables);
        let urssaf_micro = socials.calculate(&micro_request).urssaf_expected;
        let urssaf_reel = socials.calculate(&reel_request).urssaf_expected;

        let delta = micro.impot_net - reel.impot_net;
        let (recommendation, kind) = match delta.cmp(&Decimal::ZERO) {
            Ordering::Greater => (Recommendation::Reel, ReasonKind::ReelCheaper),
            Ordering::Less => (Recommendation::Micro, ReasonKind::MicroCheaper),
            Ordering::Equal if request.regime.is_micro() => (Recommendation::Micro, ReasonKind::Tie),
            Ordering::Equal => (Recommendation::Reel, ReasonKind::Tie),
        };
        let recommended_regime = match recommendation {
            Recommendation::Micro => regime_micro,
            Recommendation::Reel => regime_reel,
        };

        let abattement_rate = self
            .tables
            .regime(regime_micro)
            .abattement_rate
            .unwrap_or(Decimal::ZERO);
        let deducted_expenses = non_negative(request.professional_gross - request.reel_profit);
        let recommendation_reason = RecommendationReason::new(
            kind,
            delta,
            abattement_rate,
            micro.abattement,
            deducted_expenses,
        );

        debug!(
            %regime_micro,
            %regime_reel,
            %delta,
            %recommended_regime,
            "regimes compared"
        );

        Ok(RegimeComparison {
            regime_micro,
            regime_reel,
            revenu_imposable_micro: micro.revenu_imposable,
            revenu_imposable_reel: reel.revenu_imposable,
            impot_micro: micro.impot_net,
            impot_reel: reel.impot_net,
            delta,
            urssaf_micro,
            urssaf_reel,
            recommendation,
            recommended_regime,
            recommendation_reason,
        })
    }
}

/// (micro, réel) pair the declared regime is compared within.
fn pair(declared: Regime) -> (Regime, Regime) {
    if declared.is_micro() {
        (declared, declared.counterpart())
    } else {
        (declared.counterpart(), declared)
    }
}
