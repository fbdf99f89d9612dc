use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Regime;

/// Legal notice attached to every result.
pub const DISCLAIMER: &str = "Simulation indicative fournie à titre informatif. Elle ne \
constitue ni un avis d'imposition ni un conseil fiscal; seul le calcul de \
l'administration fiscale fait foi.";

/// Income tax figures (`impot` block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxResult {
    pub revenu_imposable: Decimal,
    pub part_income: Decimal,
    pub impot_brut: Decimal,
    pub impot_net: Decimal,
    pub pas_withheld: Decimal,
    /// Balance still to pay, never negative.
    pub due_now: Decimal,
    /// Withholding in excess of the final tax.
    pub refund_due: Decimal,
    /// Micro abattement applied to turnover (zero under réel).
    pub abattement: Decimal,
    pub decote: Decimal,
    pub reductions: Decimal,
}

/// Expected versus declared social contributions (`socials` block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialContributions {
    pub urssaf_expected: Decimal,
    pub urssaf_paid: Decimal,
    /// `urssaf_paid - urssaf_expected`; negative means underpayment.
    pub delta: Decimal,
    pub rate_used: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Micro,
    Reel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    MicroCheaper,
    ReelCheaper,
    /// Equal tax, the declared regime is kept.
    Tie,
}

/// Why one regime was recommended over the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationReason {
    pub kind: ReasonKind,
    /// `impot_micro - impot_reel`.
    pub delta: Decimal,
    pub abattement_rate: Decimal,
    pub abattement: Decimal,
    pub deducted_expenses: Decimal,
    pub summary: String,
}

impl RecommendationReason {
    pub fn new(
        kind: ReasonKind,
        delta: Decimal,
        abattement_rate: Decimal,
        abattement: Decimal,
        deducted_expenses: Decimal,
    ) -> Self {
        let mut reason = Self {
            kind,
            delta,
            abattement_rate,
            abattement,
            deducted_expenses,
            summary: String::new(),
        };
        reason.summary = reason.to_string();
        reason
    }
}

impl fmt::Display for RecommendationReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let rate = (self.abattement_rate * Decimal::ONE_HUNDRED).normalize();
        let mechanics = format!(
            "abattement forfaitaire de {rate} % ({} €) contre {} € de charges réelles",
            self.abattement.normalize(),
            self.deducted_expenses.normalize()
        );
        match self.kind {
            ReasonKind::MicroCheaper => write!(
                f,
                "Le régime micro réduit l'impôt de {} €: {mechanics}.",
                (-self.delta).normalize()
            ),
            ReasonKind::ReelCheaper => write!(
                f,
                "Le régime réel réduit l'impôt de {} €: {mechanics}.",
                self.delta.normalize()
            ),
            ReasonKind::Tie => write!(
                f,
                "Impôt identique dans les deux régimes, le régime déclaré est conservé: {mechanics}."
            ),
        }
    }
}

/// Micro versus réel simulation on identical raw figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeComparison {
    pub regime_micro: Regime,
    pub regime_reel: Regime,
    pub revenu_imposable_micro: Decimal,
    pub revenu_imposable_reel: Decimal,
    pub impot_micro: Decimal,
    pub impot_reel: Decimal,
    /// `impot_micro - impot_reel`: positive when réel costs less.
    pub delta: Decimal,
    pub urssaf_micro: Decimal,
    pub urssaf_reel: Decimal,
    pub recommendation: Recommendation,
    pub recommended_regime: Regime,
    pub recommendation_reason: RecommendationReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparisons {
    pub micro_vs_reel: RegimeComparison,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationMetadata {
    pub source: String,
    pub rules_version: i32,
    pub disclaimer: String,
}

impl CalculationMetadata {
    pub fn new(
        source: impl Into<String>,
        rules_version: i32,
    ) -> Self {
        Self {
            source: source.into(),
            rules_version,
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

/// The structured result handed to the API and LLM layers. Produced fresh
/// per request and never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub impot: IncomeTaxResult,
    pub socials: SocialContributions,
    pub comparisons: Comparisons,
    pub warnings: Vec<String>,
    pub metadata: CalculationMetadata,
}
