//! Advisory cross-checks between declared family composition, turnover and
//! contributions. Never fails; anomalies come back as French warnings, in a
//! fixed order: family quotient, turnover against contributions, then the
//! contribution balance.

use rust_decimal::Decimal;

use crate::calculations::social::expected_contribution;
use crate::models::{FiscalProfile, RuleTables, SituationFamiliale};

/// Parts a household should declare: 1 (single, divorced, widowed) or 2
/// (married, pacs), plus 0.5 for each of the first two children and 1 for
/// every further child.
pub fn expected_parts(
    situation: SituationFamiliale,
    enfants_a_charge: u32,
) -> Decimal {
    let first_two = Decimal::from(enfants_a_charge.min(2)) * Decimal::new(5, 1);
    let beyond = Decimal::from(enfants_a_charge.saturating_sub(2));
    situation.base_parts() + first_two + beyond
}

/// Parts exactly as declared, with at least one decimal: `2.0`, `1.5`,
/// `2.25`.
fn format_parts(parts: Decimal) -> String {
    let parts = parts.normalize();
    if parts.scale() == 0 {
        format!("{parts:.1}")
    } else {
        parts.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoherenceValidator<'a> {
    tables: &'a RuleTables,
}

impl<'a> CoherenceValidator<'a> {
    pub fn new(tables: &'a RuleTables) -> Self {
        Self { tables }
    }

    pub fn validate(
        &self,
        profile: &FiscalProfile,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        warnings.extend(self.family_quotient(profile));

        let turnover_warning = self.turnover_without_contributions(profile);
        let flagged = turnover_warning.is_some();
        warnings.extend(turnover_warning);
        warnings.extend(self.contribution_balance(profile, flagged));
        warnings
    }

    fn family_quotient(
        &self,
        profile: &FiscalProfile,
    ) -> Option<String> {
        // Without a declared situation there is nothing to compare against.
        let situation = profile.situation_familiale?;
        let expected = expected_parts(situation, profile.enfants_a_charge);
        let tolerance = self.tables.coherence.parts_tolerance;

        ((profile.nb_parts - expected).abs() > tolerance).then(|| {
            format!(
                "Nombre de parts incohérent : {} déclarée(s) alors que la situation « {} » \
                 avec {} enfant(s) à charge donne {} part(s).",
                format_parts(profile.nb_parts),
                situation,
                profile.enfants_a_charge,
                format_parts(expected)
            )
        })
    }

    fn turnover_without_contributions(
        &self,
        profile: &FiscalProfile,
    ) -> Option<String> {
        let thresholds = &self.tables.coherence;
        if profile.urssaf_declared_ca <= thresholds.ca_threshold {
            return None;
        }
        let expected = self.expected_contribution(profile);
        let far_below = profile.urssaf_paid < expected * thresholds.underpayment_ratio;

        (profile.urssaf_paid.is_zero() || far_below).then(|| {
            format!(
                "Chiffre d'affaires de {} € déclaré mais seulement {} € de cotisations URSSAF \
                 payées pour {} € attendus : paiements manquants ou non enregistrés ?",
                profile.urssaf_declared_ca.normalize(),
                profile.urssaf_paid.normalize(),
                expected.normalize()
            )
        })
    }

    /// Underpayment, unless the turnover check already flagged it, and
    /// overpayment beyond the tolerance.
    fn contribution_balance(
        &self,
        profile: &FiscalProfile,
        underpayment_flagged: bool,
    ) -> Option<String> {
        let expected = self.expected_contribution(profile);
        let delta = profile.urssaf_paid - expected;
        let tolerance = self.tables.coherence.delta_tolerance;

        if delta < Decimal::ZERO && !underpayment_flagged {
            let severity = if delta.abs() > tolerance {
                format!(", au-delà de la tolérance de {} €", tolerance.normalize())
            } else {
                String::new()
            };
            return Some(format!(
                "Cotisations URSSAF insuffisantes : {} € payés pour {} € attendus \
                 (écart de {} €{severity}).",
                profile.urssaf_paid.normalize(),
                expected.normalize(),
                delta.normalize()
            ));
        }
        (delta > tolerance).then(|| {
            format!(
                "Cotisations URSSAF supérieures de {} € au montant attendu ({} €), au-delà de \
                 la tolérance de {} €.",
                delta.normalize(),
                expected.normalize(),
                tolerance.normalize()
            )
        })
    }

    fn expected_contribution(
        &self,
        profile: &FiscalProfile,
    ) -> Decimal {
        let rate = self.tables.regime(profile.regime).social_rate;
        expected_contribution(profile.urssaf_declared_ca, rate)
    }
}
