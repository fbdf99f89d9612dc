use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RuleTableError;
use crate::models::regime::check_rate;
use crate::models::{BracketTable, Regime, RegimeDefinition};

/// Citation attached to every result unless the tables name their own source.
pub const OFFICIAL_SOURCE: &str =
    "Barème progressif de l'impôt sur le revenu, art. 197 du CGI (impots.gouv.fr, BOFiP-Impôts)";

/// Reduction granted to households whose gross tax is below a threshold.
///
/// `amount = forfait - rate × impot_brut`, never negative and never more
/// than the tax it reduces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoteRule {
    pub threshold_single: Decimal,
    pub threshold_couple: Decimal,
    pub forfait_single: Decimal,
    pub forfait_couple: Decimal,
    pub rate: Decimal,
}

impl DecoteRule {
    pub fn amount(
        &self,
        impot_brut: Decimal,
        couple: bool,
    ) -> Decimal {
        let (threshold, forfait) = if couple {
            (self.threshold_couple, self.forfait_couple)
        } else {
            (self.threshold_single, self.forfait_single)
        };
        if impot_brut <= Decimal::ZERO || impot_brut >= threshold {
            return Decimal::ZERO;
        }
        (forfait - self.rate * impot_brut)
            .max(Decimal::ZERO)
            .min(impot_brut)
    }
}

/// Plafonnement du quotient familial: the maximum tax saving granted per
/// half part above the household's base parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotientCap {
    pub per_half_part: Decimal,
}

/// Tolerances used by the coherence validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoherenceThresholds {
    /// Accepted gap between declared and expected `nb_parts`.
    pub parts_tolerance: Decimal,
    /// Turnover above which missing contributions are suspicious.
    pub ca_threshold: Decimal,
    /// Paid contributions below `expected × ratio` count as "far below".
    pub underpayment_ratio: Decimal,
    /// Gap between paid and expected contributions tolerated silently.
    pub delta_tolerance: Decimal,
}

impl Default for CoherenceThresholds {
    fn default() -> Self {
        Self {
            parts_tolerance: Decimal::new(1, 2),
            ca_threshold: Decimal::from(5000),
            underpayment_ratio: Decimal::new(5, 1),
            delta_tolerance: Decimal::from(500),
        }
    }
}

/// One definition per supported regime, looked up by exhaustive match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegimeTable {
    micro_bnc: RegimeDefinition,
    micro_bic_service: RegimeDefinition,
    micro_bic_vente: RegimeDefinition,
    reel_bnc: RegimeDefinition,
    reel_bic: RegimeDefinition,
}

impl RegimeTable {
    /// Requires exactly one valid definition for each of the five regimes.
    pub fn new(definitions: Vec<RegimeDefinition>) -> Result<Self, RuleTableError> {
        let mut slots: [Option<RegimeDefinition>; 5] = Default::default();
        for definition in definitions {
            definition.validate()?;
            let index = match definition.regime {
                Regime::MicroBnc => 0,
                Regime::MicroBicService => 1,
                Regime::MicroBicVente => 2,
                Regime::ReelBnc => 3,
                Regime::ReelBic => 4,
            };
            if slots[index].is_some() {
                return Err(RuleTableError::DuplicateRegime {
                    regime: definition.regime.to_string(),
                });
            }
            slots[index] = Some(definition);
        }

        let [micro_bnc, micro_bic_service, micro_bic_vente, reel_bnc, reel_bic] = slots;
        let take = |slot: Option<RegimeDefinition>, regime: Regime| {
            slot.ok_or_else(|| RuleTableError::MissingRegime(regime.to_string()))
        };
        Ok(Self {
            micro_bnc: take(micro_bnc, Regime::MicroBnc)?,
            micro_bic_service: take(micro_bic_service, Regime::MicroBicService)?,
            micro_bic_vente: take(micro_bic_vente, Regime::MicroBicVente)?,
            reel_bnc: take(reel_bnc, Regime::ReelBnc)?,
            reel_bic: take(reel_bic, Regime::ReelBic)?,
        })
    }

    pub fn get(
        &self,
        regime: Regime,
    ) -> &RegimeDefinition {
        match regime {
            Regime::MicroBnc => &self.micro_bnc,
            Regime::MicroBicService => &self.micro_bic_service,
            Regime::MicroBicVente => &self.micro_bic_vente,
            Regime::ReelBnc => &self.reel_bnc,
            Regime::ReelBic => &self.reel_bic,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegimeDefinition> {
        Regime::ALL.into_iter().map(|r| self.get(r))
    }
}

/// Everything the engine needs to know about one tax year.
///
/// Built once, validated on construction and only ever shared by
/// reference afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTables {
    pub tax_year: i32,
    pub brackets: BracketTable,
    pub regimes: RegimeTable,
    /// Floor of the micro abattement (305 € in current law).
    pub abattement_minimum: Decimal,
    pub decote: Option<DecoteRule>,
    pub quotient_cap: Option<QuotientCap>,
    pub coherence: CoherenceThresholds,
    pub source: String,
}

impl RuleTables {
    pub fn new(
        brackets: BracketTable,
        regimes: RegimeTable,
    ) -> Self {
        Self {
            tax_year: brackets.tax_year(),
            brackets,
            regimes,
            abattement_minimum: Decimal::ZERO,
            decote: None,
            quotient_cap: None,
            coherence: CoherenceThresholds::default(),
            source: OFFICIAL_SOURCE.to_string(),
        }
    }

    pub fn with_abattement_minimum(
        mut self,
        minimum: Decimal,
    ) -> Self {
        self.abattement_minimum = minimum;
        self
    }

    pub fn with_decote(
        mut self,
        decote: Option<DecoteRule>,
    ) -> Self {
        self.decote = decote;
        self
    }

    pub fn with_quotient_cap(
        mut self,
        cap: Option<QuotientCap>,
    ) -> Self {
        self.quotient_cap = cap;
        self
    }

    pub fn with_coherence(
        mut self,
        coherence: CoherenceThresholds,
    ) -> Self {
        self.coherence = coherence;
        self
    }

    pub fn with_source(
        mut self,
        source: impl Into<String>,
    ) -> Self {
        self.source = source.into();
        self
    }

    pub fn regime(
        &self,
        regime: Regime,
    ) -> &RegimeDefinition {
        self.regimes.get(regime)
    }

    /// Validates the parts that the builder methods can set; brackets and
    /// regimes are already checked by their own constructors.
    pub fn validate(&self) -> Result<(), RuleTableError> {
        let non_negative = |what: &str, amount: Decimal| {
            if amount < Decimal::ZERO {
                Err(RuleTableError::NegativeAmount {
                    what: what.to_string(),
                    amount,
                })
            } else {
                Ok(())
            }
        };

        non_negative("abattement minimum", self.abattement_minimum)?;
        if let Some(decote) = &self.decote {
            check_rate("décote rate", decote.rate)?;
            non_negative("décote single threshold", decote.threshold_single)?;
            non_negative("décote couple threshold", decote.threshold_couple)?;
            non_negative("décote single forfait", decote.forfait_single)?;
            non_negative("décote couple forfait", decote.forfait_couple)?;
        }
        if let Some(cap) = &self.quotient_cap {
            non_negative("quotient cap per half part", cap.per_half_part)?;
        }
        non_negative("parts tolerance", self.coherence.parts_tolerance)?;
        non_negative("turnover threshold", self.coherence.ca_threshold)?;
        non_negative("contribution delta tolerance", self.coherence.delta_tolerance)?;
        check_rate("underpayment ratio", self.coherence.underpayment_ratio)?;
        Ok(())
    }
}
