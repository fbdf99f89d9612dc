use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{RuleTableError, ValidationError};
use crate::text::normalize_key;

/// Professional income category a regime belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityFamily {
    /// Bénéfices non commerciaux (liberal professions).
    Bnc,
    /// Bénéfices industriels et commerciaux.
    Bic,
}

/// The five supported taxation regimes for self-employed income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    MicroBnc,
    MicroBicService,
    MicroBicVente,
    ReelBnc,
    ReelBic,
}

impl Regime {
    pub const ALL: [Regime; 5] = [
        Self::MicroBnc,
        Self::MicroBicService,
        Self::MicroBicVente,
        Self::ReelBnc,
        Self::ReelBic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MicroBnc => "micro_bnc",
            Self::MicroBicService => "micro_bic_service",
            Self::MicroBicVente => "micro_bic_vente",
            Self::ReelBnc => "reel_bnc",
            Self::ReelBic => "reel_bic",
        }
    }

    /// Accepts the canonical ids in any case, with `-` or spaces as
    /// separators and with or without the accent on "réel".
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_key(s).as_str() {
            "micro_bnc" => Some(Self::MicroBnc),
            "micro_bic_service" | "micro_bic_services" => Some(Self::MicroBicService),
            "micro_bic_vente" | "micro_bic_ventes" => Some(Self::MicroBicVente),
            "reel_bnc" => Some(Self::ReelBnc),
            "reel_bic" => Some(Self::ReelBic),
            _ => None,
        }
    }

    pub fn family(&self) -> ActivityFamily {
        match self {
            Self::MicroBnc | Self::ReelBnc => ActivityFamily::Bnc,
            Self::MicroBicService | Self::MicroBicVente | Self::ReelBic => ActivityFamily::Bic,
        }
    }

    pub fn is_micro(&self) -> bool {
        match self {
            Self::MicroBnc | Self::MicroBicService | Self::MicroBicVente => true,
            Self::ReelBnc | Self::ReelBic => false,
        }
    }

    pub fn is_reel(&self) -> bool {
        !self.is_micro()
    }

    /// The regime of the other kind (micro or réel) within the same
    /// activity family. Réel BIC maps to micro BIC services.
    pub fn counterpart(&self) -> Regime {
        match self {
            Self::MicroBnc => Self::ReelBnc,
            Self::MicroBicService | Self::MicroBicVente => Self::ReelBic,
            Self::ReelBnc => Self::MicroBnc,
            Self::ReelBic => Self::MicroBicService,
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownRegime(s.to_string()))
    }
}

/// Per-year parameters of a regime.
///
/// `abattement_rate` is `Some` exactly for micro regimes; réel regimes deduct
/// actual expenses instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeDefinition {
    pub regime: Regime,
    pub family: ActivityFamily,
    pub abattement_rate: Option<Decimal>,
    pub social_rate: Decimal,
}

impl RegimeDefinition {
    pub fn new(
        regime: Regime,
        abattement_rate: Option<Decimal>,
        social_rate: Decimal,
    ) -> Self {
        Self {
            regime,
            family: regime.family(),
            abattement_rate,
            social_rate,
        }
    }

    /// Checks rates are fractions and that the abattement matches the
    /// regime kind.
    pub fn validate(&self) -> Result<(), RuleTableError> {
        check_rate(
            &format!("social rate of {}", self.regime),
            self.social_rate,
        )?;
        if self.family != self.regime.family() {
            return Err(RuleTableError::InvalidAbattement {
                regime: self.regime.to_string(),
                reason: format!("activity family {:?} does not match", self.family),
            });
        }
        match (self.regime.is_micro(), self.abattement_rate) {
            (true, Some(rate)) => check_rate(&format!("abattement of {}", self.regime), rate),
            (true, None) => Err(RuleTableError::InvalidAbattement {
                regime: self.regime.to_string(),
                reason: "micro regimes require an abattement rate".to_string(),
            }),
            (false, Some(_)) => Err(RuleTableError::InvalidAbattement {
                regime: self.regime.to_string(),
                reason: "réel regimes deduct actual expenses, not an abattement".to_string(),
            }),
            (false, None) => Ok(()),
        }
    }
}

pub(crate) fn check_rate(
    what: &str,
    rate: Decimal,
) -> Result<(), RuleTableError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(RuleTableError::InvalidRate {
            what: what.to_string(),
            rate,
        });
    }
    Ok(())
}
