use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::text::normalize_key;

/// Household status as declared on the annual return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SituationFamiliale {
    Celibataire,
    Divorce,
    Veuf,
    Marie,
    #[serde(rename = "pacs", alias = "pacse")]
    Pacse,
}

impl SituationFamiliale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celibataire => "celibataire",
            Self::Divorce => "divorce",
            Self::Veuf => "veuf",
            Self::Marie => "marie",
            Self::Pacse => "pacs",
        }
    }

    /// Parses French labels (accents optional, feminine forms included),
    /// English labels and the single-letter codes of form 2042.
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_key(s).as_str() {
            "celibataire" | "single" | "c" => Some(Self::Celibataire),
            "divorce" | "divorcee" | "separe" | "separee" | "divorced" | "d" => {
                Some(Self::Divorce)
            }
            "veuf" | "veuve" | "widowed" | "v" => Some(Self::Veuf),
            "marie" | "mariee" | "married" | "m" => Some(Self::Marie),
            "pacs" | "pacse" | "pacsee" | "o" => Some(Self::Pacse),
            _ => None,
        }
    }

    /// Whether the household is taxed jointly as a couple.
    pub fn is_couple(&self) -> bool {
        matches!(self, Self::Marie | Self::Pacse)
    }

    /// Parts before any dependent children are counted.
    pub fn base_parts(&self) -> Decimal {
        if self.is_couple() {
            Decimal::TWO
        } else {
            Decimal::ONE
        }
    }
}

impl fmt::Display for SituationFamiliale {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parse_french_labels_with_accents() {
        assert_eq!(SituationFamiliale::parse("Célibataire"), Some(SituationFamiliale::Celibataire));
        assert_eq!(SituationFamiliale::parse("Mariée"), Some(SituationFamiliale::Marie));
        assert_eq!(SituationFamiliale::parse("pacsé"), Some(SituationFamiliale::Pacse));
    }

    #[test]
    fn parse_english_labels_and_codes() {
        assert_eq!(SituationFamiliale::parse("widowed"), Some(SituationFamiliale::Veuf));
        assert_eq!(SituationFamiliale::parse("D"), Some(SituationFamiliale::Divorce));
        assert_eq!(SituationFamiliale::parse("O"), Some(SituationFamiliale::Pacse));
    }

    #[test]
    fn pacs_serializes_with_its_short_id() {
        let json = serde_json::to_string(&SituationFamiliale::Pacse).unwrap();

        assert_eq!(json, "\"pacs\"");
        assert_eq!(SituationFamiliale::Pacse.to_string(), "pacs");
        for id in ["\"pacs\"", "\"pacse\""] {
            let parsed: SituationFamiliale = serde_json::from_str(id).unwrap();
            assert_eq!(parsed, SituationFamiliale::Pacse);
        }
    }

    #[test]
    fn parse_rejects_unknown_label() {
        assert_eq!(SituationFamiliale::parse("concubin"), None);
    }

    #[test]
    fn base_parts_by_situation() {
        assert_eq!(SituationFamiliale::Celibataire.base_parts(), dec!(1));
        assert_eq!(SituationFamiliale::Divorce.base_parts(), dec!(1));
        assert_eq!(SituationFamiliale::Veuf.base_parts(), dec!(1));
        assert_eq!(SituationFamiliale::Marie.base_parts(), dec!(2));
        assert_eq!(SituationFamiliale::Pacse.base_parts(), dec!(2));
    }
}
