mod bracket;
mod profile;
mod regime;
mod request;
mod result;
mod rule_tables;
mod situation;

pub use bracket::{Bracket, BracketTable};
pub use profile::{FieldSource, FiscalProfile};
pub use regime::{ActivityFamily, Regime, RegimeDefinition};
pub use request::{
    CalculationInput, DeductionsInput, IncomeInput, PersonInput, SocialInput,
    TaxCalculationRequest,
};
pub use result::{
    CalculationMetadata, CalculationResult, Comparisons, DISCLAIMER, IncomeTaxResult,
    ReasonKind, Recommendation, RecommendationReason, RegimeComparison, SocialContributions,
};
pub use rule_tables::{
    CoherenceThresholds, DecoteRule, OFFICIAL_SOURCE, QuotientCap, RegimeTable, RuleTables,
};
pub use situation::SituationFamiliale;
