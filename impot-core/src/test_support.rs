//! Fixtures shared by the unit tests: the 2024 official tables.

use rust_decimal_macros::dec;

use crate::models::{
    Bracket, BracketTable, FiscalProfile, Regime, RegimeDefinition, RegimeTable, RuleTables,
};

pub(crate) fn brackets_2024() -> BracketTable {
    BracketTable::new(
        2024,
        vec![
            Bracket::new(dec!(0), dec!(0)),
            Bracket::new(dec!(11294), dec!(0.11)),
            Bracket::new(dec!(28797), dec!(0.30)),
            Bracket::new(dec!(82341), dec!(0.41)),
            Bracket::new(dec!(177106), dec!(0.45)),
        ],
    )
    .unwrap()
}

pub(crate) fn regime_definitions_2024() -> Vec<RegimeDefinition> {
    vec![
        RegimeDefinition::new(Regime::MicroBnc, Some(dec!(0.34)), dec!(0.218)),
        RegimeDefinition::new(Regime::MicroBicService, Some(dec!(0.50)), dec!(0.212)),
        RegimeDefinition::new(Regime::MicroBicVente, Some(dec!(0.71)), dec!(0.123)),
        RegimeDefinition::new(Regime::ReelBnc, None, dec!(0.45)),
        RegimeDefinition::new(Regime::ReelBic, None, dec!(0.45)),
    ]
}

pub(crate) fn tables_2024() -> RuleTables {
    let regimes = RegimeTable::new(regime_definitions_2024()).unwrap();
    RuleTables::new(brackets_2024(), regimes).with_abattement_minimum(dec!(305))
}

/// Single filer, one part, micro-BNC, nothing else declared.
pub(crate) fn micro_bnc_profile(professional_gross: rust_decimal::Decimal) -> FiscalProfile {
    let mut profile = FiscalProfile::new(dec!(1), Regime::MicroBnc);
    profile.professional_gross = professional_gross;
    profile.urssaf_declared_ca = professional_gross;
    profile
}
