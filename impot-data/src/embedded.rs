use impot_core::{RuleTableError, RuleTableSource, RuleTableStore, RuleTables};

use crate::loader::{RuleTableData, RuleTableLoader, RuleTableLoaderError};

const BRACKETS_CSV: &str = include_str!("../tables/brackets.csv");
const REGIMES_CSV: &str = include_str!("../tables/regimes.csv");
const SETTINGS_TOML: &str = include_str!("../tables/settings.toml");

/// The official 2023, 2024 and 2025 tables, compiled into the binary.
#[derive(Debug, Clone)]
pub struct EmbeddedRuleTables {
    data: RuleTableData,
}

impl EmbeddedRuleTables {
    pub fn new() -> Result<Self, RuleTableLoaderError> {
        let data = RuleTableLoader::parse(BRACKETS_CSV, REGIMES_CSV, SETTINGS_TOML)?;
        Ok(Self { data })
    }
}

impl RuleTableSource for EmbeddedRuleTables {
    fn load(
        &self,
        tax_year: i32,
    ) -> Result<RuleTables, RuleTableError> {
        Ok(self.data.tables_for(tax_year)?)
    }

    fn available_years(&self) -> Vec<i32> {
        self.data.years()
    }
}

/// A store serving the embedded official tables.
pub fn official_store() -> Result<RuleTableStore, RuleTableLoaderError> {
    Ok(RuleTableStore::new(Box::new(EmbeddedRuleTables::new()?)))
}
