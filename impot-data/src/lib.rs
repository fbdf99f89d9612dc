//! Rule table configuration for the impot engine: CSV barème and regime
//! tables, TOML per-year settings, and the official tables compiled in.

mod embedded;
mod loader;

pub use embedded::{EmbeddedRuleTables, official_store};
pub use loader::{
    BRACKETS_FILE, BracketRecord, CsvRuleTableSource, REGIMES_FILE, RegimeRecord,
    RuleTableData, RuleTableLoader, RuleTableLoaderError, SETTINGS_FILE, YearSettings,
};
