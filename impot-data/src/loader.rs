use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use impot_core::{
    Bracket, BracketTable, CoherenceThresholds, DecoteRule, OFFICIAL_SOURCE, QuotientCap, Regime,
    RegimeDefinition, RegimeTable, RuleTableError, RuleTableSource, RuleTables,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// File names expected in a rule table directory.
pub const BRACKETS_FILE: &str = "brackets.csv";
pub const REGIMES_FILE: &str = "regimes.csv";
pub const SETTINGS_FILE: &str = "settings.toml";

/// Errors that can occur when loading rule table data.
#[derive(Debug, Error)]
pub enum RuleTableLoaderError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("settings section '{0}' is not a tax year")]
    InvalidYear(String),

    #[error("unknown regime '{0}' in regime table")]
    UnknownRegime(String),

    #[error(transparent)]
    Table(#[from] RuleTableError),
}

impl From<csv::Error> for RuleTableLoaderError {
    fn from(err: csv::Error) -> Self {
        RuleTableLoaderError::CsvParse(err.to_string())
    }
}

impl From<toml::de::Error> for RuleTableLoaderError {
    fn from(err: toml::de::Error) -> Self {
        RuleTableLoaderError::TomlParse(err.to_string())
    }
}

impl From<RuleTableLoaderError> for RuleTableError {
    fn from(err: RuleTableLoaderError) -> Self {
        match err {
            RuleTableLoaderError::Table(inner) => inner,
            other => RuleTableError::Source(other.to_string()),
        }
    }
}

/// A single row of `brackets.csv`.
///
/// - `tax_year`: the year of the barème (e.g. 2024)
/// - `lower_bound`: income per part where the band starts
/// - `rate`: marginal rate as a fraction (e.g. 0.11 for 11 %)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub tax_year: i32,
    pub lower_bound: Decimal,
    pub rate: Decimal,
}

/// A single row of `regimes.csv`. `abattement_rate` is left empty for
/// réel regimes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegimeRecord {
    pub tax_year: i32,
    pub regime: String,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub abattement_rate: Option<Decimal>,
    pub social_rate: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn default_abattement_minimum() -> Decimal {
    Decimal::from(305)
}

/// One `[year]` section of `settings.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct YearSettings {
    #[serde(default = "default_abattement_minimum")]
    pub abattement_minimum: Decimal,
    pub source: Option<String>,
    pub decote: Option<DecoteRule>,
    pub quotient_cap: Option<QuotientCap>,
    #[serde(default)]
    pub coherence: CoherenceThresholds,
}

impl Default for YearSettings {
    fn default() -> Self {
        Self {
            abattement_minimum: default_abattement_minimum(),
            source: None,
            decote: None,
            quotient_cap: None,
            coherence: CoherenceThresholds::default(),
        }
    }
}

/// Parsed content of a rule table directory, all years together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTableData {
    pub brackets: Vec<BracketRecord>,
    pub regimes: Vec<RegimeRecord>,
    pub settings: BTreeMap<i32, YearSettings>,
}

impl RuleTableData {
    /// Years with at least one bracket, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.brackets.iter().map(|b| b.tax_year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Builds and validates the tables of `tax_year`. A year without a
    /// settings section gets the default settings.
    pub fn tables_for(
        &self,
        tax_year: i32,
    ) -> Result<RuleTables, RuleTableLoaderError> {
        let brackets: Vec<Bracket> = self
            .brackets
            .iter()
            .filter(|b| b.tax_year == tax_year)
            .map(|b| Bracket::new(b.lower_bound, b.rate))
            .collect();
        if brackets.is_empty() {
            return Err(RuleTableError::UnknownTaxYear(tax_year).into());
        }
        let brackets = BracketTable::new(tax_year, brackets)?;

        let definitions = self
            .regimes
            .iter()
            .filter(|r| r.tax_year == tax_year)
            .map(|r| {
                let regime = Regime::from_str(&r.regime)
                    .map_err(|_| RuleTableLoaderError::UnknownRegime(r.regime.clone()))?;
                Ok(RegimeDefinition::new(regime, r.abattement_rate, r.social_rate))
            })
            .collect::<Result<Vec<_>, RuleTableLoaderError>>()?;
        let regimes = RegimeTable::new(definitions)?;

        let settings = self.settings.get(&tax_year).cloned().unwrap_or_else(|| {
            warn!(tax_year, "no settings section, using defaults");
            YearSettings::default()
        });

        let tables = RuleTables::new(brackets, regimes)
            .with_abattement_minimum(settings.abattement_minimum)
            .with_decote(settings.decote)
            .with_quotient_cap(settings.quotient_cap)
            .with_coherence(settings.coherence)
            .with_source(settings.source.unwrap_or_else(|| OFFICIAL_SOURCE.to_string()));
        tables.validate()?;
        Ok(tables)
    }
}

/// Parser for the rule table files.
pub struct RuleTableLoader;

impl RuleTableLoader {
    /// Parse bracket records from a CSV reader.
    pub fn parse_brackets<R: Read>(reader: R) -> Result<Vec<BracketRecord>, RuleTableLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: BracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Parse regime records from a CSV reader.
    pub fn parse_regimes<R: Read>(reader: R) -> Result<Vec<RegimeRecord>, RuleTableLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: RegimeRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Parse `settings.toml`: one table per tax year.
    pub fn parse_settings(text: &str) -> Result<BTreeMap<i32, YearSettings>, RuleTableLoaderError> {
        let sections: BTreeMap<String, YearSettings> = toml::from_str(text)?;

        sections
            .into_iter()
            .map(|(key, settings)| {
                let year = key
                    .parse::<i32>()
                    .map_err(|_| RuleTableLoaderError::InvalidYear(key.clone()))?;
                Ok((year, settings))
            })
            .collect()
    }

    /// Parse the three files of a rule table directory.
    pub fn parse(
        brackets: &str,
        regimes: &str,
        settings: &str,
    ) -> Result<RuleTableData, RuleTableLoaderError> {
        Ok(RuleTableData {
            brackets: Self::parse_brackets(brackets.as_bytes())?,
            regimes: Self::parse_regimes(regimes.as_bytes())?,
            settings: Self::parse_settings(settings)?,
        })
    }

    /// Read and parse a rule table directory. `settings.toml` is optional.
    pub fn read_dir(dir: &Path) -> Result<RuleTableData, RuleTableLoaderError> {
        let brackets = read_file(&dir.join(BRACKETS_FILE))?;
        let regimes = read_file(&dir.join(REGIMES_FILE))?;
        let settings_path = dir.join(SETTINGS_FILE);
        let settings = if settings_path.exists() {
            read_file(&settings_path)?
        } else {
            debug!(path = %settings_path.display(), "no settings file");
            String::new()
        };

        Self::parse(&brackets, &regimes, &settings)
    }
}

fn read_file(path: &Path) -> Result<String, RuleTableLoaderError> {
    fs::read_to_string(path).map_err(|source| RuleTableLoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Rule tables read from a directory holding `brackets.csv`, `regimes.csv`
/// and optionally `settings.toml`. Files are parsed once, when opened.
#[derive(Debug, Clone)]
pub struct CsvRuleTableSource {
    dir: PathBuf,
    data: RuleTableData,
}

impl CsvRuleTableSource {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RuleTableLoaderError> {
        let dir = dir.into();
        let data = RuleTableLoader::read_dir(&dir)?;
        debug!(dir = %dir.display(), years = ?data.years(), "rule table directory read");
        Ok(Self { dir, data })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RuleTableSource for CsvRuleTableSource {
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
