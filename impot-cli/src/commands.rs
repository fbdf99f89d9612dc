use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use impot_core::{
    CalculationInput, CalculationResult, Consolidation, Consolidator, ExtractedFieldSet,
    RuleTableSource, RuleTableStore, RuleTables, SchemaRegistry, StoredFieldSet, calculate_input,
};
use impot_data::{CsvRuleTableSource, EmbeddedRuleTables};
use tracing::{debug, info};

// ─── inputs ──────────────────────────────────────────────────────────────────

/// Builds the rule table store: the CSV/TOML tables in `rules_dir` when
/// given, the tables compiled into the binary otherwise.
pub fn open_store(rules_dir: Option<&Path>) -> Result<RuleTableStore> {
    match rules_dir {
        Some(dir) => {
            let source = CsvRuleTableSource::open(dir)
                .with_context(|| format!("Failed to load rule tables from: {}", dir.display()))?;
            info!(dir = %dir.display(), years = ?source.available_years(), "rule tables loaded");
            Ok(RuleTableStore::new(Box::new(source)))
        }
        None => {
            let source = EmbeddedRuleTables::new().context("Embedded rule tables are invalid")?;
            debug!("using embedded rule tables");
            Ok(RuleTableStore::new(Box::new(source)))
        }
    }
}

pub fn parse_request(json: &str) -> Result<CalculationInput> {
    serde_json::from_str(json).context("Failed to parse calculation request")
}

/// Decodes a JSON array of stored documents, re-validating every one of
/// them against the built-in schemas. Order is preserved: later documents
/// win over earlier ones during consolidation.
pub fn parse_documents(json: &str) -> Result<Vec<ExtractedFieldSet>> {
    let stored: Vec<StoredFieldSet> =
        serde_json::from_str(json).context("Failed to parse extracted documents")?;
    let registry = SchemaRegistry::builtin();

    stored
        .into_iter()
        .enumerate()
        .map(|(index, document)| {
            document
                .decode(&registry)
                .with_context(|| format!("Document #{} failed validation", index + 1))
        })
        .collect()
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to open: {}", path.display()))
}

pub fn read_request(path: &Path) -> Result<CalculationInput> {
    parse_request(&read_file(path)?).with_context(|| format!("In file: {}", path.display()))
}

pub fn read_documents(path: &Path) -> Result<Vec<ExtractedFieldSet>> {
    parse_documents(&read_file(path)?).with_context(|| format!("In file: {}", path.display()))
}

// ─── commands ────────────────────────────────────────────────────────────────

/// `impot calculate`
pub fn calculate(
    store: &RuleTableStore,
    input: &CalculationInput,
    documents: Vec<ExtractedFieldSet>,
) -> Result<CalculationResult> {
    debug!(
        tax_year = input.tax_year,
        documents = documents.len(),
        "running calculation"
    );
    let result = calculate_input(store, input, documents)
        .with_context(|| format!("Calculation failed for tax year {}", input.tax_year))?;
    info!(
        impot_net = %result.impot.impot_net,
        warnings = result.warnings.len(),
        "calculation complete"
    );
    Ok(result)
}

/// `impot consolidate`: documents first, then the request values as
/// overrides when a request is given.
pub fn consolidate(
    documents: Vec<ExtractedFieldSet>,
    input: Option<&CalculationInput>,
) -> Result<Consolidation> {
    let mut consolidator = Consolidator::new();
    for document in documents {
        consolidator.ingest(document);
    }
    if let Some(input) = input {
        consolidator.apply_input(input);
    }
    consolidator
        .consolidate()
        .context("Failed to consolidate documents")
}

/// `impot rules`: one year, or every year the store knows about.
pub fn rules(
    store: &RuleTableStore,
    year: Option<i32>,
) -> Result<Vec<Arc<RuleTables>>> {
    let years = match year {
        Some(year) => vec![year],
        None => store.available_years(),
    };
    years
        .into_iter()
        .map(|year| {
            store
                .get(year)
                .with_context(|| format!("No rule tables for tax year {year}"))
        })
        .collect()
}

/// Pretty JSON for stdout.
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}
