use tracing::debug;

use crate::calculations::coherence::CoherenceValidator;
use crate::calculations::comparator::RegimeComparator;
use crate::calculations::income_tax::IncomeTaxCalculator;
use crate::calculations::social::SocialContributionsCalculator;
use crate::consolidation::{Consolidation, Consolidator, ExtractedFieldSet};
use crate::error::EngineError;
use crate::models::{
    CalculationInput, CalculationMetadata, CalculationResult, Comparisons, FiscalProfile,
    RuleTables, TaxCalculationRequest,
};
use crate::rules::RuleTableStore;

/// Assembles a full [`CalculationResult`] from a consolidated profile and
/// the rule tables of one tax year.
#[derive(Debug, Clone, Copy)]
pub struct TaxEngine<'a> {
    tables: &'a RuleTables,
}

impl<'a> TaxEngine<'a> {
    pub fn new(tables: &'a RuleTables) -> Self {
        Self { tables }
    }

    /// Runs every calculator on the consolidated profile. Consolidation
    /// diagnostics lead the warnings, coherence warnings follow.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] when the profile cannot be taxed (e.g.
    /// non-positive `nb_parts`).
    pub fn calculate(
        &self,
        consolidation: &Consolidation,
    ) -> Result<CalculationResult, EngineError> {
        self.assemble(&consolidation.profile, consolidation.warnings())
    }

    /// Same as [`TaxEngine::calculate`] for a profile built elsewhere.
    pub fn calculate_profile(
        &self,
        profile: &FiscalProfile,
    ) -> Result<CalculationResult, EngineError> {
        self.assemble(profile, Vec::new())
    }

    fn assemble(
        &self,
        profile: &FiscalProfile,
        mut warnings: Vec<String>,
    ) -> Result<CalculationResult, EngineError> {
        let request = TaxCalculationRequest::from_profile(profile, self.tables.tax_year);

        let impot = IncomeTaxCalculator::new(self.tables).calculate(&request)?;
        let socials = SocialContributionsCalculator::new(self.tables).calculate(&request);
        let micro_vs_reel = RegimeComparator::new(self.tables).compare(&request)?;
        warnings.extend(CoherenceValidator::new(self.tables).validate(profile));

        debug!(
            tax_year = self.tables.tax_year,
            impot_net = %impot.impot_net,
            warnings = warnings.len(),
            "calculation assembled"
        );

        Ok(CalculationResult {
            impot,
            socials,
            comparisons: Comparisons { micro_vs_reel },
            warnings,
            metadata: CalculationMetadata::new(self.tables.source.clone(), self.tables.tax_year),
        })
    }
}

/// Full pipeline for one wire request: ingests `documents` in order,
/// applies the request values as user overrides, consolidates, fetches the
/// year's tables from `store` and calculates.
///
/// # Errors
///
/// Validation errors from consolidation or calculation, rule table errors
/// when the year cannot be loaded.
pub fn calculate_input(
    store: &RuleTableStore,
    input: &CalculationInput,
    documents: impl IntoIterator<Item = ExtractedFieldSet>,
) -> Result<CalculationResult, EngineError> {
    let mut consolidator = Consolidator::new();
    for document in documents {
        consolidator.ingest(document);
    }
    consolidator.apply_input(input);
    let consolidation = consolidator.consolidate()?;

    let tables = store.get(input.tax_year)?;
    TaxEngine::new(&tables).calculate(&consolidation)
}
