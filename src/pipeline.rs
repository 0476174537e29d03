//! One end-to-end run: load, enrich companies, score events, aggregate.

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::loader::{LoadedTables, load_tables};
use crate::scoring::company::build_company_features;
use crate::scoring::investment::score_events;
use crate::scoring::investor::investor_score;
use crate::scoring::rank::rank_rounds;
use crate::scoring::types::{CompanyFeatures, InvestorKey, InvestorScore, ScoredEvent};

/// Intermediate tables of a scoring run, kept for export.
#[derive(Debug)]
pub struct ScoringRun {
    pub features: Vec<CompanyFeatures>,
    pub scored: Vec<ScoredEvent>,
}

/// Enriches the companies and scores every investment event.
///
/// Rounds are ranked in the order they first appear in the input.
pub fn score_tables(
    tables: &LoadedTables,
    config: &PipelineConfig,
) -> Result<ScoringRun, PipelineError> {
    config.validate()?;
    let features = build_company_features(&tables.companies, &config.feature_params())?;
    let ranked = rank_rounds(&tables.rounds);
    let scored = score_events(&tables.events, &features, &ranked)?;
    Ok(ScoringRun { features, scored })
}

/// Loads both tables and builds the enriched company table.
#[tracing::instrument(skip(config))]
pub fn run_features(
    investment_relationship_path: &str,
    company_details_path: &str,
    config: &PipelineConfig,
) -> Result<Vec<CompanyFeatures>, PipelineError> {
    config.validate()?;
    let tables = load_tables(investment_relationship_path, company_details_path)?;
    Ok(build_company_features(
        &tables.companies,
        &config.feature_params(),
    )?)
}

/// Loads both tables, scores every event and returns the investor's mean score.
#[tracing::instrument(skip(config))]
pub fn run_score(
    investment_relationship_path: &str,
    company_details_path: &str,
    investor: InvestorKey,
    config: &PipelineConfig,
) -> Result<(InvestorScore, ScoringRun), PipelineError> {
    let tables = load_tables(investment_relationship_path, company_details_path)?;
    let run = score_tables(&tables, config)?;
    let result = investor_score(&run.scored, investor)?;
    info!(%investor, score = result.score, "Run complete");
    Ok((result, run))
}
