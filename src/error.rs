//! Error types shared by the loader, the scoring core and the pipeline.

use std::fmt;
use std::io;

use chrono::NaiveDate;
use thiserror::Error;

use crate::scoring::types::InvestorKey;

/// What kind of record a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Company,
    Round,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::Company => f.write_str("company"),
            LookupKind::Round => f.write_str("round"),
        }
    }
}

/// A scoring error attached to the input row that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row: usize,
    pub error: ScoreError,
}

/// Errors raised by the feature builder, the scorer and the aggregator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("division precondition violated for company {company_id}: {reason}")]
    Division { company_id: i64, reason: String },

    #[error(
        "invalid date range for company {company_id} series '{series}': next round on {to} is not after {from}"
    )]
    InvalidDateRange {
        company_id: i64,
        series: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: LookupKind, id: String },

    #[error("no scored investments found for {investor}")]
    NoData { investor: InvestorKey },

    #[error("{} row(s) failed to score: {}", .0.len(), summarize(.0))]
    RowFailures(Vec<RowFailure>),
}

fn summarize(failures: &[RowFailure]) -> String {
    const SHOWN: usize = 5;
    let mut parts: Vec<String> = failures
        .iter()
        .take(SHOWN)
        .map(|f| format!("row {}: {}", f.row, f.error))
        .collect();
    if failures.len() > SHOWN {
        parts.push(format!("… and {} more", failures.len() - SHOWN));
    }
    parts.join("; ")
}

/// Errors raised while reading and cleaning the raw CSV tables.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("malformed CSV in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} row {row}: cannot parse column '{column}' from '{value}'")]
    Parse {
        path: String,
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Errors raised while loading or validating the pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Any failure of a full pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Score(#[from] ScoreError),
}
