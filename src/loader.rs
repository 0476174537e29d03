//! Loading and cleaning of the raw investment and company CSV tables.
//!
//! Files ending in `.gz` are decompressed on the fly. Unknown columns are
//! ignored, so raw exports can be fed in without pruning.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::scoring::rank::investments_only;
use crate::scoring::types::{Company, InvestmentEvent, Round};

/// Raw investment relationship row; every column is optional text.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInvestment {
    crunchbase_company_id: Option<String>,
    crunchbase_person_id: Option<String>,
    invested_in_company_id: Option<String>,
    series: Option<String>,
    money_raised_usd: Option<String>,
    announced_on: Option<String>,
    is_lead_investor: Option<String>,
}

/// Raw company details row.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCompany {
    id: Option<String>,
    description: Option<String>,
    short_description: Option<String>,
    name: Option<String>,
    founded_on: Option<String>,
    total_funding_usd: Option<String>,
    total_funding_rounds_count: Option<String>,
}

/// Everything the scoring core needs for one run.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    /// One row per investor per round, in file order.
    pub events: Vec<InvestmentEvent>,
    /// One row per distinct round, in first-seen order.
    pub rounds: Vec<Round>,
    /// Invested-in companies only.
    pub companies: Vec<Company>,
}

/// Reads both tables and derives the investments-only view.
///
/// Events whose invested-in company did not survive loading (no details row,
/// or dropped for reporting no funding rounds) are removed, so every kept
/// event points into `companies`.
#[tracing::instrument]
pub fn load_tables(
    investment_relationship_path: &str,
    company_details_path: &str,
) -> Result<LoadedTables, LoadError> {
    let mut events = load_investments(investment_relationship_path)?;
    let companies = load_companies(company_details_path, &events)?;
    retain_known_companies(&mut events, &companies);
    let rounds = investments_only(&events);
    info!(
        events = events.len(),
        rounds = rounds.len(),
        companies = companies.len(),
        "Input tables loaded"
    );
    Ok(LoadedTables {
        events,
        rounds,
        companies,
    })
}

/// Drops events for companies missing from `companies`.
fn retain_known_companies(events: &mut Vec<InvestmentEvent>, companies: &[Company]) {
    let known: HashSet<i64> = companies.iter().map(|c| c.id).collect();
    let before = events.len();
    let mut orphaned = HashSet::new();
    events.retain(|e| {
        let keep = known.contains(&e.invested_in_company_id);
        if !keep {
            orphaned.insert(e.invested_in_company_id);
        }
        keep
    });
    let dropped = before - events.len();
    if dropped > 0 {
        warn!(
            dropped,
            companies = orphaned.len(),
            "Dropped investment rows for companies without usable details"
        );
    }
}

fn open_reader(path: &str) -> Result<csv::Reader<Box<dyn Read>>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_string(),
        source,
    })?;
    let input: Box<dyn Read> = if path.ends_with(".gz") {
        debug!(path, "Reading gzip-compressed CSV");
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(csv::ReaderBuilder::new().flexible(true).from_reader(input))
}

/// Non-blank trimmed content of an optional field.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parses an integer that may have been exported as a float (`"123.0"`).
fn parse_int(value: &str) -> Option<i64> {
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// Parses the `YYYY-MM-DD` prefix of a date or timestamp string.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let prefix: String = value.trim().chars().take(10).collect();
    NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()
}

fn parse_bool(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("true" | "t" | "1" | "1.0" | "yes")
    )
}

struct RowContext<'a> {
    path: &'a str,
    row: usize,
}

impl RowContext<'_> {
    fn parse_error(&self, column: &'static str, value: &str) -> LoadError {
        LoadError::Parse {
            path: self.path.to_string(),
            row: self.row,
            column,
            value: value.to_string(),
        }
    }

    /// Empty ids become the `0` sentinel.
    fn id_or_zero(&self, column: &'static str, value: &Option<String>) -> Result<i64, LoadError> {
        match present(value) {
            None => Ok(0),
            Some(v) => parse_int(v).ok_or_else(|| self.parse_error(column, v)),
        }
    }

    fn float_or_zero(&self, column: &'static str, value: &Option<String>) -> Result<f64, LoadError> {
        match present(value) {
            None => Ok(0.0),
            Some(v) => v.parse::<f64>().map_err(|_| self.parse_error(column, v)),
        }
    }
}

/// Loads the investment relationship table.
///
/// Id columns default to `0`, money to `0.0`. Rows without a parseable
/// `announced_on` cannot be ranked and are skipped. A zero-money round that
/// has a next round fails scoring, so missing amounts are counted and logged.
pub fn load_investments(path: &str) -> Result<Vec<InvestmentEvent>, LoadError> {
    let mut reader = open_reader(path)?;
    let mut events = Vec::new();
    let mut skipped = 0usize;
    let mut missing_money = 0usize;

    for (i, result) in reader.deserialize::<RawInvestment>().enumerate() {
        let raw = result.map_err(|source| LoadError::Csv {
            path: path.to_string(),
            source,
        })?;
        let ctx = RowContext { path, row: i + 1 };

        let Some(announced_on) = present(&raw.announced_on).and_then(parse_date) else {
            skipped += 1;
            continue;
        };
        if present(&raw.money_raised_usd).is_none() {
            missing_money += 1;
        }

        events.push(InvestmentEvent {
            crunchbase_company_id: ctx.id_or_zero("crunchbase_company_id", &raw.crunchbase_company_id)?,
            crunchbase_person_id: ctx.id_or_zero("crunchbase_person_id", &raw.crunchbase_person_id)?,
            invested_in_company_id: ctx
                .id_or_zero("invested_in_company_id", &raw.invested_in_company_id)?,
            series: present(&raw.series).unwrap_or_default().to_string(),
            money_raised_usd: ctx.float_or_zero("money_raised_usd", &raw.money_raised_usd)?,
            announced_on,
            is_lead_investor: parse_bool(present(&raw.is_lead_investor)),
        });
    }

    if skipped > 0 {
        warn!(path, skipped, "Skipped investment rows without a valid announced_on");
    }
    if missing_money > 0 {
        warn!(path, missing_money, "Investment rows without money_raised_usd read as 0");
    }
    info!(path, rows = events.len(), "Investment relationships loaded");
    Ok(events)
}

/// Loads company details for the companies that appear in `events`.
///
/// The description falls back to the short description, then the name.
/// A missing founding date is replaced by the company's earliest investment
/// date. Companies reporting fewer than one funding round are dropped.
pub fn load_companies(path: &str, events: &[InvestmentEvent]) -> Result<Vec<Company>, LoadError> {
    let mut first_investment: HashMap<i64, NaiveDate> = HashMap::new();
    for e in events {
        first_investment
            .entry(e.invested_in_company_id)
            .and_modify(|d| *d = (*d).min(e.announced_on))
            .or_insert(e.announced_on);
    }

    let mut reader = open_reader(path)?;
    let mut companies = Vec::new();
    let mut seen = HashSet::new();
    let mut proxied = 0usize;
    let mut dropped = 0usize;

    for (i, result) in reader.deserialize::<RawCompany>().enumerate() {
        let raw = result.map_err(|source| LoadError::Csv {
            path: path.to_string(),
            source,
        })?;
        let ctx = RowContext { path, row: i + 1 };

        let id_text = present(&raw.id).unwrap_or_default();
        let id = parse_int(id_text).ok_or_else(|| ctx.parse_error("id", id_text))?;
        let Some(&first_investment_on) = first_investment.get(&id) else {
            continue;
        };
        if !seen.insert(id) {
            warn!(path, id, "Duplicate company id, keeping the first row");
            continue;
        }

        let rounds = match present(&raw.total_funding_rounds_count) {
            None => 0,
            Some(v) => parse_int(v).ok_or_else(|| ctx.parse_error("total_funding_rounds_count", v))?,
        };
        if rounds < 1 {
            dropped += 1;
            debug!(id, rounds, "Dropping company without funding rounds");
            continue;
        }

        let founded_on = match present(&raw.founded_on).and_then(parse_date) {
            Some(d) => d,
            None => {
                proxied += 1;
                first_investment_on
            }
        };

        let description = present(&raw.description)
            .or_else(|| present(&raw.short_description))
            .or_else(|| present(&raw.name))
            .unwrap_or_default()
            .to_string();

        companies.push(Company {
            id,
            description,
            founded_on,
            total_funding_usd: ctx.float_or_zero("total_funding_usd", &raw.total_funding_usd)?,
            total_funding_rounds_count: u32::try_from(rounds)
                .map_err(|_| ctx.parse_error("total_funding_rounds_count", &rounds.to_string()))?,
        });
    }

    if dropped > 0 {
        warn!(path, dropped, "Dropped companies reporting no funding rounds");
    }
    info!(
        path,
        rows = companies.len(),
        proxied_founding_dates = proxied,
        "Company details loaded"
    );
    Ok(companies)
}
