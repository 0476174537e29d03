//! Data types flowing through the scoring pipeline.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A cleaned company row.
#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    pub id: i64,
    pub description: String,
    pub founded_on: NaiveDate,
    pub total_funding_usd: f64,
    pub total_funding_rounds_count: u32,
}

/// A company row with its derived performance features.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyFeatures {
    pub id: i64,
    pub description: String,
    pub founded_on: NaiveDate,
    pub total_funding_usd: f64,
    pub total_funding_rounds_count: u32,
    /// Whole years since founding, never below 1.
    pub age: i32,
    /// Millions raised per round per year of age.
    pub performance: f64,
    pub group: usize,
    /// `performance` relative to the group mean. `NaN` when the group mean is zero.
    pub performance_in_group: f64,
}

/// A cleaned investment relationship: one investor taking part in one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentEvent {
    /// Investing company, or `0` when the investor is a person.
    pub crunchbase_company_id: i64,
    /// Investing person, or `0` when the investor is a company.
    pub crunchbase_person_id: i64,
    pub invested_in_company_id: i64,
    pub series: String,
    /// Total raised in the round, shared by every investor in it.
    pub money_raised_usd: f64,
    pub announced_on: NaiveDate,
    pub is_lead_investor: bool,
}

impl InvestmentEvent {
    /// The round this event belongs to, with the investor stripped off.
    pub fn round(&self) -> Round {
        Round {
            invested_in_company_id: self.invested_in_company_id,
            series: self.series.clone(),
            money_raised_usd: self.money_raised_usd,
            announced_on: self.announced_on,
        }
    }
}

/// One funding round, independent of how many investors took part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    pub invested_in_company_id: i64,
    pub series: String,
    pub money_raised_usd: f64,
    pub announced_on: NaiveDate,
}

/// Identity of a round. Money is compared bitwise so rounds can be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoundKey {
    pub invested_in_company_id: i64,
    pub series: String,
    pub money_bits: u64,
    pub announced_on: NaiveDate,
}

impl Round {
    pub fn key(&self) -> RoundKey {
        RoundKey {
            invested_in_company_id: self.invested_in_company_id,
            series: self.series.clone(),
            money_bits: self.money_raised_usd.to_bits(),
            announced_on: self.announced_on,
        }
    }
}

/// A round with its 1-based position inside its (company, series) partition.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRound {
    pub round: Round,
    pub rank: u32,
}

/// An investment event with its computed score.
#[derive(Debug, Clone)]
pub struct ScoredEvent {
    pub event: InvestmentEvent,
    pub rank: u32,
    pub score: f64,
}

/// Who to aggregate scores for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvestorKey {
    Company(i64),
    Person(i64),
}

impl InvestorKey {
    pub fn kind(&self) -> &'static str {
        match self {
            InvestorKey::Company(_) => "company",
            InvestorKey::Person(_) => "person",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            InvestorKey::Company(id) | InvestorKey::Person(id) => *id,
        }
    }

    /// Whether `event` was made by this investor.
    pub fn matches(&self, event: &InvestmentEvent) -> bool {
        match self {
            InvestorKey::Company(id) => event.crunchbase_company_id == *id,
            InvestorKey::Person(id) => event.crunchbase_person_id == *id,
        }
    }
}

impl fmt::Display for InvestorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} investor {}", self.kind(), self.id())
    }
}

/// Mean score of one investor.
#[derive(Debug, Clone, Serialize)]
pub struct InvestorScore {
    pub investor_kind: &'static str,
    pub investor_id: i64,
    pub score: f64,
    pub matched_events: usize,
}
