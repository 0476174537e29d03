//! Per-event investment scores.
//!
//! An event scores the round it took part in. When the company raised a next
//! round in the same series, the score averages three signals: growth to the
//! next round, inverse time to it, and company performance discounted by rank.
//! At the end of a series only the last signal remains.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::{LookupKind, RowFailure, ScoreError};
use crate::scoring::types::{
    CompanyFeatures, InvestmentEvent, RankedRound, Round, RoundKey, ScoredEvent,
};
use crate::scoring::utility::years_between;

/// `performance_in_group` by company id.
#[derive(Debug, Default)]
pub struct PerformanceLookup {
    by_company: HashMap<i64, f64>,
}

impl PerformanceLookup {
    pub fn build(features: &[CompanyFeatures]) -> Self {
        Self {
            by_company: features
                .iter()
                .map(|f| (f.id, f.performance_in_group))
                .collect(),
        }
    }

    pub fn get(&self, company_id: i64) -> Result<f64, ScoreError> {
        self.by_company
            .get(&company_id)
            .copied()
            .ok_or_else(|| ScoreError::NotFound {
                kind: LookupKind::Company,
                id: company_id.to_string(),
            })
    }
}

/// Ranked rounds indexed by identity and by (company, series, rank).
#[derive(Debug, Default)]
pub struct RoundIndex {
    rank_by_key: HashMap<RoundKey, u32>,
    by_partition: HashMap<(i64, String), HashMap<u32, Round>>,
}

impl RoundIndex {
    pub fn build(ranked: &[RankedRound]) -> Self {
        let mut index = Self::default();
        for r in ranked {
            index.rank_by_key.entry(r.round.key()).or_insert(r.rank);
            index
                .by_partition
                .entry((r.round.invested_in_company_id, r.round.series.clone()))
                .or_default()
                .entry(r.rank)
                .or_insert_with(|| r.round.clone());
        }
        index
    }

    pub fn rank_of(&self, round: &Round) -> Result<u32, ScoreError> {
        self.rank_by_key
            .get(&round.key())
            .copied()
            .ok_or_else(|| ScoreError::NotFound {
                kind: LookupKind::Round,
                id: format!(
                    "{}/{}/{}",
                    round.invested_in_company_id, round.series, round.announced_on
                ),
            })
    }

    pub fn get(&self, company_id: i64, series: &str, rank: u32) -> Option<&Round> {
        self.by_partition
            .get(&(company_id, series.to_string()))?
            .get(&rank)
    }
}

/// Score of a round given the company's in-group performance and the next round, if any.
///
/// # Errors
///
/// [`ScoreError::Division`] if the current round raised nothing,
/// [`ScoreError::InvalidDateRange`] if the next round is not strictly later.
pub fn round_score(
    overall: f64,
    rank: u32,
    current: &Round,
    next: Option<&Round>,
) -> Result<f64, ScoreError> {
    let positional = overall / rank as f64;
    let Some(next) = next else {
        return Ok(positional);
    };

    if current.money_raised_usd == 0.0 {
        return Err(ScoreError::Division {
            company_id: current.invested_in_company_id,
            reason: format!(
                "series '{}' round {} raised 0 USD, growth is undefined",
                current.series, rank
            ),
        });
    }
    let growth = next.money_raised_usd / current.money_raised_usd;

    let duration = years_between(current.announced_on, next.announced_on);
    if duration <= 0.0 {
        return Err(ScoreError::InvalidDateRange {
            company_id: current.invested_in_company_id,
            series: current.series.clone(),
            from: current.announced_on,
            to: next.announced_on,
        });
    }

    Ok((growth + 1.0 / duration + positional) / 3.0)
}

/// Scores one event against prebuilt lookups. Returns the round's rank and the score.
pub fn score_event(
    event: &InvestmentEvent,
    performance: &PerformanceLookup,
    rounds: &RoundIndex,
) -> Result<(u32, f64), ScoreError> {
    let overall = performance.get(event.invested_in_company_id)?;
    let round = event.round();
    let rank = rounds.rank_of(&round)?;
    let next = rounds.get(round.invested_in_company_id, &round.series, rank + 1);
    let score = round_score(overall, rank, &round, next)?;
    Ok((rank, score))
}

/// Scores every event independently, one result per input row.
pub fn score_events_each(
    events: &[InvestmentEvent],
    features: &[CompanyFeatures],
    ranked: &[RankedRound],
) -> Vec<Result<ScoredEvent, ScoreError>> {
    let performance = PerformanceLookup::build(features);
    let rounds = RoundIndex::build(ranked);
    events
        .iter()
        .map(|event| {
            score_event(event, &performance, &rounds).map(|(rank, score)| ScoredEvent {
                event: event.clone(),
                rank,
                score,
            })
        })
        .collect()
}

/// Scores every event, failing with one [`ScoreError::RowFailures`] that names
/// every row that could not be scored.
#[tracing::instrument(skip_all, fields(events = events.len(), rounds = ranked.len()))]
pub fn score_events(
    events: &[InvestmentEvent],
    features: &[CompanyFeatures],
    ranked: &[RankedRound],
) -> Result<Vec<ScoredEvent>, ScoreError> {
    let mut scored = Vec::with_capacity(events.len());
    let mut failures = Vec::new();

    for (row, result) in score_events_each(events, features, ranked)
        .into_iter()
        .enumerate()
    {
        match result {
            Ok(s) => scored.push(s),
            Err(error) => {
                warn!(row, error = %error, "Investment event could not be scored");
                failures.push(RowFailure { row, error });
            }
        }
    }

    if !failures.is_empty() {
        return Err(ScoreError::RowFailures(failures));
    }
    info!(scored = scored.len(), "Investment events scored");
    Ok(scored)
}
