//! Sequential ranking of funding rounds within a company's series.
//!
//! Rank is defined over input order. Callers that want calendar order must
//! sort first, e.g. with [`sort_chronologically`].

use std::collections::{HashMap, HashSet};

use crate::scoring::types::{InvestmentEvent, RankedRound, Round};

/// Builds the investments-only view: one row per distinct round, first occurrence wins.
pub fn investments_only(events: &[InvestmentEvent]) -> Vec<Round> {
    let mut seen = HashSet::new();
    events
        .iter()
        .map(InvestmentEvent::round)
        .filter(|round| seen.insert(round.key()))
        .collect()
}

/// Stable sort by announcement date; same-day rounds keep their relative order.
pub fn sort_chronologically(rounds: &mut [Round]) {
    rounds.sort_by_key(|r| r.announced_on);
}

/// Assigns `1 + (earlier rows with the same company and series)` to every round.
pub fn rank_rounds(rounds: &[Round]) -> Vec<RankedRound> {
    let mut seen: HashMap<(i64, &str), u32> = HashMap::new();
    rounds
        .iter()
        .map(|round| {
            let count = seen
                .entry((round.invested_in_company_id, round.series.as_str()))
                .or_insert(0);
            *count += 1;
            RankedRound {
                round: round.clone(),
                rank: *count,
            }
        })
        .collect()
}
