use tracing::info;

use crate::error::ScoreError;
use crate::scoring::types::{InvestorKey, InvestorScore, ScoredEvent};
use crate::scoring::utility::mean;

/// Mean event score of one investor.
///
/// # Errors
///
/// [`ScoreError::InvalidInput`] for the `0` sentinel id, [`ScoreError::NoData`]
/// when the investor made none of the scored investments.
pub fn investor_score(
    scored: &[ScoredEvent],
    investor: InvestorKey,
) -> Result<InvestorScore, ScoreError> {
    if investor.id() == 0 {
        return Err(ScoreError::InvalidInput(format!(
            "{} id 0 is the empty-investor sentinel",
            investor.kind()
        )));
    }

    let scores: Vec<f64> = scored
        .iter()
        .filter(|s| investor.matches(&s.event))
        .map(|s| s.score)
        .collect();
    let score = mean(&scores).ok_or(ScoreError::NoData { investor })?;

    info!(%investor, score, matched = scores.len(), "Investor scored");
    Ok(InvestorScore {
        investor_kind: investor.kind(),
        investor_id: investor.id(),
        score,
        matched_events: scores.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::types::InvestmentEvent;
    use chrono::NaiveDate;

    fn scored(company: i64, person: i64, score: f64) -> ScoredEvent {
        ScoredEvent {
            event: InvestmentEvent {
                crunchbase_company_id: company,
                crunchbase_person_id: person,
                invested_in_company_id: 1,
                series: "a".into(),
                money_raised_usd: 1.0,
                announced_on: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                is_lead_investor: false,
            },
            rank: 1,
            score,
        }
    }

    #[test]
    fn test_mean_over_matching_company() {
        let rows = vec![
            scored(5, 0, 1.0),
            scored(5, 0, 2.0),
            scored(6, 0, 100.0),
            scored(5, 0, 3.0),
        ];
        let result = investor_score(&rows, InvestorKey::Company(5)).unwrap();
        assert_eq!(result.score, 2.0);
        assert_eq!(result.matched_events, 3);
        assert_eq!(result.investor_kind, "company");
    }

    #[test]
    fn test_person_key_uses_person_column() {
        let rows = vec![scored(0, 5, 4.0), scored(5, 0, 1.0)];
        let result = investor_score(&rows, InvestorKey::Person(5)).unwrap();
        assert_eq!(result.score, 4.0);
        assert_eq!(result.matched_events, 1);
    }

    #[test]
    fn test_no_matches_is_no_data() {
        let rows = vec![scored(5, 0, 1.0)];
        assert_eq!(
            investor_score(&rows, InvestorKey::Person(77)).unwrap_err(),
            ScoreError::NoData {
                investor: InvestorKey::Person(77)
            }
        );
    }

    #[test]
    fn test_sentinel_id_rejected() {
        let rows = vec![scored(0, 5, 1.0)];
        assert!(matches!(
            investor_score(&rows, InvestorKey::Company(0)),
            Err(ScoreError::InvalidInput(_))
        ));
    }
}
