use std::collections::HashMap;

use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::error::ScoreError;
use crate::scoring::grouping::{GroupingParams, group_descriptions};
use crate::scoring::types::{Company, CompanyFeatures};

/// Minimum age in years, so young companies never divide by zero.
pub const MIN_AGE: i32 = 1;

const USD_PER_MILLION: f64 = 1_000_000.0;

#[derive(Debug, Clone)]
pub struct FeatureParams {
    /// Year ages are measured against.
    pub reference_year: i32,
    pub grouping: GroupingParams,
}

/// Whole years between founding and `reference_year`, floored at [`MIN_AGE`].
pub fn company_age(company: &Company, reference_year: i32) -> i32 {
    (reference_year - company.founded_on.year()).max(MIN_AGE)
}

/// Millions raised per funding round per year of age.
///
/// # Errors
///
/// [`ScoreError::Division`] when the company reports zero funding rounds.
pub fn company_performance(company: &Company, age: i32) -> Result<f64, ScoreError> {
    if company.total_funding_rounds_count == 0 {
        return Err(ScoreError::Division {
            company_id: company.id,
            reason: "total_funding_rounds_count is 0".to_string(),
        });
    }
    Ok(company.total_funding_usd
        / (company.total_funding_rounds_count as f64 * age as f64 * USD_PER_MILLION))
}

/// Derives age, performance, peer group and in-group performance for every company.
///
/// Row order and ids are preserved. The number of groups is capped at the
/// number of companies.
///
/// # Errors
///
/// [`ScoreError::InvalidInput`] for an empty table, [`ScoreError::Division`]
/// for a company with zero funding rounds.
#[tracing::instrument(skip_all, fields(companies = companies.len(), reference_year = params.reference_year))]
pub fn build_company_features(
    companies: &[Company],
    params: &FeatureParams,
) -> Result<Vec<CompanyFeatures>, ScoreError> {
    if companies.is_empty() {
        return Err(ScoreError::InvalidInput(
            "company table is empty".to_string(),
        ));
    }

    let ages: Vec<i32> = companies
        .iter()
        .map(|c| company_age(c, params.reference_year))
        .collect();
    let performances = companies
        .iter()
        .zip(&ages)
        .map(|(c, &age)| company_performance(c, age))
        .collect::<Result<Vec<f64>, _>>()?;

    let mut grouping = params.grouping.clone();
    if grouping.n_groups > companies.len() {
        warn!(
            requested = grouping.n_groups,
            companies = companies.len(),
            "Fewer companies than peer groups, capping group count"
        );
        grouping.n_groups = companies.len();
    }
    let descriptions: Vec<&str> = companies.iter().map(|c| c.description.as_str()).collect();
    let groups = group_descriptions(&descriptions, &grouping)?;

    let group_means = group_mean_performance(&groups, &performances);
    for (group, mean) in &group_means {
        debug!(group, mean, "Group mean performance");
    }

    let features: Vec<CompanyFeatures> = companies
        .iter()
        .zip(ages)
        .zip(performances)
        .zip(groups)
        .map(|(((company, age), performance), group)| {
            let mean = group_means[&group];
            let performance_in_group = if mean == 0.0 {
                f64::NAN
            } else {
                performance / mean
            };
            CompanyFeatures {
                id: company.id,
                description: company.description.clone(),
                founded_on: company.founded_on,
                total_funding_usd: company.total_funding_usd,
                total_funding_rounds_count: company.total_funding_rounds_count,
                age,
                performance,
                group,
                performance_in_group,
            }
        })
        .collect();

    info!(
        companies = features.len(),
        groups = group_means.len(),
        "Company features built"
    );
    Ok(features)
}

/// Mean performance per group, each company counted in its own group.
pub fn group_mean_performance(groups: &[usize], performances: &[f64]) -> HashMap<usize, f64> {
    let mut sums: HashMap<usize, (f64, usize)> = HashMap::new();
    for (&g, &p) in groups.iter().zip(performances) {
        let entry = sums.entry(g).or_insert((0.0, 0));
        entry.0 += p;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(g, (sum, n))| (g, sum / n as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn company(id: i64, description: &str, founded: &str, usd: f64, rounds: u32) -> Company {
        Company {
            id,
            description: description.to_string(),
            founded_on: NaiveDate::parse_from_str(founded, "%Y-%m-%d").unwrap(),
            total_funding_usd: usd,
            total_funding_rounds_count: rounds,
        }
    }

    fn params(n_groups: usize) -> FeatureParams {
        FeatureParams {
            reference_year: 2023,
            grouping: GroupingParams {
                n_groups,
                seed: Some(5),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_age_and_performance_example() {
        let a = company(1, "payments", "2021-06-01", 2_000_000.0, 2);
        let age = company_age(&a, 2023);
        assert_eq!(age, 2);
        assert_eq!(company_performance(&a, age).unwrap(), 0.5);
    }

    #[test]
    fn test_age_floor() {
        assert_eq!(company_age(&company(1, "x", "2023-03-01", 1.0, 1), 2023), 1);
        assert_eq!(company_age(&company(1, "x", "2030-03-01", 1.0, 1), 2023), 1);
    }

    #[test]
    fn test_zero_rounds_is_division_error() {
        let c = company(9, "x", "2010-01-01", 5.0, 0);
        let err = build_company_features(&[c], &params(1)).unwrap_err();
        assert!(matches!(err, ScoreError::Division { company_id: 9, .. }));
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(
            build_company_features(&[], &params(20)),
            Err(ScoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_group_count_capped_and_normalization_round_trips() {
        let companies = vec![
            company(1, "cloud storage", "2015-01-01", 8_000_000.0, 2),
            company(2, "cloud storage backup", "2019-01-01", 3_000_000.0, 3),
            company(3, "pet food delivery", "2020-01-01", 1_000_000.0, 1),
            company(4, "pet food subscription", "2001-01-01", 2_200_000.0, 4),
        ];
        let features = build_company_features(&companies, &params(20)).unwrap();
        assert_eq!(features.len(), 4);
        assert_eq!(
            features.iter().map(|f| f.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );

        let groups: Vec<usize> = features.iter().map(|f| f.group).collect();
        let perfs: Vec<f64> = features.iter().map(|f| f.performance).collect();
        let means = group_mean_performance(&groups, &perfs);
        for f in &features {
            assert!(f.age >= 1);
            assert!(f.group < 4);
            let restored = f.performance_in_group * means[&f.group];
            assert!((restored - f.performance).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_group_mean_is_nan() {
        let companies = vec![company(1, "robotics", "2015-01-01", 0.0, 1)];
        let features = build_company_features(&companies, &params(1)).unwrap();
        assert!(features[0].performance_in_group.is_nan());
    }

    #[test]
    fn test_group_mean_includes_self() {
        let means = group_mean_performance(&[0, 0, 1], &[1.0, 3.0, 5.0]);
        assert_eq!(means[&0], 2.0);
        assert_eq!(means[&1], 5.0);
    }
}
