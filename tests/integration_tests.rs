use chrono::NaiveDate;
use investor_rater::config::PipelineConfig;
use investor_rater::error::{LookupKind, PipelineError, ScoreError};
use investor_rater::loader::{LoadedTables, load_tables};
use investor_rater::pipeline::{run_features, run_score, score_tables};
use investor_rater::scoring::types::{Company, InvestorKey};

const INVESTMENTS: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/investment_relationships.csv"
);
const COMPANIES: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/company_details.csv"
);
const COMPANIES_UNFUNDED: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/company_details_unfunded.csv"
);

fn config() -> PipelineConfig {
    PipelineConfig {
        reference_year: Some(2023),
        seed: Some(42),
        ..Default::default()
    }
}

#[test]
fn test_load_fixture_tables() {
    let tables = load_tables(INVESTMENTS, COMPANIES).expect("Failed to load fixtures");

    assert_eq!(tables.events.len(), 5);
    assert_eq!(tables.rounds.len(), 4);
    let ids: Vec<i64> = tables.companies.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let bloom = &tables.companies[1];
    assert_eq!(bloom.founded_on, NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
    assert_eq!(tables.companies[2].description, "Mobile puzzle games");
}

#[test]
fn test_full_pipeline_company_investor() {
    let (result, run) = run_score(INVESTMENTS, COMPANIES, InvestorKey::Company(100), &config())
        .expect("Failed to score investor");

    // Three companies capped into three groups: every company is its own peer group.
    for f in &run.features {
        assert_eq!(f.performance_in_group, 1.0);
    }

    let first_round = (2.0 + 365.0 / 366.0 + 1.0) / 3.0;
    let expected = (first_round + 0.5 + 1.0) / 3.0;
    assert_eq!(result.matched_events, 3);
    assert!((result.score - expected).abs() < 1e-12);
}

#[test]
fn test_full_pipeline_person_investor() {
    let (result, _) = run_score(INVESTMENTS, COMPANIES, InvestorKey::Person(500), &config())
        .expect("Failed to score investor");
    assert_eq!(result.matched_events, 2);
    assert!((result.score - 0.75).abs() < 1e-12);
}

#[test]
fn test_unknown_investor_is_no_data() {
    let err = run_score(INVESTMENTS, COMPANIES, InvestorKey::Company(999), &config()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Score(ScoreError::NoData {
            investor: InvestorKey::Company(999)
        })
    ));
}

#[test]
fn test_features_single_group_normalization() {
    let config = PipelineConfig {
        n_clusters: 1,
        ..config()
    };
    let features = run_features(INVESTMENTS, COMPANIES, &config).expect("Failed to build features");

    let ages: Vec<i32> = features.iter().map(|f| f.age).collect();
    assert_eq!(ages, vec![5, 4, 7]);
    assert!((features[0].performance - 0.3).abs() < 1e-12);
    assert!((features[1].performance - 1.25).abs() < 1e-12);

    let mean_perf = features.iter().map(|f| f.performance).sum::<f64>() / 3.0;
    for f in &features {
        assert_eq!(f.group, 0);
        assert!((f.performance_in_group * mean_perf - f.performance).abs() < 1e-12);
    }
}

#[test]
fn test_event_for_unknown_company_fails_whole_batch() {
    let mut tables: LoadedTables = load_tables(INVESTMENTS, COMPANIES).unwrap();
    tables.companies.retain(|c: &Company| c.id != 3);

    let err = score_tables(&tables, &config()).unwrap_err();
    match err {
        PipelineError::Score(ScoreError::RowFailures(failures)) => {
            assert_eq!(
                failures.iter().map(|f| f.row).collect::<Vec<_>>(),
                vec![4]
            );
            assert!(matches!(
                failures[0].error,
                ScoreError::NotFound {
                    kind: LookupKind::Company,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unfunded_company_does_not_block_other_investors() {
    let tables = load_tables(INVESTMENTS, COMPANIES_UNFUNDED).expect("Failed to load fixtures");
    assert_eq!(
        tables.companies.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![1, 3]
    );
    assert!(tables.events.iter().all(|e| e.invested_in_company_id != 2));

    let (result, _) = run_score(
        INVESTMENTS,
        COMPANIES_UNFUNDED,
        InvestorKey::Company(100),
        &config(),
    )
    .expect("Failed to score investor");
    let first_round = (2.0 + 365.0 / 366.0 + 1.0) / 3.0;
    assert_eq!(result.matched_events, 2);
    assert!((result.score - (first_round + 0.5) / 2.0).abs() < 1e-12);

    let (person, _) = run_score(
        INVESTMENTS,
        COMPANIES_UNFUNDED,
        InvestorKey::Person(500),
        &config(),
    )
    .expect("Failed to score investor");
    assert!((person.score - 0.75).abs() < 1e-12);
}

#[test]
fn test_same_seed_same_groups() {
    let a = run_features(INVESTMENTS, COMPANIES, &PipelineConfig { n_clusters: 2, ..config() })
        .unwrap();
    let b = run_features(INVESTMENTS, COMPANIES, &PipelineConfig { n_clusters: 2, ..config() })
        .unwrap();
    let groups = |fs: &[investor_rater::scoring::types::CompanyFeatures]| {
        fs.iter().map(|f| f.group).collect::<Vec<_>>()
    };
    assert_eq!(groups(&a), groups(&b));
    assert!(groups(&a).iter().all(|&g| g < 2));
}
