//! Output formatting and persistence for scoring results.
//!
//! Supports pretty-printing, JSON logging, CSV table export and CSV append.

use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::scoring::types::{InvestorScore, ScoredEvent};

/// One line of the run log appended by the `score` command.
#[derive(Debug, Serialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub investor_kind: String,
    pub investor_id: i64,
    pub score: f64,
    pub matched_events: usize,
    pub reference_year: i32,
    pub seed: Option<u64>,
}

impl RunRecord {
    pub fn new(result: &InvestorScore, reference_year: i32, seed: Option<u64>) -> Self {
        RunRecord {
            timestamp: Utc::now(),
            investor_kind: result.investor_kind.to_string(),
            investor_id: result.investor_id,
            score: result.score,
            matched_events: result.matched_events,
            reference_year,
            seed,
        }
    }
}

/// Flat CSV row for a scored investment event.
#[derive(Debug, Serialize)]
pub struct ScoredEventRow<'a> {
    pub crunchbase_company_id: i64,
    pub crunchbase_person_id: i64,
    pub invested_in_company_id: i64,
    pub series: &'a str,
    pub money_raised_usd: f64,
    pub announced_on: NaiveDate,
    pub is_lead_investor: bool,
    pub rank: u32,
    pub score: f64,
}

impl<'a> From<&'a ScoredEvent> for ScoredEventRow<'a> {
    fn from(s: &'a ScoredEvent) -> Self {
        ScoredEventRow {
            crunchbase_company_id: s.event.crunchbase_company_id,
            crunchbase_person_id: s.event.crunchbase_person_id,
            invested_in_company_id: s.event.invested_in_company_id,
            series: &s.event.series,
            money_raised_usd: s.event.money_raised_usd,
            announced_on: s.event.announced_on,
            is_lead_investor: s.event.is_lead_investor,
            rank: s.rank,
            score: s.score,
        }
    }
}

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `rows` to a fresh CSV file at `path`, headers included.
pub fn write_records<T: Serialize>(path: &str, rows: impl IntoIterator<Item = T>) -> Result<usize> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    info!(path, rows = count, "CSV written");
    Ok(count)
}

/// Appends a [`RunRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &RunRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::types::InvestmentEvent;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn record() -> RunRecord {
        RunRecord::new(
            &InvestorScore {
                investor_kind: "person",
                investor_id: 12,
                score: 1.5,
                matched_events: 2,
            },
            2023,
            Some(42),
        )
    }

    fn scored_event() -> ScoredEvent {
        ScoredEvent {
            event: InvestmentEvent {
                crunchbase_company_id: 3,
                crunchbase_person_id: 0,
                invested_in_company_id: 9,
                series: "seed".into(),
                money_raised_usd: 1000.0,
                announced_on: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                is_lead_investor: true,
            },
            rank: 1,
            score: 0.25,
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&record());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&record()).unwrap();
    }

    #[test]
    fn test_write_records_scored_events() {
        let path = temp_path("investor_rater_test_scores.csv");
        let events = vec![scored_event(), scored_event()];

        let written = write_records(&path, events.iter().map(ScoredEventRow::from)).unwrap();
        assert_eq!(written, 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("crunchbase_company_id,"));
        assert!(lines[1].contains("2020-01-01"));
        assert!(lines[1].ends_with(",1,0.25"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("investor_rater_test_header.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &record()).unwrap();
        append_record(&path, &record()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // Header line should appear exactly once
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
