//! Case-line reader: one row per recorded case.
//!
//! The national dataset carries a case date, an age-bracket label, a death
//! flag and (for deaths) a death date. Two products are derived from it:
//!
//! - per-day national Confirmed/Deaths series (incremental counts)
//! - the age-stratified table joined against population sizes
//!
//! Per-row date resolution, in order: death date (for death rows), case
//! date, replication (aggregation) date. Rows with no resolvable date are
//! skipped and counted, not fatal — a handful of malformed lines must not
//! abort a half-million-row ingest.

use std::io::Read;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{AGE_BRACKETS, AgeBand, AgeStratifiedTable, CanonicalObservation, Metric};
use crate::error::AppError;
use crate::io::parse_date;

/// Age-bracket label used by the source for unknown ages; excluded from the
/// stratified table.
const UNKNOWN_BRACKET: &str = "Unbekannt";

#[derive(Debug, Deserialize)]
struct CaseLineRow {
    #[serde(default)]
    replikation_dt: Option<String>,
    #[serde(default)]
    fall_dt: Option<String>,
    #[serde(default, rename = "akl")]
    bracket: Option<String>,
    #[serde(default, rename = "fallklasse_3")]
    confirmed: Option<f64>,
    #[serde(default, rename = "pttoddat")]
    death_date: Option<String>,
    #[serde(default, rename = "pttod_1")]
    death: Option<f64>,
}

/// One resolved case/death event.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    pub date: NaiveDate,
    pub bracket: String,
    pub confirmed: f64,
    pub deaths: f64,
}

/// Parsed case-line table plus the count of rows dropped for having no
/// resolvable date.
#[derive(Debug, Clone)]
pub struct CaseLineData {
    pub records: Vec<CaseRecord>,
    pub skipped_rows: usize,
}

/// Read and resolve the case-line table.
pub fn read_case_lines(
    reader: impl Read,
    source_label: &str,
) -> Result<CaseLineData, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;

    for (row_idx, result) in csv_reader.deserialize::<CaseLineRow>().enumerate() {
        let row = result.map_err(|e| {
            AppError::schema(format!(
                "Failed to parse case-line row {} of '{source_label}': {e}",
                row_idx + 2
            ))
        })?;

        let deaths = row.death.unwrap_or(0.0);
        let confirmed = row.confirmed.unwrap_or(0.0);

        // Death rows are dated by the death, not by the (earlier) case date.
        let death_date = if deaths > 0.0 {
            row.death_date.as_deref().and_then(parse_date)
        } else {
            None
        };
        let date = death_date
            .or_else(|| row.fall_dt.as_deref().and_then(parse_date))
            .or_else(|| row.replikation_dt.as_deref().and_then(parse_date));

        let Some(date) = date else {
            skipped_rows += 1;
            continue;
        };

        records.push(CaseRecord {
            date,
            bracket: row.bracket.unwrap_or_default(),
            confirmed,
            deaths,
        });
    }

    if records.is_empty() {
        return Err(AppError::no_data(format!(
            "No usable case-line rows in '{source_label}'."
        )));
    }

    Ok(CaseLineData {
        records,
        skipped_rows,
    })
}

/// Emit per-event Confirmed/Deaths observations for `entity`.
///
/// Counts are incremental (one row per case); the aggregator sums them per
/// date and prefix-sums for cumulative views.
pub fn normalize_case_lines(records: &[CaseRecord], entity: &str) -> Vec<CanonicalObservation> {
    let mut observations = Vec::new();
    for record in records {
        if record.confirmed > 0.0 {
            observations.push(CanonicalObservation {
                entity: entity.to_string(),
                date: record.date,
                metric: Metric::Confirmed,
                count: record.confirmed,
            });
        }
        if record.deaths > 0.0 {
            observations.push(CanonicalObservation {
                entity: entity.to_string(),
                date: record.date,
                metric: Metric::Deaths,
                count: record.deaths,
            });
        }
    }
    observations.sort_by_key(|o| o.date);
    observations
}

/// Population sizes per age bracket, summed over duplicate labels.
#[derive(Debug, Deserialize)]
struct PopulationRow {
    #[serde(rename = "akl")]
    bracket: String,
    pop_size: f64,
}

/// Read the population-by-bracket table.
pub fn read_population(
    reader: impl Read,
    source_label: &str,
) -> Result<Vec<(String, f64)>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut totals: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
    for (row_idx, result) in csv_reader.deserialize::<PopulationRow>().enumerate() {
        let row = result.map_err(|e| {
            AppError::schema(format!(
                "Failed to parse population row {} of '{source_label}': {e}",
                row_idx + 2
            ))
        })?;
        *totals.entry(row.bracket).or_insert(0.0) += row.pop_size;
    }

    if totals.is_empty() {
        return Err(AppError::no_data(format!(
            "No population rows in '{source_label}'."
        )));
    }

    Ok(totals.into_iter().collect())
}

/// Join case totals and population sizes on the fixed bracket list.
///
/// Brackets missing from either input keep a zero total (zero population
/// makes the per-capita accessors return `None` downstream); the unknown
/// bracket is excluded entirely.
pub fn build_age_table(records: &[CaseRecord], population: &[(String, f64)]) -> AgeStratifiedTable {
    let bands = AGE_BRACKETS
        .iter()
        .map(|&(label, lower_bound)| {
            let (confirmed_total, death_total) = records
                .iter()
                .filter(|r| r.bracket == label && r.bracket != UNKNOWN_BRACKET)
                .fold((0.0, 0.0), |(c, d), r| (c + r.confirmed, d + r.deaths));
            let population = population
                .iter()
                .filter(|(b, _)| b == label)
                .map(|&(_, p)| p)
                .sum();
            AgeBand {
                label: label.to_string(),
                lower_bound,
                confirmed_total,
                death_total,
                population,
            }
        })
        .collect();

    AgeStratifiedTable { bands }
}
