//! Daily-report reader: one file per calendar day.
//!
//! The repository renamed its columns partway through 2020
//! (`Country/Region` → `Country_Region`, `Last Update` → `Last_Update`),
//! so the reader accepts both spellings of each. A file with neither
//! spelling of the country column is rejected with an error naming it —
//! the original tooling silently fell through to a crash deep in date
//! parsing, which is exactly the failure mode this replaces.
//!
//! Date resolution per file, in order:
//! 1. the latest parseable "last update" timestamp among the matched rows
//! 2. the date derived from the file stem (`MM-DD-YYYY.csv`)

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{CanonicalObservation, Metric};
use crate::error::AppError;
use crate::io::{build_header_map, get_field, parse_date, parse_opt_f64, parse_timestamp_date};

const METRIC_COLUMNS: [(&str, Metric); 3] = [
    ("confirmed", Metric::Confirmed),
    ("recovered", Metric::Recovered),
    ("deaths", Metric::Deaths),
];

/// Load every `*.csv` daily report under `dir` and normalize the rows for
/// `country` into canonical observations.
pub fn load_daily_reports(
    dir: &Path,
    country: &str,
) -> Result<Vec<CanonicalObservation>, AppError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        AppError::schema(format!(
            "Failed to read daily-reports directory '{}': {e}",
            dir.display()
        ))
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(AppError::no_data(format!(
            "No daily-report CSVs found under '{}'.",
            dir.display()
        )));
    }

    let mut observations = Vec::new();
    for path in paths {
        let file = File::open(&path).map_err(|e| {
            AppError::schema(format!(
                "Failed to open daily report '{}': {e}",
                path.display()
            ))
        })?;
        let file_date = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(parse_date);
        observations.extend(normalize_daily_report(
            file,
            country,
            file_date,
            &path.display().to_string(),
        )?);
    }
    Ok(observations)
}

/// Normalize one daily-report file: sum the matched country rows per metric
/// and stamp them with the resolved date.
///
/// Returns an empty vector when the country has no rows in this file.
pub fn normalize_daily_report(
    reader: impl Read,
    country: &str,
    file_date: Option<NaiveDate>,
    file_label: &str,
) -> Result<Vec<CanonicalObservation>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| AppError::schema(format!("Failed to read headers of '{file_label}': {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    // Early files use `Country/Region`, later ones `Country_Region`.
    let country_key = ["country/region", "country_region"]
        .into_iter()
        .find(|name| header_map.contains_key(*name))
        .ok_or_else(|| {
            AppError::schema(format!(
                "Missing expected column in '{file_label}': `Country/Region` (or `Country_Region`)."
            ))
        })?;

    // Same generational split for the update timestamp; absence is fine
    // because the file date is the fallback.
    let update_key = ["last update", "last_update"]
        .into_iter()
        .find(|name| header_map.contains_key(*name));

    for (name, _) in METRIC_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::schema(format!(
                "Missing expected column in '{file_label}': `{name}`."
            )));
        }
    }

    let mut totals = [0.0_f64; METRIC_COLUMNS.len()];
    let mut matched_rows = 0usize;
    let mut update_date: Option<NaiveDate> = None;

    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::schema(format!(
                "CSV parse error in '{file_label}' line {}: {e}",
                row_idx + 2
            ))
        })?;

        let row_country = get_field(&record, &header_map, country_key).unwrap_or("");
        if !row_country.eq_ignore_ascii_case(country) {
            continue;
        }
        matched_rows += 1;

        for (i, (name, _)) in METRIC_COLUMNS.iter().enumerate() {
            if let Some(count) = parse_opt_f64(get_field(&record, &header_map, name)) {
                totals[i] += count;
            }
        }

        if let Some(key) = update_key {
            let row_date = get_field(&record, &header_map, key).and_then(parse_timestamp_date);
            if let Some(d) = row_date {
                update_date = Some(update_date.map_or(d, |current| current.max(d)));
            }
        }
    }

    if matched_rows == 0 {
        return Ok(Vec::new());
    }

    let date = update_date.or(file_date).ok_or_else(|| {
        AppError::schema(format!(
            "Could not resolve a report date for '{file_label}' (no parseable update timestamp and no file-derived date)."
        ))
    })?;

    Ok(METRIC_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, &(_, metric))| CanonicalObservation {
            entity: country.to_string(),
            date,
            metric,
            count: totals[i],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const EARLY: &str = "\
Province/State,Country/Region,Last Update,Confirmed,Deaths,Recovered
,Switzerland,3/1/20 23:53,27,0,0
,Italy,3/1/20 23:53,1694,34,83
";

    const LATE: &str = "\
FIPS,Admin2,Province_State,Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,Recovered,Active
,,,Switzerland,2020-10-22 04:24:27,46.8,8.2,91763,2039,54600
,,,Italy,2020-10-22 04:24:27,41.9,12.6,449648,36832,257374
";

    #[test]
    fn both_column_spellings_produce_the_same_shape() {
        let early =
            normalize_daily_report(EARLY.as_bytes(), "Switzerland", None, "03-01-2020.csv")
                .unwrap();
        let late =
            normalize_daily_report(LATE.as_bytes(), "Switzerland", None, "10-22-2020.csv").unwrap();

        assert_eq!(early.len(), 3);
        assert_eq!(late.len(), 3);
        for obs in early.iter().chain(late.iter()) {
            assert_eq!(obs.entity, "Switzerland");
        }
        assert_eq!(early[0].metric, late[0].metric);
        assert_eq!(early[0].date, date(2020, 3, 1));
        assert_eq!(late[0].date, date(2020, 10, 22));
    }

    #[test]
    fn update_timestamp_is_preferred_over_file_date() {
        let obs = normalize_daily_report(
            EARLY.as_bytes(),
            "Switzerland",
            Some(date(2020, 3, 2)),
            "03-02-2020.csv",
        )
        .unwrap();
        assert_eq!(obs[0].date, date(2020, 3, 1));
    }

    #[test]
    fn file_date_is_the_fallback_when_timestamps_are_absent() {
        let csv = "\
Country/Region,Confirmed,Deaths,Recovered
Switzerland,27,0,0
";
        let obs = normalize_daily_report(
            csv.as_bytes(),
            "Switzerland",
            Some(date(2020, 3, 2)),
            "03-02-2020.csv",
        )
        .unwrap();
        assert_eq!(obs[0].date, date(2020, 3, 2));
    }

    #[test]
    fn missing_country_column_in_both_spellings_is_fatal() {
        let csv = "Region,Confirmed,Deaths,Recovered\nSomewhere,1,0,0\n";
        let err =
            normalize_daily_report(csv.as_bytes(), "Switzerland", None, "weird.csv").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("weird.csv"));
        assert!(err.to_string().contains("Country"));
    }

    #[test]
    fn country_rows_are_summed_per_file() {
        let csv = "\
Province_State,Country_Region,Last_Update,Confirmed,Deaths,Recovered
Geneva,Switzerland,2020-10-22 04:24:27,100,5,60
Zurich,Switzerland,2020-10-22 04:24:27,200,7,90
";
        let obs =
            normalize_daily_report(csv.as_bytes(), "Switzerland", None, "10-22-2020.csv").unwrap();
        let confirmed = obs.iter().find(|o| o.metric == Metric::Confirmed).unwrap();
        let deaths = obs.iter().find(|o| o.metric == Metric::Deaths).unwrap();
        assert_eq!(confirmed.count, 300.0);
        assert_eq!(deaths.count, 12.0);
    }

    #[test]
    fn absent_country_yields_no_observations() {
        let obs = normalize_daily_report(EARLY.as_bytes(), "Norway", None, "03-01-2020.csv")
            .unwrap();
        assert!(obs.is_empty());
    }
}
