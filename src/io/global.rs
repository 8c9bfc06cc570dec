//! Global time-series reader: wide-to-long reshape.
//!
//! The global repository publishes one wide CSV per metric category: one
//! row per country/province, one column per date. Normalization melts the
//! date columns into rows and sums province rows up to country level, so
//! the output is one observation per `(country, date)`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{CanonicalObservation, Metric};
use crate::error::AppError;
use crate::io::{build_header_map, parse_date, parse_opt_f64};

/// Load and normalize one wide time-series file for `metric`.
///
/// The file name follows the repository layout:
/// `time_series_covid19_<Metric>_global.csv`.
pub fn load_global_series(
    dir: &Path,
    metric: Metric,
) -> Result<Vec<CanonicalObservation>, AppError> {
    // File names use the lowercase metric: time_series_covid19_confirmed_global.csv
    let path = dir.join(format!(
        "time_series_covid19_{}_global.csv",
        metric.display_name().to_ascii_lowercase()
    ));
    let file = File::open(&path).map_err(|e| {
        AppError::schema(format!(
            "Failed to open time-series CSV '{}': {e}",
            path.display()
        ))
    })?;
    normalize_wide_table(file, metric, &path.display().to_string())
}

/// Reshape a wide per-date table into canonical long format.
///
/// Identifier columns are recognized case-insensitively; every remaining
/// header must parse as a date or the file is rejected. Empty cells are
/// gaps (no observation), not zeros.
pub fn normalize_wide_table(
    reader: impl Read,
    metric: Metric,
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

    let country_idx = ["country/region", "country_region", "country"]
        .iter()
        .find_map(|name| header_map.get(*name))
        .copied()
        .ok_or_else(|| {
            AppError::schema(format!(
                "Missing expected column in '{file_label}': `Country/Region` (or `Country_Region`/`Country`)."
            ))
        })?;

    // Everything that is not an identifier column must be a date column.
    let mut date_columns: Vec<(usize, NaiveDate)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        let normalized = crate::io::normalize_header_name(name);
        let is_identifier = matches!(
            normalized.as_str(),
            "country/region"
                | "country_region"
                | "country"
                | "province/state"
                | "province_state"
                | "lat"
                | "latitude"
                | "long"
                | "long_"
                | "longitude"
        );
        if is_identifier {
            continue;
        }
        let date = parse_date(name.trim()).ok_or_else(|| {
            AppError::schema(format!(
                "Unexpected non-date column `{name}` in wide time-series file '{file_label}'."
            ))
        })?;
        date_columns.push((idx, date));
    }

    if date_columns.is_empty() {
        return Err(AppError::no_data(format!(
            "No date columns found in '{file_label}'."
        )));
    }

    // Sum province rows into country-level totals.
    let mut totals: std::collections::BTreeMap<(String, NaiveDate), f64> =
        std::collections::BTreeMap::new();

    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::schema(format!(
                "CSV parse error in '{file_label}' line {}: {e}",
                row_idx + 2
            ))
        })?;
        let Some(country) = record.get(country_idx).map(str::trim).filter(|s| !s.is_empty())
        else {
            continue;
        };

        for &(idx, date) in &date_columns {
            let Some(count) = parse_opt_f64(record.get(idx)) else {
                continue;
            };
            *totals.entry((country.to_string(), date)).or_insert(0.0) += count;
        }
    }

    Ok(totals
        .into_iter()
        .map(|((entity, date), count)| CanonicalObservation {
            entity,
            date,
            metric,
            count,
        })
        .collect())
}
