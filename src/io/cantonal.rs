//! Cantonal daily-totals reader (openZH layout).
//!
//! Single CSV, one row per `(date, canton)`. The schema is fixed, so the
//! rows deserialize straight into a struct; columns we do not use are
//! ignored. Counts are ragged — many cells are empty on any given day —
//! and an empty cell is a gap for that metric, not a zero.

use std::io::Read;

use serde::Deserialize;

use crate::domain::{CanonicalObservation, Metric};
use crate::error::AppError;
use crate::io::parse_date;

#[derive(Debug, Deserialize)]
struct CantonalRow {
    date: String,
    #[serde(rename = "abbreviation_canton_and_fl")]
    canton: String,
    #[serde(default)]
    ncumul_tested: Option<f64>,
    #[serde(default)]
    ncumul_conf: Option<f64>,
    #[serde(default)]
    current_hosp: Option<f64>,
    #[serde(default)]
    current_vent: Option<f64>,
    #[serde(default)]
    ncumul_deceased: Option<f64>,
}

/// Normalize the cantonal table, filtered to one canton code.
///
/// `ncumul_*` columns are cumulative counts; `current_*` columns are level
/// values (how many are hospitalized/ventilated right now), which is why
/// the pipeline plots them without differencing.
pub fn normalize_cantonal(
    reader: impl Read,
    canton: &str,
    source_label: &str,
) -> Result<Vec<CanonicalObservation>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut observations = Vec::new();
    for (row_idx, result) in csv_reader.deserialize::<CantonalRow>().enumerate() {
        let row = result.map_err(|e| {
            AppError::schema(format!(
                "Failed to parse cantonal row {} of '{source_label}': {e}",
                row_idx + 2
            ))
        })?;
        if !row.canton.eq_ignore_ascii_case(canton) {
            continue;
        }
        let Some(date) = parse_date(&row.date) else {
            return Err(AppError::schema(format!(
                "Invalid date '{}' in cantonal row {} of '{source_label}'.",
                row.date,
                row_idx + 2
            )));
        };

        let fields = [
            (Metric::Tested, row.ncumul_tested),
            (Metric::Confirmed, row.ncumul_conf),
            (Metric::Hospitalized, row.current_hosp),
            (Metric::Ventilated, row.current_vent),
            (Metric::Deaths, row.ncumul_deceased),
        ];
        for (metric, count) in fields {
            let Some(count) = count else { continue };
            observations.push(CanonicalObservation {
                entity: row.canton.clone(),
                date,
                metric,
                count,
            });
        }
    }

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
date,time,abbreviation_canton_and_fl,ncumul_tested,ncumul_conf,new_hosp,current_hosp,current_icu,current_vent,ncumul_released,ncumul_deceased,source
2020-03-01,,ZH,,15,,2,,1,,0,https://example.org
2020-03-02,,ZH,,27,,4,,,,1,https://example.org
2020-03-02,,BE,,9,,1,,0,,0,https://example.org
";

    #[test]
    fn filters_to_requested_canton() {
        let obs = normalize_cantonal(SAMPLE.as_bytes(), "ZH", "test.csv").unwrap();
        assert!(obs.iter().all(|o| o.entity == "ZH"));
        assert!(obs.iter().any(|o| o.metric == Metric::Confirmed));
    }

    #[test]
    fn empty_cells_produce_no_observation() {
        let obs = normalize_cantonal(SAMPLE.as_bytes(), "ZH", "test.csv").unwrap();
        let march2 = NaiveDate::from_ymd_opt(2020, 3, 2).unwrap();
        // `current_vent` is empty on 2020-03-02 for ZH: a gap, not a zero.
        assert!(
            !obs.iter()
                .any(|o| o.date == march2 && o.metric == Metric::Ventilated)
        );
        // `ncumul_tested` is empty throughout.
        assert!(!obs.iter().any(|o| o.metric == Metric::Tested));
    }

    #[test]
    fn cumulative_and_level_metrics_are_both_emitted() {
        let obs = normalize_cantonal(SAMPLE.as_bytes(), "ZH", "test.csv").unwrap();
        let march1 = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let on_day: Vec<_> = obs.iter().filter(|o| o.date == march1).collect();
        let metrics: Vec<_> = on_day.iter().map(|o| o.metric).collect();
        assert!(metrics.contains(&Metric::Confirmed));
        assert!(metrics.contains(&Metric::Hospitalized));
        assert!(metrics.contains(&Metric::Ventilated));
        assert!(metrics.contains(&Metric::Deaths));
    }

    #[test]
    fn unknown_canton_yields_empty_output() {
        let obs = normalize_cantonal(SAMPLE.as_bytes(), "GR", "test.csv").unwrap();
        assert!(obs.is_empty());
    }
}
