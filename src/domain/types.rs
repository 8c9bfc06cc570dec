//! Canonical data model.
//!
//! Three structurally different sources are reduced to one shape:
//! `(entity, date, metric, count)`. Everything downstream (aggregation,
//! ratios, fitting, chart builders) works on that shape only, so the
//! source-specific quirks stay inside the `io` readers.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tracked metric categories across all sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Confirmed,
    Recovered,
    Deaths,
    Hospitalized,
    Ventilated,
    Tested,
}

impl Metric {
    /// Human-readable label for legends and summaries.
    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Confirmed => "Confirmed",
            Metric::Recovered => "Recovered",
            Metric::Deaths => "Deaths",
            Metric::Hospitalized => "Hospitalisations",
            Metric::Ventilated => "On ventilator",
            Metric::Tested => "Tested",
        }
    }
}

/// Whether a source reports running totals or per-day increments.
///
/// The global and cantonal sources publish cumulative counts; the case-line
/// source yields one row per case, so its per-day totals are incremental.
/// The distinction decides how the cumulative and delta views are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountKind {
    Cumulative,
    Incremental,
}

/// The normalized observation unit.
///
/// Invariant: after aggregation, `(entity, date, metric)` is unique —
/// duplicate raw rows for the same key are summed, never kept side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalObservation {
    /// Country name or canton code.
    pub entity: String,
    pub date: NaiveDate,
    pub metric: Metric,
    pub count: f64,
}

/// Fixed ordered age-bracket partition used to stratify mortality and
/// population data. The labels match the case-line source; the lower bound
/// is the x-value used for plotting and fitting.
pub const AGE_BRACKETS: [(&str, f64); 9] = [
    ("0 - 15", 0.0),
    ("15 - 25", 15.0),
    ("25 - 35", 25.0),
    ("35 - 45", 35.0),
    ("45 - 55", 45.0),
    ("55 - 65", 55.0),
    ("65 - 75", 65.0),
    ("75 - 80", 75.0),
    ("80+", 80.0),
];

/// One age bracket with joined case and population totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    pub label: String,
    pub lower_bound: f64,
    pub confirmed_total: f64,
    pub death_total: f64,
    pub population: f64,
}

/// Age-stratified join of case-line totals and population sizes.
///
/// Built once per run and not mutated afterwards. Bands are ordered by
/// `lower_bound` ascending, following [`AGE_BRACKETS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeStratifiedTable {
    pub bands: Vec<AgeBand>,
}

impl AgeStratifiedTable {
    /// Confirmed cases as a share of the bracket population.
    ///
    /// Brackets with zero population yield `None` so that a missing
    /// denominator never turns into a NaN in downstream min/max scans.
    pub fn confirmed_per_capita(&self) -> Vec<(f64, Option<f64>)> {
        self.bands
            .iter()
            .map(|b| (b.lower_bound, per_capita(b.confirmed_total, b.population)))
            .collect()
    }

    /// Deaths as a share of the bracket population.
    pub fn deaths_per_capita(&self) -> Vec<(f64, Option<f64>)> {
        self.bands
            .iter()
            .map(|b| (b.lower_bound, per_capita(b.death_total, b.population)))
            .collect()
    }

    /// `(lower_bound, death_total)` pairs, the input to the exponential fit.
    pub fn death_counts(&self) -> Vec<(f64, f64)> {
        self.bands
            .iter()
            .map(|b| (b.lower_bound, b.death_total))
            .collect()
    }
}

fn per_capita(count: f64, population: f64) -> Option<f64> {
    if population > 0.0 {
        Some(count / population)
    } else {
        None
    }
}

/// A full run's configuration, derived from CLI flags plus defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Canton code for the regional charts (e.g. `ZH`).
    pub canton: String,
    /// Country name for the global charts (e.g. `Switzerland`).
    pub country: String,
    /// Directory containing the global time-series CSVs (one per metric).
    pub timeseries_dir: PathBuf,
    /// Directory containing the per-day report CSVs (`MM-DD-YYYY.csv`).
    pub daily_reports_dir: PathBuf,
    /// Remote CSV with cantonal daily totals.
    pub cantonal_url: String,
    /// Remote CSV with the national case-line table.
    pub caseline_url: String,
    /// Remote CSV with population sizes per age bracket.
    pub population_url: String,
    /// Directory chart files are written into.
    pub out_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_capita_guards_zero_population() {
        let table = AgeStratifiedTable {
            bands: vec![
                AgeBand {
                    label: "0 - 15".to_string(),
                    lower_bound: 0.0,
                    confirmed_total: 50.0,
                    death_total: 1.0,
                    population: 1000.0,
                },
                AgeBand {
                    label: "80+".to_string(),
                    lower_bound: 80.0,
                    confirmed_total: 10.0,
                    death_total: 5.0,
                    population: 0.0,
                },
            ],
        };

        let confirmed = table.confirmed_per_capita();
        assert_eq!(confirmed[0], (0.0, Some(0.05)));
        assert_eq!(confirmed[1], (80.0, None));

        let deaths = table.deaths_per_capita();
        assert!(deaths[1].1.is_none());
    }
}
