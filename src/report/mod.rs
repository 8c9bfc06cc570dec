//! Run summary: counts, ratios and fit diagnostics for one pipeline run.
//!
//! Formatting lives here so the pipeline stays free of presentation code
//! and output changes are localized. Undefined ratios print as
//! "undefined", never as zero.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::fit::ExpFit;

/// Everything a finished run reports on stdout.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub canton: String,
    pub country: String,
    pub global_observations: usize,
    pub daily_observations: usize,
    pub cantonal_observations: usize,
    pub caseline_records: usize,
    pub caseline_skipped_rows: usize,
    pub daily_cfr: Option<f64>,
    pub cantonal_cfr: Option<f64>,
    pub peak_daily_deaths: Option<(NaiveDate, f64)>,
    pub mortality_fit: Option<ExpFit>,
    pub files: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new(canton: &str, country: &str) -> Self {
        Self {
            canton: canton.to_string(),
            country: country.to_string(),
            ..Self::default()
        }
    }
}

/// Format the full run summary (source counts + derived values + outputs).
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("=== covid - COVID-19 chart generator ===\n");
    out.push_str(&format!("Country: {}\n", summary.country));
    out.push_str(&format!("Canton: {}\n", summary.canton));

    out.push_str("\nSources:\n");
    out.push_str(&format!(
        "- global time-series: {} observations\n",
        summary.global_observations
    ));
    out.push_str(&format!(
        "- daily reports: {} observations\n",
        summary.daily_observations
    ));
    out.push_str(&format!(
        "- cantonal: {} observations\n",
        summary.cantonal_observations
    ));
    out.push_str(&format!(
        "- case lines: {} records ({} skipped)\n",
        summary.caseline_records, summary.caseline_skipped_rows
    ));

    out.push_str("\nDerived:\n");
    out.push_str(&format!(
        "- case fatality rate {}: {}\n",
        summary.country,
        fmt_rate(summary.daily_cfr)
    ));
    out.push_str(&format!(
        "- case fatality rate {}: {}\n",
        summary.canton,
        fmt_rate(summary.cantonal_cfr)
    ));
    match summary.peak_daily_deaths {
        Some((date, value)) => out.push_str(&format!(
            "- max daily deaths {}: {} on {date}\n",
            summary.country, value as i64
        )),
        None => out.push_str(&format!(
            "- max daily deaths {}: undefined\n",
            summary.country
        )),
    }
    match &summary.mortality_fit {
        Some(fit) => out.push_str(&format!(
            "- age mortality fit: a={:.3} c={:.4}\n",
            fit.a, fit.c
        )),
        None => out.push_str("- age mortality fit: did not converge\n"),
    }

    out.push_str(&format!("\nFiles written ({}):\n", summary.files.len()));
    for file in &summary.files {
        out.push_str(&format!("- {}\n", file.display()));
    }

    out
}

fn fmt_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{rate:.2}%"),
        None => "undefined".to_string(),
    }
}
