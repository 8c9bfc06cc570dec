//! Command-line parsing for the COVID-19 chart generator.
//!
//! Argument parsing stays separate from the pipeline code; the parsed
//! arguments are converted into a [`RunConfig`] before anything runs.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::RunConfig;

const DEFAULT_CANTONAL_URL: &str =
    "https://raw.githubusercontent.com/openZH/covid_19/master/COVID19_Fallzahlen_CH_total_v2.csv";
const DEFAULT_CASELINE_URL: &str = "https://www.bag.admin.ch/dam/bag/en/dokumente/mt/k-und-i/aktuelle-ausbrueche-pandemien/2019-nCoV/covid-19-basisdaten-fallzahlen.csv";
const DEFAULT_POPULATION_URL: &str = "https://www.bag.admin.ch/dam/bag/en/dokumente/mt/k-und-i/aktuelle-ausbrueche-pandemien/2019-nCoV/covid-19-basisdaten-bevoelkerungszahlen.csv";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "covid",
    version,
    about = "COVID-19 chart generator (JHU / openZH / BAG sources)"
)]
pub struct Cli {
    /// Canton code for the regional charts.
    #[arg(default_value = "ZH")]
    pub canton: String,

    /// Country name for the global charts (as spelled in the JHU data).
    #[arg(default_value = "Switzerland")]
    pub country: String,

    /// Root of the JHU CSSE data checkout.
    ///
    /// The global time-series CSVs are expected under
    /// `<data-dir>/csse_covid_19_time_series` and the daily reports under
    /// `<data-dir>/csse_covid_19_daily_reports`.
    #[arg(long, default_value = "COVID-19/csse_covid_19_data")]
    pub data_dir: PathBuf,

    /// Remote CSV with cantonal daily totals.
    #[arg(long, default_value = DEFAULT_CANTONAL_URL)]
    pub cantonal_url: String,

    /// Remote CSV with the national case-line table.
    #[arg(long, default_value = DEFAULT_CASELINE_URL)]
    pub caseline_url: String,

    /// Remote CSV with population sizes per age bracket.
    #[arg(long, default_value = DEFAULT_POPULATION_URL)]
    pub population_url: String,

    /// Directory chart files are written into.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

impl Cli {
    pub fn into_config(self) -> RunConfig {
        RunConfig {
            canton: self.canton,
            country: self.country,
            timeseries_dir: self.data_dir.join("csse_covid_19_time_series"),
            daily_reports_dir: self.data_dir.join("csse_covid_19_daily_reports"),
            cantonal_url: self.cantonal_url,
            caseline_url: self.caseline_url,
            population_url: self.population_url,
            out_dir: self.out_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_zurich_and_switzerland() {
        let cli = Cli::parse_from(["covid"]);
        assert_eq!(cli.canton, "ZH");
        assert_eq!(cli.country, "Switzerland");

        let config = cli.into_config();
        assert!(config.timeseries_dir.ends_with("csse_covid_19_time_series"));
        assert!(
            config
                .daily_reports_dir
                .ends_with("csse_covid_19_daily_reports")
        );
    }

    #[test]
    fn positional_overrides_apply_in_order() {
        let cli = Cli::parse_from(["covid", "BE", "Germany", "--out-dir", "charts"]);
        assert_eq!(cli.canton, "BE");
        assert_eq!(cli.country, "Germany");
        assert_eq!(cli.out_dir, PathBuf::from("charts"));
    }
}
