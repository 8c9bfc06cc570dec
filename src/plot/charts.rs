//! Chart builders: aggregated series in, chart specs out.
//!
//! File names are deterministic: `<purpose>_<entity>` — re-running for the
//! same entity overwrites the previous artifacts.

use chrono::NaiveDate;

use crate::domain::AgeStratifiedTable;
use crate::fit::ExpFit;
use crate::plot::spec::{
    AgeChartSpec, AgeSeries, Caption, DateChartSpec, DateSeries, FIT_COLOR, HLine, PALETTE,
    SeriesStyle,
};
use crate::series::TimeSeries;

const DEATHS_SCALE_DAILY: f64 = 10.0;
const DEATHS_SCALE_CASELINE: f64 = 100.0;

/// Log-scale cumulative Confirmed/Recovered/Deaths lines.
///
/// `None` when no series has data (nothing to plot is not an error).
pub fn cumulative_chart(country: &str, series: &[&TimeSeries]) -> Option<DateChartSpec> {
    let lines: Vec<DateSeries> = series
        .iter()
        .zip(PALETTE.iter().cycle())
        .filter_map(|(ts, &color)| {
            // Zero counts cannot be drawn on a log axis.
            let points: Vec<(NaiveDate, f64)> = ts
                .cumulative()
                .into_iter()
                .filter(|p| p.count > 0.0)
                .map(|p| (p.date, p.count))
                .collect();
            if points.is_empty() {
                return None;
            }
            Some(DateSeries {
                label: ts.metric.display_name().to_string(),
                color,
                style: SeriesStyle::Line,
                points,
            })
        })
        .collect();

    let x_range = date_bounds(lines.iter().flat_map(|s| s.points.iter().map(|p| p.0)))?;
    let y_max = value_max(lines.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    Some(DateChartSpec {
        stem: format!("cumulative_{country}"),
        y_label: "Cumulative count".to_string(),
        log_y: true,
        x_range,
        y_range: (1.0, (y_max * 2.0).max(10.0)),
        series: lines,
        hlines: Vec::new(),
        captions: vec![
            caption(format!("COVID-19 {country}"), 0.62, 0.83),
            caption("JHU CSSE".to_string(), 0.62, 0.78),
        ],
    })
}

/// Daily-delta bars from the daily-report source, with the maximum daily
/// deaths marked and the case-fatality rate captioned.
pub fn daily_chart(
    country: &str,
    confirmed_delta: &[(NaiveDate, Option<f64>)],
    deaths_delta: &[(NaiveDate, Option<f64>)],
    cfr: Option<f64>,
    peak_deaths: Option<(NaiveDate, f64)>,
) -> Option<DateChartSpec> {
    let mut series = Vec::new();
    push_bars(&mut series, "Confirmed", PALETTE[0], confirmed_delta, 1.0);
    push_bars(
        &mut series,
        &format!("Deaths x{DEATHS_SCALE_DAILY:.0}"),
        PALETTE[2],
        deaths_delta,
        DEATHS_SCALE_DAILY,
    );

    let x_range = bar_date_bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))?;
    let y_max = value_max(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    let hlines = peak_deaths
        .map(|(_, value)| HLine {
            y: value * DEATHS_SCALE_DAILY,
            label: format!("Max deaths = {}", value as i64),
            color: PALETTE[2],
        })
        .into_iter()
        .collect();

    Some(DateChartSpec {
        stem: format!("daily_{country}"),
        y_label: "Daily cases".to_string(),
        log_y: false,
        x_range,
        y_range: (0.0, (y_max * 1.15).max(1.0)),
        series,
        hlines,
        captions: vec![
            cfr_caption(country, cfr),
            caption(format!("COVID-19 {country}"), 0.62, 0.83),
            caption("JHU CSSE".to_string(), 0.62, 0.78),
        ],
    })
}

/// Cantonal daily chart: confirmed/death deltas plus hospitalization and
/// ventilator levels.
pub fn cantonal_chart(
    canton: &str,
    confirmed_delta: &[(NaiveDate, Option<f64>)],
    hospitalized: &TimeSeries,
    ventilated: &TimeSeries,
    deaths_delta: &[(NaiveDate, Option<f64>)],
    cfr: Option<f64>,
) -> Option<DateChartSpec> {
    let mut series = Vec::new();
    push_bars(&mut series, "Confirmed", PALETTE[0], confirmed_delta, 1.0);
    push_level_bars(&mut series, "Hospitalisations", PALETTE[1], hospitalized);
    push_level_bars(&mut series, "On ventilator", PALETTE[2], ventilated);
    push_bars(
        &mut series,
        &format!("Deaths x{DEATHS_SCALE_DAILY:.0}"),
        PALETTE[3],
        deaths_delta,
        DEATHS_SCALE_DAILY,
    );

    let x_range = bar_date_bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))?;
    let y_max = value_max(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    Some(DateChartSpec {
        stem: format!("cantonal_daily_{canton}"),
        y_label: "Daily cases".to_string(),
        log_y: false,
        x_range,
        y_range: (0.0, (y_max * 1.15).max(1.0)),
        series,
        hlines: Vec::new(),
        captions: vec![
            cfr_caption(canton, cfr),
            caption(format!("COVID-19 {canton}"), 0.62, 0.83),
            caption("Open Data Kt. ZH".to_string(), 0.62, 0.78),
        ],
    })
}

/// Per-day Confirmed/Deaths bars from the case-line source.
pub fn caseline_chart(
    entity: &str,
    confirmed_daily: &[(NaiveDate, Option<f64>)],
    deaths_daily: &[(NaiveDate, Option<f64>)],
) -> Option<DateChartSpec> {
    let mut series = Vec::new();
    push_bars(&mut series, "Confirmed", PALETTE[0], confirmed_daily, 1.0);
    push_bars(
        &mut series,
        &format!("Deaths x{DEATHS_SCALE_CASELINE:.0}"),
        PALETTE[1],
        deaths_daily,
        DEATHS_SCALE_CASELINE,
    );

    let x_range = bar_date_bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))?;
    let y_max = value_max(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    Some(DateChartSpec {
        stem: format!("caseline_daily_{entity}"),
        y_label: "Daily cases".to_string(),
        log_y: false,
        x_range,
        y_range: (0.0, (y_max * 1.15).max(1.0)),
        series,
        hlines: Vec::new(),
        captions: vec![
            caption(format!("COVID-19 {entity}"), 0.62, 0.83),
            caption("BAG".to_string(), 0.62, 0.78),
        ],
    })
}

/// Per-capita Confirmed (×0.1) and Deaths shares per age bracket, in
/// percent of the bracket population. Undefined brackets (zero population)
/// are skipped, not drawn as zero.
pub fn age_rates_chart(entity: &str, table: &AgeStratifiedTable) -> AgeChartSpec {
    let confirmed: Vec<(f64, f64)> = table
        .confirmed_per_capita()
        .into_iter()
        .filter_map(|(age, share)| share.map(|s| (age, 0.1 * 100.0 * s)))
        .collect();
    let deaths: Vec<(f64, f64)> = table
        .deaths_per_capita()
        .into_iter()
        .filter_map(|(age, share)| share.map(|s| (age, 100.0 * s)))
        .collect();

    let y_max = value_max(confirmed.iter().chain(deaths.iter()).map(|p| p.1));

    AgeChartSpec {
        stem: format!("age_rates_{entity}"),
        x_label: "Age".to_string(),
        y_label: "Cases (% of bracket population)".to_string(),
        x_range: (0.0, 85.0),
        y_range: (0.0, (y_max * 1.25).max(0.1)),
        series: vec![
            AgeSeries {
                label: "0.1 x Confirmed / population per age bracket".to_string(),
                color: PALETTE[3],
                dashed: false,
                points: confirmed,
            },
            AgeSeries {
                label: "Deaths / population per age bracket".to_string(),
                color: PALETTE[0],
                dashed: false,
                points: deaths,
            },
        ],
        captions: vec![
            caption(format!("COVID-19 {entity}"), 0.13, 0.83),
            caption("BAG".to_string(), 0.13, 0.78),
        ],
    }
}

/// Total deaths per age bracket, with the fitted exponential overlaid when
/// the fit converged.
pub fn age_fit_chart(
    entity: &str,
    table: &AgeStratifiedTable,
    fit: Option<&ExpFit>,
) -> AgeChartSpec {
    let deaths = table.death_counts();
    let y_max = value_max(deaths.iter().map(|p| p.1));

    let mut series = vec![AgeSeries {
        label: "Deaths".to_string(),
        color: PALETTE[0],
        dashed: false,
        points: deaths,
    }];

    if let Some(fit) = fit {
        let curve: Vec<(f64, f64)> = (0..=85).map(|age| (age as f64, fit.predict(age as f64))).collect();
        series.push(AgeSeries {
            label: fit.label(),
            color: FIT_COLOR,
            dashed: true,
            points: curve,
        });
    }

    AgeChartSpec {
        stem: format!("age_deaths_fit_{entity}"),
        x_label: "Age".to_string(),
        y_label: "Total deaths".to_string(),
        x_range: (0.0, 85.0),
        y_range: (0.0, (y_max * 1.2).max(1.0)),
        series,
        captions: vec![
            caption(format!("COVID-19 {entity}"), 0.13, 0.83),
            caption("BAG".to_string(), 0.13, 0.78),
        ],
    }
}

fn push_bars(
    out: &mut Vec<DateSeries>,
    label: &str,
    color: plotters::style::RGBColor,
    deltas: &[(NaiveDate, Option<f64>)],
    scale: f64,
) {
    let points: Vec<(NaiveDate, f64)> = deltas
        .iter()
        .filter_map(|&(date, value)| value.map(|v| (date, v * scale)))
        .collect();
    if !points.is_empty() {
        out.push(DateSeries {
            label: label.to_string(),
            color,
            style: SeriesStyle::Bars,
            points,
        });
    }
}

fn push_level_bars(
    out: &mut Vec<DateSeries>,
    label: &str,
    color: plotters::style::RGBColor,
    series: &TimeSeries,
) {
    let points: Vec<(NaiveDate, f64)> =
        series.points.iter().map(|p| (p.date, p.count)).collect();
    if !points.is_empty() {
        out.push(DateSeries {
            label: label.to_string(),
            color,
            style: SeriesStyle::Bars,
            points,
        });
    }
}

fn cfr_caption(entity: &str, cfr: Option<f64>) -> Caption {
    let text = match cfr {
        Some(rate) => format!("Case fatality rate {entity} = {rate:.2}%"),
        None => format!("Case fatality rate {entity} = undefined"),
    };
    caption(text, 0.15, 0.53)
}

fn caption(text: String, rel_x: f64, rel_y: f64) -> Caption {
    Caption { text, rel_x, rel_y }
}

/// Axis bounds for bar charts. Bars occupy `[date, date + 1 day)`, so the
/// upper bound must sit one day past the newest date or the newest bar is
/// clipped at the right border.
fn bar_date_bounds(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    date_bounds(dates).map(|(lo, hi)| (lo, hi + chrono::Duration::days(1)))
}

fn date_bounds(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for date in dates {
        bounds = Some(match bounds {
            None => (date, date),
            Some((lo, hi)) => (lo.min(date), hi.max(date)),
        });
    }
    // A single-day range still needs nonzero width for the axis.
    bounds.map(|(lo, hi)| if lo == hi { (lo, hi + chrono::Duration::days(1)) } else { (lo, hi) })
}

fn value_max(values: impl Iterator<Item = f64>) -> f64 {
    values.filter(|v| v.is_finite()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgeBand, CountKind, Metric};
    use crate::series::SeriesPoint;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, d).unwrap()
    }

    #[test]
    fn daily_chart_skips_undefined_deltas() {
        let confirmed = vec![(date(1), None), (date(2), Some(5.0)), (date(3), Some(7.0))];
        let deaths = vec![(date(1), None), (date(2), Some(1.0)), (date(3), Some(2.0))];

        let spec = daily_chart("Switzerland", &confirmed, &deaths, Some(3.5), Some((date(3), 2.0)))
            .unwrap();
        assert_eq!(spec.stem, "daily_Switzerland");
        // The undefined leading delta never becomes a bar.
        assert_eq!(spec.series[0].points.len(), 2);
        // Deaths are drawn scaled, the marker label reports the raw count.
        assert_eq!(spec.series[1].points[0].1, 10.0);
        assert_eq!(spec.hlines[0].y, 20.0);
        assert_eq!(spec.hlines[0].label, "Max deaths = 2");
    }

    #[test]
    fn undefined_cfr_is_labelled_not_zero() {
        let confirmed = vec![(date(2), Some(5.0))];
        let deaths = vec![(date(2), Some(1.0))];
        let spec = daily_chart("ZH", &confirmed, &deaths, None, None).unwrap();
        assert!(
            spec.captions
                .iter()
                .any(|c| c.text == "Case fatality rate ZH = undefined")
        );
    }

    #[test]
    fn newest_bar_fits_inside_the_x_range() {
        let confirmed = vec![(date(1), Some(5.0)), (date(2), Some(7.0))];
        let deaths = vec![(date(1), Some(1.0)), (date(2), Some(2.0))];

        let spec = daily_chart("Switzerland", &confirmed, &deaths, None, None).unwrap();
        // The last bar spans [date(2), date(3)); the range must cover it.
        assert!(spec.x_range.1 >= date(3), "x range ends at {}", spec.x_range.1);

        let cantonal = cantonal_chart(
            "ZH",
            &confirmed,
            &TimeSeries {
                entity: "ZH".to_string(),
                metric: Metric::Hospitalized,
                kind: CountKind::Cumulative,
                points: Vec::new(),
            },
            &TimeSeries {
                entity: "ZH".to_string(),
                metric: Metric::Ventilated,
                kind: CountKind::Cumulative,
                points: Vec::new(),
            },
            &deaths,
            None,
        )
        .unwrap();
        assert!(cantonal.x_range.1 >= date(3));

        let caseline = caseline_chart("CH", &confirmed, &deaths).unwrap();
        assert!(caseline.x_range.1 >= date(3));
    }

    #[test]
    fn empty_input_produces_no_chart() {
        assert!(daily_chart("Nowhere", &[], &[], None, None).is_none());
    }

    #[test]
    fn cumulative_chart_drops_zero_counts_for_log_axis() {
        let series = TimeSeries {
            entity: "Switzerland".to_string(),
            metric: Metric::Confirmed,
            kind: CountKind::Cumulative,
            points: vec![
                SeriesPoint { date: date(1), count: 0.0 },
                SeriesPoint { date: date(2), count: 10.0 },
            ],
        };
        let spec = cumulative_chart("Switzerland", &[&series]).unwrap();
        assert!(spec.log_y);
        assert_eq!(spec.series[0].points, vec![(date(2), 10.0)]);
    }

    #[test]
    fn age_rate_series_skip_zero_population_brackets() {
        let table = AgeStratifiedTable {
            bands: vec![
                AgeBand {
                    label: "0 - 15".to_string(),
                    lower_bound: 0.0,
                    confirmed_total: 100.0,
                    death_total: 1.0,
                    population: 10_000.0,
                },
                AgeBand {
                    label: "80+".to_string(),
                    lower_bound: 80.0,
                    confirmed_total: 50.0,
                    death_total: 20.0,
                    population: 0.0,
                },
            ],
        };
        let spec = age_rates_chart("CH", &table);
        for series in &spec.series {
            assert_eq!(series.points.len(), 1);
            assert_eq!(series.points[0].0, 0.0);
        }
    }

    #[test]
    fn fit_overlay_is_omitted_when_fit_failed() {
        let table = AgeStratifiedTable { bands: Vec::new() };
        let without = age_fit_chart("CH", &table, None);
        assert_eq!(without.series.len(), 1);

        let fit = ExpFit { a: 1.0, c: 0.09 };
        let with = age_fit_chart("CH", &table, Some(&fit));
        assert_eq!(with.series.len(), 2);
        assert!(with.series[1].dashed);
    }
}
