//! Aggregation: cumulative, delta and ratio views over normalized data.
//!
//! This is where the `(entity, date, metric)` uniqueness invariant is
//! enforced: [`build_series`] groups duplicate keys by summing, and the
//! resulting dates are strictly increasing. Gaps are permitted — there is
//! no forward fill.
//!
//! Undefined arithmetic is represented explicitly:
//! - the first element of a cumulative delta view is `None`, not zero
//!   (it must not win or lose a max comparison)
//! - ratios with a zero denominator are `None`, never NaN

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{CanonicalObservation, CountKind, Metric};

/// One dated count inside a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub count: f64,
}

/// Ordered per-(entity, metric) series.
///
/// Invariant: `points` is sorted by date, strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub entity: String,
    pub metric: Metric,
    pub kind: CountKind,
    pub points: Vec<SeriesPoint>,
}

/// Group observations for one `(entity, metric)` pair into a [`TimeSeries`].
///
/// Duplicate dates are summed; output dates are strictly increasing.
pub fn build_series(
    observations: &[CanonicalObservation],
    entity: &str,
    metric: Metric,
    kind: CountKind,
) -> TimeSeries {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for obs in observations {
        if obs.metric == metric && obs.entity == entity {
            *by_date.entry(obs.date).or_insert(0.0) += obs.count;
        }
    }

    TimeSeries {
        entity: entity.to_string(),
        metric,
        kind,
        points: by_date
            .into_iter()
            .map(|(date, count)| SeriesPoint { date, count })
            .collect(),
    }
}

impl TimeSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Running-total view.
    ///
    /// Cumulative sources pass through unchanged; incremental sources are
    /// prefix-summed.
    pub fn cumulative(&self) -> Vec<SeriesPoint> {
        match self.kind {
            CountKind::Cumulative => self.points.clone(),
            CountKind::Incremental => {
                let mut total = 0.0;
                self.points
                    .iter()
                    .map(|p| {
                        total += p.count;
                        SeriesPoint {
                            date: p.date,
                            count: total,
                        }
                    })
                    .collect()
            }
        }
    }

    /// Daily-delta view.
    ///
    /// For cumulative sources this is the first difference, with the leading
    /// element undefined (`None`). Incremental sources already carry daily
    /// counts, so every element is defined.
    pub fn delta(&self) -> Vec<(NaiveDate, Option<f64>)> {
        match self.kind {
            CountKind::Incremental => self
                .points
                .iter()
                .map(|p| (p.date, Some(p.count)))
                .collect(),
            CountKind::Cumulative => {
                let mut out = Vec::with_capacity(self.points.len());
                for (i, p) in self.points.iter().enumerate() {
                    let value = if i == 0 {
                        None
                    } else {
                        Some(p.count - self.points[i - 1].count)
                    };
                    out.push((p.date, value));
                }
                out
            }
        }
    }
}

/// Date and value of the maximum defined delta.
///
/// Undefined entries never participate in the comparison; ties resolve to
/// the earliest date. `None` when no entry is defined.
pub fn peak(deltas: &[(NaiveDate, Option<f64>)]) -> Option<(NaiveDate, f64)> {
    let mut best: Option<(NaiveDate, f64)> = None;
    for &(date, value) in deltas {
        let Some(value) = value else { continue };
        if !value.is_finite() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((date, value)),
        }
    }
    best
}

/// Case-fatality rate: `deaths / confirmed × 100`.
///
/// Evaluated on the cumulative views at the latest date both series cover;
/// if the confirmed total there is zero, falls back to the immediately
/// preceding common date. Returns `None` when no usable denominator exists
/// (including the single-date case) rather than coercing to zero.
pub fn case_fatality_rate(confirmed: &TimeSeries, deaths: &TimeSeries) -> Option<f64> {
    let confirmed_totals = confirmed.cumulative();
    let deaths_totals: BTreeMap<NaiveDate, f64> = deaths
        .cumulative()
        .into_iter()
        .map(|p| (p.date, p.count))
        .collect();

    let mut common: Vec<(f64, f64)> = confirmed_totals
        .iter()
        .filter_map(|p| deaths_totals.get(&p.date).map(|&d| (p.count, d)))
        .collect();

    // Latest date first; only the latest and its predecessor are considered.
    common.reverse();
    for &(conf, dead) in common.iter().take(2) {
        if conf > 0.0 {
            let cfr = dead / conf * 100.0;
            if cfr.is_finite() {
                return Some(cfr);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, d).unwrap()
    }

    fn obs(entity: &str, d: u32, metric: Metric, count: f64) -> CanonicalObservation {
        CanonicalObservation {
            entity: entity.to_string(),
            date: date(d),
            metric,
            count,
        }
    }

    #[test]
    fn build_series_sums_duplicates_and_sorts() {
        let observations = vec![
            obs("ZH", 3, Metric::Confirmed, 5.0),
            obs("ZH", 1, Metric::Confirmed, 10.0),
            obs("ZH", 3, Metric::Confirmed, 2.0),
            obs("ZH", 2, Metric::Deaths, 1.0),
            obs("BE", 1, Metric::Confirmed, 99.0),
        ];

        let series = build_series(&observations, "ZH", Metric::Confirmed, CountKind::Cumulative);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points[0], SeriesPoint { date: date(1), count: 10.0 });
        assert_eq!(series.points[1], SeriesPoint { date: date(3), count: 7.0 });
        // Strictly increasing dates after grouping.
        assert!(series.points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn delta_roundtrip_reconstructs_cumulative() {
        let series = TimeSeries {
            entity: "CH".to_string(),
            metric: Metric::Confirmed,
            kind: CountKind::Cumulative,
            points: vec![
                SeriesPoint { date: date(1), count: 10.0 },
                SeriesPoint { date: date(2), count: 25.0 },
                SeriesPoint { date: date(4), count: 25.0 },
                SeriesPoint { date: date(5), count: 40.0 },
            ],
        };

        let deltas = series.delta();
        assert_eq!(deltas[0].1, None);

        // Prefix-summing the delta view (with cumulative[0] given) restores
        // the original cumulative view.
        let mut running = series.points[0].count;
        for (i, (_, delta)) in deltas.iter().enumerate().skip(1) {
            running += delta.unwrap();
            assert_eq!(running, series.points[i].count);
        }
    }

    #[test]
    fn incremental_series_has_fully_defined_delta() {
        let series = TimeSeries {
            entity: "CH".to_string(),
            metric: Metric::Deaths,
            kind: CountKind::Incremental,
            points: vec![
                SeriesPoint { date: date(1), count: 2.0 },
                SeriesPoint { date: date(2), count: 3.0 },
            ],
        };

        let deltas = series.delta();
        assert_eq!(deltas, vec![(date(1), Some(2.0)), (date(2), Some(3.0))]);

        let cumulative = series.cumulative();
        assert_eq!(cumulative[1].count, 5.0);
    }

    #[test]
    fn peak_ignores_undefined_leading_delta() {
        let deltas = vec![
            (date(1), None),
            (date(2), Some(5.0)),
            (date(3), Some(12.0)),
            (date(4), Some(3.0)),
            (date(5), Some(9.0)),
        ];
        assert_eq!(peak(&deltas), Some((date(3), 12.0)));
    }

    #[test]
    fn peak_of_all_undefined_is_none() {
        let deltas = vec![(date(1), None)];
        assert_eq!(peak(&deltas), None);
    }

    #[test]
    fn cfr_falls_back_to_preceding_date_on_zero_denominator() {
        let confirmed = TimeSeries {
            entity: "ZH".to_string(),
            metric: Metric::Confirmed,
            kind: CountKind::Cumulative,
            points: vec![
                SeriesPoint { date: date(1), count: 100.0 },
                SeriesPoint { date: date(2), count: 0.0 },
            ],
        };
        let deaths = TimeSeries {
            entity: "ZH".to_string(),
            metric: Metric::Deaths,
            kind: CountKind::Cumulative,
            points: vec![
                SeriesPoint { date: date(1), count: 5.0 },
                SeriesPoint { date: date(2), count: 0.0 },
            ],
        };

        assert_eq!(case_fatality_rate(&confirmed, &deaths), Some(5.0));
    }

    #[test]
    fn cfr_is_undefined_when_both_dates_are_zero() {
        let confirmed = TimeSeries {
            entity: "ZH".to_string(),
            metric: Metric::Confirmed,
            kind: CountKind::Cumulative,
            points: vec![
                SeriesPoint { date: date(1), count: 0.0 },
                SeriesPoint { date: date(2), count: 0.0 },
            ],
        };
        let deaths = TimeSeries {
            entity: "ZH".to_string(),
            metric: Metric::Deaths,
            kind: CountKind::Cumulative,
            points: confirmed.points.clone(),
        };

        assert_eq!(case_fatality_rate(&confirmed, &deaths), None);
    }

    #[test]
    fn cfr_single_row_with_zero_denominator_is_undefined() {
        let confirmed = TimeSeries {
            entity: "ZH".to_string(),
            metric: Metric::Confirmed,
            kind: CountKind::Cumulative,
            points: vec![SeriesPoint { date: date(1), count: 0.0 }],
        };
        let deaths = TimeSeries {
            entity: "ZH".to_string(),
            metric: Metric::Deaths,
            kind: CountKind::Cumulative,
            points: vec![SeriesPoint { date: date(1), count: 0.0 }],
        };

        assert_eq!(case_fatality_rate(&confirmed, &deaths), None);
    }

    #[test]
    fn cfr_uses_latest_common_date() {
        let confirmed = TimeSeries {
            entity: "CH".to_string(),
            metric: Metric::Confirmed,
            kind: CountKind::Cumulative,
            points: vec![
                SeriesPoint { date: date(1), count: 200.0 },
                SeriesPoint { date: date(2), count: 400.0 },
                // Confirmed continues past the last deaths observation.
                SeriesPoint { date: date(3), count: 500.0 },
            ],
        };
        let deaths = TimeSeries {
            entity: "CH".to_string(),
            metric: Metric::Deaths,
            kind: CountKind::Cumulative,
            points: vec![
                SeriesPoint { date: date(1), count: 2.0 },
                SeriesPoint { date: date(2), count: 8.0 },
            ],
        };

        assert_eq!(case_fatality_rate(&confirmed, &deaths), Some(2.0));
    }
}
