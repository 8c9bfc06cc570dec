//! Render-free chart descriptions.
//!
//! A spec carries everything the renderer needs: series data, bounds,
//! labels, marker lines and free-text captions. Builders fill these in;
//! the renderer consumes them without knowing where the numbers came from.

use chrono::NaiveDate;
use plotters::style::RGBColor;

/// Fixed four-color palette shared by all charts.
pub const PALETTE: [RGBColor; 4] = [
    RGBColor(0x7a, 0x51, 0x95),
    RGBColor(0xef, 0x56, 0x75),
    RGBColor(0xff, 0xa6, 0x00),
    RGBColor(0x00, 0x3f, 0x5c),
];

/// Color of the fitted exponential overlay.
pub const FIT_COLOR: RGBColor = RGBColor(0x2e, 0x8b, 0x57);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Line,
    Bars,
}

/// One date-keyed series.
#[derive(Debug, Clone)]
pub struct DateSeries {
    pub label: String,
    pub color: RGBColor,
    pub style: SeriesStyle,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Horizontal marker line (e.g. the maximum daily deaths).
#[derive(Debug, Clone)]
pub struct HLine {
    pub y: f64,
    pub label: String,
    pub color: RGBColor,
}

/// Free-floating text, positioned in fractions of the drawing area
/// (`rel_x` from the left, `rel_y` from the bottom).
#[derive(Debug, Clone)]
pub struct Caption {
    pub text: String,
    pub rel_x: f64,
    pub rel_y: f64,
}

/// A chart with a calendar-date x-axis.
#[derive(Debug, Clone)]
pub struct DateChartSpec {
    /// Output file stem; the renderer appends `.png` / `.svg`.
    pub stem: String,
    pub y_label: String,
    /// Log-10 y-axis (cumulative charts). Implies line series only.
    pub log_y: bool,
    pub x_range: (NaiveDate, NaiveDate),
    pub y_range: (f64, f64),
    pub series: Vec<DateSeries>,
    pub hlines: Vec<HLine>,
    pub captions: Vec<Caption>,
}

/// One age-keyed series; `dashed` marks the fitted overlay.
#[derive(Debug, Clone)]
pub struct AgeSeries {
    pub label: String,
    pub color: RGBColor,
    pub dashed: bool,
    pub points: Vec<(f64, f64)>,
}

/// A chart with a numeric (age) x-axis.
#[derive(Debug, Clone)]
pub struct AgeChartSpec {
    pub stem: String,
    pub x_label: String,
    pub y_label: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub series: Vec<AgeSeries>,
    pub captions: Vec<Caption>,
}
