//! File rendering of chart specs via Plotters.
//!
//! Every spec is rendered twice, once per backend: `<stem>.png` through
//! the bitmap backend and `<stem>.svg` through the SVG backend. Both
//! share the same generic draw routines, so the two files always show
//! the same picture.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::{Ranged, ValueFormatter};
use plotters::coord::types::{RangedCoordf64, RangedDate};
use plotters::prelude::*;

use crate::error::AppError;
use crate::plot::spec::{AgeChartSpec, Caption, DateChartSpec, SeriesStyle};

const CHART_SIZE: (u32, u32) = (1280, 760);
const MARGIN: i32 = 12;
const LABEL_AREA: i32 = 56;
const CAPTION_FONT: (&str, i32) = ("sans-serif", 22);

/// Render a date-axis chart to `<out_dir>/<stem>.png` and `.svg`.
pub fn render_date_chart(spec: &DateChartSpec, out_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let png = out_dir.join(format!("{}.png", spec.stem));
    let svg = out_dir.join(format!("{}.svg", spec.stem));

    {
        let root = BitMapBackend::new(&png, CHART_SIZE).into_drawing_area();
        draw_date_chart(&root, spec).map_err(|e| render_error(&png, e))?;
        root.present().map_err(|e| render_error(&png, e.to_string()))?;
    }
    {
        let root = SVGBackend::new(&svg, CHART_SIZE).into_drawing_area();
        draw_date_chart(&root, spec).map_err(|e| render_error(&svg, e))?;
        root.present().map_err(|e| render_error(&svg, e.to_string()))?;
    }

    Ok(vec![png, svg])
}

/// Render an age-axis chart to `<out_dir>/<stem>.png` and `.svg`.
pub fn render_age_chart(spec: &AgeChartSpec, out_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let png = out_dir.join(format!("{}.png", spec.stem));
    let svg = out_dir.join(format!("{}.svg", spec.stem));

    {
        let root = BitMapBackend::new(&png, CHART_SIZE).into_drawing_area();
        draw_age_chart(&root, spec).map_err(|e| render_error(&png, e))?;
        root.present().map_err(|e| render_error(&png, e.to_string()))?;
    }
    {
        let root = SVGBackend::new(&svg, CHART_SIZE).into_drawing_area();
        draw_age_chart(&root, spec).map_err(|e| render_error(&svg, e))?;
        root.present().map_err(|e| render_error(&svg, e.to_string()))?;
    }

    Ok(vec![png, svg])
}

fn render_error(path: &Path, detail: impl std::fmt::Display) -> AppError {
    AppError::render(format!("Failed to render '{}': {detail}", path.display()))
}

fn draw_date_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &DateChartSpec,
) -> Result<(), String> {
    root.fill(&WHITE).map_err(|e| e.to_string())?;

    let x_range = RangedDate::from(spec.x_range.0..spec.x_range.1);
    if spec.log_y {
        let y_range = (spec.y_range.0..spec.y_range.1).log_scale();
        let mut chart = ChartBuilder::on(root)
            .margin(MARGIN)
            .x_label_area_size(LABEL_AREA)
            .y_label_area_size(LABEL_AREA)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| e.to_string())?;
        draw_date_series(&mut chart, spec)?;
    } else {
        let y_range = spec.y_range.0..spec.y_range.1;
        let mut chart = ChartBuilder::on(root)
            .margin(MARGIN)
            .x_label_area_size(LABEL_AREA)
            .y_label_area_size(LABEL_AREA)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| e.to_string())?;
        draw_date_series(&mut chart, spec)?;
    }

    draw_captions(root, &spec.captions)
}

/// Series, marker lines and legend for a date chart. Generic over the
/// y-coordinate so the linear and log variants share one body.
fn draw_date_series<'a, DB, Y>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedDate<NaiveDate>, Y>>,
    spec: &DateChartSpec,
) -> Result<(), String>
where
    DB: DrawingBackend + 'a,
    Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    chart
        .configure_mesh()
        .y_desc(&spec.y_label)
        .light_line_style(&RGBColor(0xee, 0xee, 0xee))
        .draw()
        .map_err(|e| e.to_string())?;

    for series in &spec.series {
        let color = series.color;
        match series.style {
            SeriesStyle::Line => {
                chart
                    .draw_series(LineSeries::new(
                        series.points.iter().copied(),
                        color.stroke_width(2),
                    ))
                    .map_err(|e| e.to_string())?
                    .label(series.label.clone())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                    });
            }
            SeriesStyle::Bars => {
                let floor = spec.y_range.0;
                chart
                    .draw_series(series.points.iter().map(|&(date, value)| {
                        Rectangle::new(
                            [(date, floor), (date + Duration::days(1), value)],
                            color.mix(0.7).filled(),
                        )
                    }))
                    .map_err(|e| e.to_string())?
                    .label(series.label.clone())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
                    });
            }
        }
    }

    for hline in &spec.hlines {
        let color = hline.color;
        chart
            .draw_series(LineSeries::new(
                [(spec.x_range.0, hline.y), (spec.x_range.1, hline.y)],
                color.stroke_width(1),
            ))
            .map_err(|e| e.to_string())?
            .label(hline.label.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(1))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK.mix(0.4))
        .draw()
        .map_err(|e| e.to_string())
}

fn draw_age_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &AgeChartSpec,
) -> Result<(), String> {
    root.fill(&WHITE).map_err(|e| e.to_string())?;

    let mut chart: ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>> =
        ChartBuilder::on(root)
            .margin(MARGIN)
            .x_label_area_size(LABEL_AREA)
            .y_label_area_size(LABEL_AREA)
            .build_cartesian_2d(
                spec.x_range.0..spec.x_range.1,
                spec.y_range.0..spec.y_range.1,
            )
            .map_err(|e| e.to_string())?;

    chart
        .configure_mesh()
        .x_desc(&spec.x_label)
        .y_desc(&spec.y_label)
        .light_line_style(&RGBColor(0xee, 0xee, 0xee))
        .draw()
        .map_err(|e| e.to_string())?;

    for series in &spec.series {
        let color = series.color;
        let style = if series.dashed {
            color.stroke_width(2)
        } else {
            color.stroke_width(3)
        };
        if series.dashed {
            chart
                .draw_series(DashedLineSeries::new(
                    series.points.iter().copied(),
                    8,
                    5,
                    style,
                ))
                .map_err(|e| e.to_string())?
                .label(series.label.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                });
        } else {
            chart
                .draw_series(LineSeries::new(series.points.iter().copied(), style))
                .map_err(|e| e.to_string())?
                .label(series.label.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(3))
                });
            // Point markers so sparse bracket data stays visible.
            chart
                .draw_series(
                    series
                        .points
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
                )
                .map_err(|e| e.to_string())?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK.mix(0.4))
        .draw()
        .map_err(|e| e.to_string())?;

    draw_captions(root, &spec.captions)
}

/// Captions live on the root area, positioned in fractions of it
/// (`rel_y` measured from the bottom edge).
fn draw_captions<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    captions: &[Caption],
) -> Result<(), String> {
    let (width, height) = root.dim_in_pixel();
    for caption in captions {
        let x = (caption.rel_x * width as f64) as i32;
        let y = ((1.0 - caption.rel_y) * height as f64) as i32;
        root.draw(&Text::new(
            caption.text.clone(),
            (x, y),
            CAPTION_FONT.into_font().color(&BLACK),
        ))
        .map_err(|e| e.to_string())?;
    }
    Ok(())
}
