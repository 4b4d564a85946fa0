//! Trend charts: one city's observed series plus its next-year projection,
//! rendered to **SVG** (by extension) or **PNG**.

use crate::models::{Observation, Projection};
use anyhow::{Result, anyhow};
use num_format::{Locale, ToFormattedString};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;
use std::path::Path;
use std::sync::Once;

// Office palette: blue for observations, orange for the projection.
const OBSERVED: RGBColor = RGBColor(68, 114, 196);
const PROJECTED: RGBColor = RGBColor(237, 125, 49);

static INIT_FONTS: Once = Once::new();

/// `ab_glyph` does not discover OS fonts, so "sans-serif" is registered from the
/// bundled DejaVu Sans before the first chart is drawn.
fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        if plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../assets/DejaVuSans.ttf"),
        )
        .is_err()
        {
            log::warn!("bundled chart font could not be registered");
        }
    });
}

/// Map a user-provided locale tag to a num-format Locale.
/// Supported tags (case-insensitive): "en", "us", "en_US", "de", "de_DE", "german",
/// "fr", "es", "it", "pt", "nl"
pub fn map_locale(tag: &str) -> &'static Locale {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => &Locale::de,
        "fr" | "fr_fr" => &Locale::fr,
        "es" | "es_es" => &Locale::es,
        "it" | "it_it" => &Locale::it,
        "pt" | "pt_pt" | "pt_br" => &Locale::pt,
        "nl" | "nl_nl" => &Locale::nl,
        _ => &Locale::en,
    }
}

/// Draw a city's population trend with its projected next year.
///
/// A projection without a year (no data) is ignored. Errors when `series` is empty.
pub fn plot_city_trend<P: AsRef<Path>>(
    title: &str,
    series: &[Observation],
    projection: &Projection,
    out_path: P,
    width: u32,
    height: u32,
    locale_tag: &str,
) -> Result<()> {
    if series.is_empty() {
        return Err(anyhow!("no data to plot"));
    }
    ensure_fonts_registered();
    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();

    let mut history: Vec<(i32, f64)> = series
        .iter()
        .map(|o| (o.year, o.population as f64))
        .collect();
    history.sort_by_key(|(y, _)| *y);
    let projected = projection
        .year
        .map(|y| (y, projection.population as f64));

    let all = || history.iter().copied().chain(projected);
    let mut min_year = all().map(|(y, _)| y).min().unwrap_or_default();
    let mut max_year = all().map(|(y, _)| y).max().unwrap_or_default();
    if min_year == max_year {
        min_year = min_year.saturating_sub(1);
        max_year = max_year.saturating_add(1);
    }
    let mut min_val = all().map(|(_, v)| v).fold(f64::INFINITY, f64::min);
    let mut max_val = all().map(|(_, v)| v).fold(f64::NEG_INFINITY, f64::max);
    if (max_val - min_val).abs() < f64::EPSILON {
        min_val -= 1.0;
        max_val += 1.0;
    }
    let pad = (max_val - min_val) * 0.05;
    min_val -= pad;
    max_val += pad;

    let num_locale = map_locale(locale_tag);
    let ranges = ((min_year, max_year), (min_val, max_val));

    if out_path.extension().and_then(|s| s.to_str()) == Some("svg") {
        let root = SVGBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_trend(root, title, &history, projected, ranges, num_locale)?;
    } else {
        let root = BitMapBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_trend(root, title, &history, projected, ranges, num_locale)?;
    }
    log::info!("wrote chart {}", out_path.display());
    Ok(())
}

type Ranges = ((i32, i32), (f64, f64));

/// Helper that draws to any Plotters backend.
fn draw_trend<DB>(
    root: DrawingArea<DB, Shift>,
    title: &str,
    history: &[(i32, f64)],
    projected: Option<(i32, f64)>,
    ((min_year, max_year), (min_val, max_val)): Ranges,
    num_locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(title, ("sans-serif", 24))
        .set_label_area_size(LabelAreaPosition::Left, 90)
        .set_label_area_size(LabelAreaPosition::Bottom, 44)
        .build_cartesian_2d(min_year..max_year, min_val..max_val)
        .map_err(|e| anyhow!("{:?}", e))?;

    // Y uses locale thousands separators; whole people only
    let y_label_fmt = |v: &f64| (v.round() as i64).to_formatted_string(num_locale);
    let x_label_fmt = |y: &i32| y.to_string();
    let x_label_count = (i64::from(max_year) - i64::from(min_year) + 1).clamp(2, 12) as usize;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Population")
        .x_labels(x_label_count)
        .y_labels(10)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    chart
        .draw_series(LineSeries::new(
            history.iter().copied(),
            OBSERVED.stroke_width(2),
        ))
        .map_err(|e| anyhow!("{:?}", e))?
        .label("Observed")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], OBSERVED.stroke_width(2)));
    chart
        .draw_series(
            history
                .iter()
                .map(|&p| Circle::new(p, 3, OBSERVED.filled())),
        )
        .map_err(|e| anyhow!("{:?}", e))?;

    if let (Some(&last), Some(next)) = (history.last(), projected) {
        chart
            .draw_series(LineSeries::new(vec![last, next], PROJECTED.stroke_width(2)))
            .map_err(|e| anyhow!("{:?}", e))?
            .label(format!("Projected {}", next.0))
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 24, y)], PROJECTED.stroke_width(2))
            });
        chart
            .draw_series(std::iter::once(Circle::new(next, 5, PROJECTED.filled())))
            .map_err(|e| anyhow!("{:?}", e))?;
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .label_font(("sans-serif", 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}
