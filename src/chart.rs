use crate::models::{CategoryRecord, SliceResponse};
use std::f64::consts::{PI, TAU};
use std::fmt::Write;

/// Dark-to-light green ramp used on the status page.
pub const GREENS: &[&str] = &[
    "#00441b", "#006d2c", "#238b45", "#41ab5d", "#74c476", "#a1d99b", "#c7e9c0", "#e5f5e0",
    "#f7fcf5",
];

/// Qualitative palette used on the tracker page.
pub const QUALITATIVE: &[&str] = &[
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a", "#19d3f3", "#ff6692", "#b6e880",
    "#ff97ff", "#fecb52",
];

const SIZE: f64 = 320.0;
const RADIUS: f64 = 140.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub category: String,
    pub value: f64,
    pub share: f64,
    /// Radians clockwise from 12 o'clock.
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Pie {
    pub total: f64,
    pub slices: Vec<Slice>,
}

impl Pie {
    pub fn is_empty(&self) -> bool {
        self.total <= 0.0
    }

    pub fn to_response(&self) -> Vec<SliceResponse> {
        self.slices
            .iter()
            .map(|slice| SliceResponse {
                category: slice.category.clone(),
                value: slice.value,
                share: slice.share,
            })
            .collect()
    }
}

/// Splits the records into slices proportional to their value, largest
/// first. Ties keep file order.
pub fn build_pie(records: &[CategoryRecord]) -> Pie {
    let total: f64 = records.iter().map(|record| record.value.max(0.0)).sum();

    let mut ordered: Vec<&CategoryRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.value.total_cmp(&a.value));

    let mut angle = 0.0;
    let slices = ordered
        .into_iter()
        .map(|record| {
            let value = record.value.max(0.0);
            let share = if total > 0.0 { value / total } else { 0.0 };
            let start = angle;
            angle += share * TAU;
            Slice {
                category: record.category.clone(),
                value,
                share,
                start,
                end: angle,
            }
        })
        .collect();

    Pie { total, slices }
}

/// Renders the pie as an inline SVG with a legend. `hole` is the inner
/// radius as a fraction of the outer one; zero draws a full pie.
pub fn render_svg(pie: &Pie, palette: &[&str], hole: f64, title: &str) -> String {
    let center = SIZE / 2.0;
    let inner = RADIUS * hole.clamp(0.0, 0.95);
    let mut svg = String::new();

    let _ = write!(
        svg,
        r#"<svg class="pie" viewBox="0 0 {SIZE} {SIZE}" role="img" aria-label="{}">"#,
        escape_attr(title)
    );

    if pie.is_empty() {
        let _ = write!(
            svg,
            r#"<text class="chart-label" x="{center}" y="{center}" text-anchor="middle">No data yet</text></svg>"#
        );
        return svg;
    }

    for (index, slice) in pie.slices.iter().enumerate() {
        if slice.share <= 0.0 {
            continue;
        }
        let color = palette[index % palette.len()];
        let label = format!("{}: {}", slice.category, format_percent(slice.share));
        let _ = write!(
            svg,
            r#"<path d="{}" fill="{color}" stroke="white" stroke-width="1.5" fill-rule="evenodd"><title>{}</title></path>"#,
            slice_path(center, inner, slice),
            escape_attr(&label)
        );
    }
    svg.push_str("</svg>");

    svg.push_str(r#"<ul class="legend">"#);
    for (index, slice) in pie.slices.iter().enumerate() {
        let color = palette[index % palette.len()];
        let _ = write!(
            svg,
            r#"<li><span class="swatch" style="background:{color}"></span>{} <strong>{}</strong></li>"#,
            escape_attr(&slice.category),
            format_percent(slice.share)
        );
    }
    svg.push_str("</ul>");
    svg
}

pub fn format_percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

fn slice_path(center: f64, inner: f64, slice: &Slice) -> String {
    // A full turn cannot be drawn as one arc; draw two half circles.
    if slice.share >= 1.0 - 1e-9 {
        let mut path = full_circle(center, RADIUS);
        if inner > 0.0 {
            path.push(' ');
            path.push_str(&full_circle(center, inner));
        }
        return path;
    }

    let large = if slice.end - slice.start > PI { 1 } else { 0 };
    let (x0, y0) = point(center, RADIUS, slice.start);
    let (x1, y1) = point(center, RADIUS, slice.end);

    if inner <= 0.0 {
        return format!(
            "M {center:.2} {center:.2} L {x0:.2} {y0:.2} A {RADIUS} {RADIUS} 0 {large} 1 {x1:.2} {y1:.2} Z"
        );
    }

    let (ix1, iy1) = point(center, inner, slice.end);
    let (ix0, iy0) = point(center, inner, slice.start);
    format!(
        "M {x0:.2} {y0:.2} A {RADIUS} {RADIUS} 0 {large} 1 {x1:.2} {y1:.2} L {ix1:.2} {iy1:.2} A {inner:.2} {inner:.2} 0 {large} 0 {ix0:.2} {iy0:.2} Z"
    )
}

fn full_circle(center: f64, radius: f64) -> String {
    let top = center - radius;
    let bottom = center + radius;
    format!(
        "M {center:.2} {top:.2} A {radius:.2} {radius:.2} 0 1 1 {center:.2} {bottom:.2} A {radius:.2} {radius:.2} 0 1 1 {center:.2} {top:.2} Z"
    )
}

fn point(center: f64, radius: f64, angle: f64) -> (f64, f64) {
    (center + radius * angle.sin(), center - radius * angle.cos())
}

fn escape_attr(value: &str) -> String {
    crate::ui::escape_html(value)
}
