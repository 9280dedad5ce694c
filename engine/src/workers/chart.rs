//! SVG chart rendering
//!
//! Scatter, line and bar charts with a title, axis labels and a light grid.
//! Scatter and line charts can carry a least-squares regression line, drawn
//! dotted red.

use sdk::errors::CapabilityError;
use std::fmt::Write;
use std::str::FromStr;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;
const TICKS: usize = 6;
const POINT_COLOR: &str = "#1f77b4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Scatter,
    Line,
    Bar,
}

impl ChartKind {
    /// Whether the x axis is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, ChartKind::Scatter | ChartKind::Line)
    }
}

impl FromStr for ChartKind {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scatter" => Ok(ChartKind::Scatter),
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            other => Err(CapabilityError::UnsupportedChartKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub regression_line: bool,
    pub width: u32,
    pub height: u32,
}

/// Plottable values, already reduced to numbers
#[derive(Debug, Clone)]
pub enum ChartData {
    Points(Vec<(f64, f64)>),
    Bars(Vec<(String, f64)>),
}

impl ChartData {
    pub fn len(&self) -> usize {
        match self {
            ChartData::Points(p) => p.len(),
            ChartData::Bars(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Least-squares fit `y = slope * x + intercept`
///
/// `None` with fewer than two points or when every x is the same.
pub fn least_squares(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
        let dx = x - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });
    if sxx.abs() < f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

/// Linear mapping from data space to the plot area
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn px(&self, x: f64) -> f64 {
        self.left + (x - self.x_min) / (self.x_max - self.x_min) * self.width
    }

    fn py(&self, y: f64) -> f64 {
        self.top + self.height - (y - self.y_min) / (self.y_max - self.y_min) * self.height
    }
}

pub fn render_svg(spec: &ChartSpec, data: &ChartData) -> String {
    let width = f64::from(spec.width);
    let height = f64::from(spec.height);
    let plot_w = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
    let plot_h = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
        w = spec.width,
        h = spec.height
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

    let (x_ticks, y_ticks) = match data {
        ChartData::Points(points) => {
            let xs = nice_ticks(points.iter().map(|p| p.0));
            let ys = nice_ticks(points.iter().map(|p| p.1));
            (Some(xs), ys)
        }
        ChartData::Bars(bars) => {
            let ys = nice_ticks(bars.iter().map(|b| b.1).chain(std::iter::once(0.0)));
            (None, ys)
        }
    };

    let (x_min, x_max) = match &x_ticks {
        Some(ticks) => bounds(ticks),
        None => (0.0, data.len().max(1) as f64),
    };
    let (y_min, y_max) = bounds(&y_ticks);

    let frame = Frame {
        left: MARGIN_LEFT,
        top: MARGIN_TOP,
        width: plot_w,
        height: plot_h,
        x_min,
        x_max,
        y_min,
        y_max,
    };

    // Grid and tick labels
    for &y in &y_ticks {
        let py = frame.py(y);
        let _ = writeln!(
            svg,
            r##"<line x1="{:.1}" y1="{py:.1}" x2="{:.1}" y2="{py:.1}" stroke="#dddddd"/>"##,
            frame.left,
            frame.left + frame.width
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
            frame.left - 8.0,
            py + 4.0,
            format_tick(y)
        );
    }
    if let Some(ticks) = &x_ticks {
        for &x in ticks {
            let px = frame.px(x);
            let _ = writeln!(
                svg,
                r##"<line x1="{px:.1}" y1="{:.1}" x2="{px:.1}" y2="{:.1}" stroke="#dddddd"/>"##,
                frame.top,
                frame.top + frame.height
            );
            let _ = writeln!(
                svg,
                r#"<text x="{px:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                frame.top + frame.height + 18.0,
                format_tick(x)
            );
        }
    }

    // Axes
    let _ = writeln!(
        svg,
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="black"/>"#,
        frame.left, frame.top, frame.width, frame.height
    );

    match data {
        ChartData::Points(points) => render_points(&mut svg, spec, &frame, points),
        ChartData::Bars(bars) => render_bars(&mut svg, &frame, bars),
    }

    // Title and axis labels
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="16">{}</text>"#,
        width / 2.0,
        MARGIN_TOP / 2.0 + 6.0,
        escape_xml(&spec.title)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{}</text>"#,
        frame.left + frame.width / 2.0,
        height - 12.0,
        escape_xml(&spec.x_label)
    );
    let _ = writeln!(
        svg,
        r#"<text x="18" y="{y:.1}" text-anchor="middle" font-size="13" transform="rotate(-90 18 {y:.1})">{}</text>"#,
        escape_xml(&spec.y_label),
        y = frame.top + frame.height / 2.0
    );

    svg.push_str("</svg>\n");
    svg
}

fn render_points(svg: &mut String, spec: &ChartSpec, frame: &Frame, points: &[(f64, f64)]) {
    if spec.kind == ChartKind::Line {
        let mut sorted = points.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let path: Vec<String> = sorted
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", frame.px(*x), frame.py(*y)))
            .collect();
        let _ = writeln!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            path.join(" "),
            POINT_COLOR
        );
    } else {
        for (x, y) in points {
            let _ = writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{}" fill-opacity="0.8"/>"#,
                frame.px(*x),
                frame.py(*y),
                POINT_COLOR
            );
        }
    }

    if spec.regression_line {
        if let Some((slope, intercept)) = least_squares(points) {
            let lo = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
            let hi = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
            let _ = writeln!(
                svg,
                r#"<line class="regression" x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="red" stroke-width="2" stroke-dasharray="6,4"/>"#,
                frame.px(lo),
                frame.py(slope * lo + intercept),
                frame.px(hi),
                frame.py(slope * hi + intercept)
            );
        }
    }
}

fn render_bars(svg: &mut String, frame: &Frame, bars: &[(String, f64)]) {
    let band = frame.width / bars.len().max(1) as f64;
    let rotate = bars.len() > 8;
    let baseline = frame.py(0.0);

    for (i, (label, value)) in bars.iter().enumerate() {
        let x = frame.left + band * i as f64 + band * 0.15;
        let top = frame.py(*value);
        let (y, h) = if top < baseline {
            (top, baseline - top)
        } else {
            (baseline, top - baseline)
        };
        let _ = writeln!(
            svg,
            r#"<rect class="bar" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
            x,
            y,
            band * 0.7,
            h,
            POINT_COLOR
        );

        let cx = frame.left + band * (i as f64 + 0.5);
        let ly = frame.top + frame.height + 18.0;
        if rotate {
            let _ = writeln!(
                svg,
                r#"<text x="{cx:.1}" y="{ly:.1}" text-anchor="end" transform="rotate(-45 {cx:.1} {ly:.1})">{}</text>"#,
                escape_xml(label)
            );
        } else {
            let _ = writeln!(
                svg,
                r#"<text x="{cx:.1}" y="{ly:.1}" text-anchor="middle">{}</text>"#,
                escape_xml(label)
            );
        }
    }
}

/// Evenly spaced round tick values covering every input value
fn nice_ticks(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return vec![0.0, 1.0];
    }
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }

    let step = nice_number((hi - lo) / (TICKS - 1) as f64);
    let start = (lo / step).floor() * step;
    let end = (hi / step).ceil() * step;
    let count = (((end - start) / step).round() as usize).clamp(1, 4 * TICKS);

    (0..=count).map(|i| start + step * i as f64).collect()
}

/// Round `raw` up to 1, 2, 5 or 10 times a power of ten
fn nice_number(raw: f64) -> f64 {
    let exponent = raw.log10().floor();
    let magnitude = 10f64.powf(exponent);
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn bounds(ticks: &[f64]) -> (f64, f64) {
    match (ticks.first(), ticks.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        _ => (0.0, 1.0),
    }
}

/// Compact tick label (`2.5B`, `120M`, `15k`, `0.25`)
fn format_tick(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e4 {
        (value / 1e3, "k")
    } else {
        (value, "")
    };

    let mut text = format!("{:.2}", scaled);
    while text.contains('.') && (text.ends_with('0') || text.ends_with('.')) {
        text.pop();
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text.push_str(suffix);
    text
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: ChartKind, regression_line: bool) -> ChartSpec {
        ChartSpec {
            kind,
            title: "Plot of Peak vs. Rank".to_string(),
            x_label: "Rank".to_string(),
            y_label: "Peak".to_string(),
            regression_line,
            width: 800,
            height: 600,
        }
    }

    #[test]
    fn test_chart_kind_parsing() {
        assert_eq!("Scatter".parse::<ChartKind>().unwrap(), ChartKind::Scatter);
        assert_eq!(" bar ".parse::<ChartKind>().unwrap(), ChartKind::Bar);
        assert!(matches!(
            "pie".parse::<ChartKind>(),
            Err(CapabilityError::UnsupportedChartKind(kind)) if kind == "pie"
        ));
    }

    #[test]
    fn test_least_squares() {
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)];
        let (slope, intercept) = least_squares(&points).unwrap();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);

        assert!(least_squares(&[(1.0, 1.0)]).is_none());
        assert!(least_squares(&[(1.0, 1.0), (1.0, 2.0)]).is_none());
    }

    #[test]
    fn test_scatter_with_regression() {
        let data = ChartData::Points(vec![(1.0, 2.0), (2.0, 4.5), (3.0, 5.5)]);
        let svg = render_svg(&spec(ChartKind::Scatter, true), &data);

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains(r#"class="regression""#));
        assert!(svg.contains(r#"stroke="red""#));
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains("Plot of Peak vs. Rank"));
    }

    #[test]
    fn test_line_and_bar() {
        let data = ChartData::Points(vec![(3.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
        let svg = render_svg(&spec(ChartKind::Line, false), &data);
        assert!(svg.contains("<polyline"));
        assert!(!svg.contains("regression"));

        let data = ChartData::Bars(vec![
            ("A & B".to_string(), 3.0),
            ("C".to_string(), -1.0),
        ]);
        let svg = render_svg(&spec(ChartKind::Bar, false), &data);
        assert_eq!(svg.matches(r#"class="bar""#).count(), 2);
        assert!(svg.contains("A &amp; B"));
    }

    #[test]
    fn test_ticks_and_labels() {
        let ticks = nice_ticks([2018.0, 2021.0].into_iter());
        assert!(ticks.first().copied().unwrap() <= 2018.0);
        assert!(ticks.last().copied().unwrap() >= 2021.0);

        assert!(nice_ticks([5.0, 5.0].into_iter()).len() > 1);
        assert_eq!(format_tick(2_500_000_000.0), "2.5B");
        assert_eq!(format_tick(15_000.0), "15k");
        assert_eq!(format_tick(0.25), "0.25");
        assert_eq!(format_tick(3.0), "3");
    }
}
