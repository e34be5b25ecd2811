use std::{f64::consts::PI, io::BufWriter, path::Path};

use fs_err::File;
use getset::{CopyGetters, Getters};
use itertools::Itertools;
use log::info;
use serde::Deserialize;
use svg::{
    node::element::{Group, Path as SvgPath, Text},
    Document,
};
use typed_builder::TypedBuilder;

use crate::schema::{CountryName, Percentage, Record};

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 480.0;
const CENTER: (f64, f64) = (WIDTH / 2.0, HEIGHT / 2.0 + 20.0);
const RADIUS: f64 = 150.0;
const SHADOW_OFFSET: f64 = 0.02 * RADIUS;

// matplotlib's default "tab10" cycle
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// The `n` records with the highest percentage, highest first.
///
/// The sort is stable, so equal values keep the order they were given in.
pub fn top_entries(records: &[Record], n: usize) -> Vec<Record> {
    records
        .iter()
        .sorted_by(|a, b| b.percentage().total_cmp(&a.percentage()))
        .take(n)
        .cloned()
        .collect()
}

/// Look of the pie chart. Angles are in degrees, distances are relative to the radius.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartStyle {
    #[builder(default = "Fossil CO2 emissions by Country".to_owned(), setter(into))]
    pub title: String,
    #[builder(default = 180.0)]
    pub start_angle: f64,
    #[builder(default = 0.83)]
    pub pct_distance: f64,
    #[builder(default = 1.1)]
    pub label_distance: f64,
    /// How far the first slice is pulled out of the pie.
    #[builder(default = 0.1)]
    pub explode: f64,
    #[builder(default = true)]
    pub shadow: bool,
}
impl Default for ChartStyle {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Nothing to plot: the selection is empty or sums to zero")]
    Empty,
    #[error("Cannot plot the negative value {1} of {0}")]
    Negative(CountryName, Percentage),
    #[error("Failed to write the chart: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, Getters, CopyGetters)]
pub struct Slice {
    #[getset(get = "pub")]
    label: CountryName,
    #[getset(get_copy = "pub")]
    value: Percentage,
    /// Share of the whole pie, in `0.0..=1.0`.
    #[getset(get_copy = "pub")]
    fraction: f64,
    #[getset(get_copy = "pub")]
    start_angle: f64,
    #[getset(get_copy = "pub")]
    end_angle: f64,
    /// Apex of the wedge; differs from the pie center only for the exploded slice.
    #[getset(get_copy = "pub")]
    center: (f64, f64),
}
impl Slice {
    fn mid_angle(&self) -> f64 {
        (self.start_angle + self.end_angle) / 2.0
    }

    fn outline(&self) -> String {
        let (cx, cy) = self.center;
        if self.is_whole() {
            // A single arc cannot end where it starts, so a full disc takes two halves.
            let (left, right) = (cx - RADIUS, cx + RADIUS);
            return format!(
                "M {left} {cy} A {RADIUS} {RADIUS} 0 1 0 {right} {cy} A {RADIUS} {RADIUS} 0 1 0 {left} {cy} Z"
            );
        }
        let (x1, y1) = polar(self.center, RADIUS, self.start_angle);
        let (x2, y2) = polar(self.center, RADIUS, self.end_angle);
        let large_arc = u8::from(self.end_angle - self.start_angle > 180.0);
        format!("M {cx} {cy} L {x1} {y1} A {RADIUS} {RADIUS} 0 {large_arc} 0 {x2} {y2} Z")
    }

    fn is_whole(&self) -> bool {
        self.fraction >= 1.0 - 1e-9
    }
}

/// Pie chart over a handful of records, drawn counter-clockwise from `start_angle`.
#[derive(Clone, Debug)]
pub struct PieChart {
    slices: Vec<Slice>,
    style: ChartStyle,
}

impl PieChart {
    pub fn new(records: &[Record], style: ChartStyle) -> Result<Self, ChartError> {
        if let Some(record) = records.iter().find(|r| r.percentage().get() < 0.0) {
            return Err(ChartError::Negative(
                record.country().clone(),
                record.percentage(),
            ));
        }
        let total: f64 = records.iter().map(|r| r.percentage().get()).sum();
        if records.is_empty() || total <= 0.0 {
            return Err(ChartError::Empty);
        }

        let mut angle = style.start_angle;
        let slices = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let fraction = record.percentage().get() / total;
                let start_angle = angle;
                angle += 360.0 * fraction;
                let offset = if i == 0 { style.explode * RADIUS } else { 0.0 };
                Slice {
                    label: record.country().clone(),
                    value: record.percentage(),
                    fraction,
                    start_angle,
                    end_angle: angle,
                    center: polar(CENTER, offset, (start_angle + angle) / 2.0),
                }
            })
            .collect();
        Ok(Self { slices, style })
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    pub fn render(&self) -> Document {
        let mut document = Document::new()
            .set("viewBox", (0, 0, WIDTH, HEIGHT))
            .set("font-family", "sans-serif");

        document = document.add(
            Text::new(self.style.title.clone())
                .set("x", WIDTH / 2.0)
                .set("y", 40)
                .set("font-size", 18)
                .set("text-anchor", "middle"),
        );

        if self.style.shadow {
            let mut shadow = Group::new()
                .set("class", "shadow")
                .set(
                    "transform",
                    format!("translate({SHADOW_OFFSET}, {SHADOW_OFFSET})"),
                )
                .set("fill", "black")
                .set("fill-opacity", 0.3);
            for slice in &self.slices {
                shadow = shadow.add(wedge(slice));
            }
            document = document.add(shadow);
        }

        for (slice, color) in self.slices.iter().zip(PALETTE.iter().cycle()) {
            document = document.add(
                wedge(slice)
                    .set("class", "slice")
                    .set("fill", *color)
                    .set("stroke", "white")
                    .set("stroke-width", 0.5),
            );
        }

        for slice in &self.slices {
            let (x, y) = polar(
                slice.center,
                self.style.pct_distance * RADIUS,
                slice.mid_angle(),
            );
            document = document.add(
                Text::new(format!("{:.1}%", slice.fraction * 100.0))
                    .set("x", x)
                    .set("y", y)
                    .set("font-size", 10)
                    .set("text-anchor", "middle")
                    .set("dominant-baseline", "central"),
            );

            let (x, y) = polar(
                slice.center,
                self.style.label_distance * RADIUS,
                slice.mid_angle(),
            );
            let anchor = if slice.mid_angle().to_radians().cos() >= 0.0 {
                "start"
            } else {
                "end"
            };
            document = document.add(
                Text::new(slice.label.to_string())
                    .set("x", x)
                    .set("y", y)
                    .set("font-size", 12)
                    .set("text-anchor", anchor)
                    .set("dominant-baseline", "central"),
            );
        }

        document
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ChartError> {
        let path = path.as_ref();
        svg::write(BufWriter::new(File::create(path)?), &self.render())?;
        info!("Chart with {} slice(s) written to {path:?}", self.slices.len());
        Ok(())
    }
}

fn wedge(slice: &Slice) -> SvgPath {
    SvgPath::new().set("d", slice.outline())
}

/// Point at `radius` from `center` in direction `degrees`, counter-clockwise from the x axis.
fn polar((cx, cy): (f64, f64), radius: f64, degrees: f64) -> (f64, f64) {
    let theta = degrees * PI / 180.0;
    (cx + radius * theta.cos(), cy - radius * theta.sin())
}
