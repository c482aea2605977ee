//! # Chart Module
//!
//! Grouped bar chart over the first numeric columns of a table, rendered as SVG.

use crate::table::Table;
use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;
use tracing::debug;

/// Number of numeric columns drawn at most.
pub const MAX_SERIES: usize = 2;

const CHART_SIZE: (u32, u32) = (800, 480);

/// Largest axis magnitude; keeps the axis span finite for values near `f64::MAX`.
const AXIS_LIMIT: f64 = f64::MAX / 4.0;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Drawing chart failed: {0}")]
    DrawError(String),
}

fn draw_error<E: std::error::Error + Send + Sync>(error: DrawingAreaErrorKind<E>) -> ChartError {
    ChartError::DrawError(error.to_string())
}

/// One numeric column; `None` marks a missing cell, drawn as an absent bar.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    pub title: String,
    pub series: Vec<Series>,
}

impl Chart {
    /// Takes up to [`MAX_SERIES`] numeric columns in table order, one bar group per row.
    /// Returns `None` when the table has no numeric column.
    pub fn from_table(table: &Table) -> Option<Chart> {
        let series: Vec<Series> = table
            .numeric_columns()
            .into_iter()
            .take(MAX_SERIES)
            .map(|index| Series {
                name: table.columns()[index].name.clone(),
                values: table.column_values(index).map(|value| value.as_number()).collect(),
            })
            .collect();
        if series.is_empty() {
            return None;
        }
        Some(Chart {
            title: table.name().to_owned(),
            series,
        })
    }

    pub fn rows(&self) -> usize {
        self.series.iter().map(|series| series.values.len()).max().unwrap_or_default()
    }

    /// Value range of the y axis, always including zero. Both bounds stay within
    /// [`AXIS_LIMIT`] so the span is finite.
    fn value_range(&self) -> (f64, f64) {
        let values = self
            .series
            .iter()
            .flat_map(|series| series.values.iter().flatten().copied())
            .filter(|value| value.is_finite());
        let (low, high) = values.fold((0f64, 0f64), |(low, high), value| (low.min(value), high.max(value)));
        let (low, high) = (low.max(-AXIS_LIMIT), high.min(AXIS_LIMIT));
        if low == high {
            (low, low + 1.0)
        } else {
            let padding = high * 0.05 - low * 0.05;
            (if low < 0.0 { low - padding } else { low }, if high > 0.0 { high + padding } else { high })
        }
    }

    /// Renders the chart as an SVG document.
    pub fn render_svg(&self) -> Result<String, ChartError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
            self.draw(&root)?;
            root.present().map_err(draw_error)?;
        }
        debug!(title = %self.title, series = self.series.len(), bytes = svg.len(), "rendered chart");
        Ok(svg)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), ChartError> {
        root.fill(&WHITE).map_err(draw_error)?;

        let rows = self.rows().max(1) as f64;
        let (low, high) = self.value_range();
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 22))
            .margin(16)
            .x_label_area_size(36)
            .y_label_area_size(56)
            .build_cartesian_2d(0f64..rows, low..high)
            .map_err(draw_error)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Row")
            .x_label_formatter(&|x| format!("{}", x.floor() as i64))
            .draw()
            .map_err(draw_error)?;

        let width = 0.8 / self.series.len() as f64;
        for (position, series) in self.series.iter().enumerate() {
            let color = Palette99::pick(position).mix(0.85);
            let offset = 0.1 + width * position as f64;
            let bars = series.values.iter().enumerate().filter_map(|(row, value)| {
                value.filter(|value| value.is_finite()).map(|value| {
                    let left = row as f64 + offset;
                    let top = value.clamp(low, high);
                    Rectangle::new([(left, 0.0), (left + width, top)], color.filled())
                })
            });
            chart
                .draw_series(bars)
                .map_err(draw_error)?
                .label(series.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::value::Value;

    fn table() -> Table {
        Table::from_values(
            "metrics.csv",
            vec!["label".to_owned(), "a".to_owned(), "b".to_owned(), "c".to_owned()],
            vec![
                vec![Value::Text("x".to_owned()), Value::Number(1.0), Value::Number(-2.0), Value::Number(9.0)],
                vec![Value::Text("y".to_owned()), Value::Missing, Value::Number(4.5), Value::Number(3.0)],
            ],
        )
    }

    #[test]
    fn first_two_numeric_columns() {
        let chart = Chart::from_table(&table()).unwrap();
        assert_eq!(chart.title, "metrics.csv");
        let names: Vec<&str> = chart.series.iter().map(|series| series.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(chart.series[0].values, vec![Some(1.0), None]);
        assert_eq!(chart.rows(), 2);
    }

    #[test]
    fn no_numeric_columns() {
        let table = Table::from_values(
            "names.csv",
            vec!["name".to_owned()],
            vec![vec![Value::Text("Alice".to_owned())]],
        );
        assert!(Chart::from_table(&table).is_none());
    }

    #[test]
    fn value_range_includes_zero() {
        let chart = Chart::from_table(&table()).unwrap();
        let (low, high) = chart.value_range();
        assert!(low < -2.0 && high > 4.5);

        let flat = Chart {
            title: "flat".to_owned(),
            series: vec![Series {
                name: "z".to_owned(),
                values: vec![Some(0.0), None],
            }],
        };
        assert_eq!(flat.value_range(), (0.0, 1.0));
    }

    fn extremes() -> Chart {
        Chart {
            title: "extremes".to_owned(),
            series: vec![Series {
                name: "v".to_owned(),
                values: vec![Some(1e308), Some(-1e308), Some(f64::MAX), Some(f64::MIN)],
            }],
        }
    }

    #[test]
    fn value_range_of_extreme_values_is_finite() {
        let (low, high) = extremes().value_range();
        assert!(low.is_finite() && high.is_finite());
        assert!((high - low).is_finite());
        assert!(low < 0.0 && high > 0.0);
    }

    #[test]
    fn renders_extreme_values() {
        let svg = extremes().render_svg().unwrap();
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn renders_svg_with_legend() {
        let svg = Chart::from_table(&table()).unwrap().render_svg().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("metrics.csv"));
        assert!(svg.contains(">a<") || svg.lines().any(|line| line.trim() == "a"));
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn renders_empty_rows() {
        let table = Table::from_values("empty.csv", vec!["n".to_owned()], Vec::new());
        let svg = Chart::from_table(&table).unwrap().render_svg().unwrap();
        assert!(svg.contains("</svg>"));
    }
}
