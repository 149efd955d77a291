use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, BorderType, Borders, Chart, Dataset, GraphType, Paragraph, Widget},
};

use super::{ChartData, Rasterizer};
use crate::error::RenderError;

/// Smallest surface that still fits axes, labels and one legend row
pub const MIN_WIDTH: u16 = 20;
pub const MIN_HEIGHT: u16 = 8;

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::LightRed,
    Color::LightBlue,
];

/// Color of the `index`-th series, cycling through the palette.
pub fn series_color(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

/// Rasterizes a chart into a fixed-size terminal cell buffer, braille
/// lines per series with a legend underneath. Gaps stay empty.
#[derive(Debug, Clone)]
pub struct TerminalRasterizer {
    area: Rect,
}

impl TerminalRasterizer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            area: Rect::new(0, 0, width, height),
        }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Rows reserved for the legend: one per series, capped so the plot
    /// keeps at least `MIN_HEIGHT - 2` rows.
    pub fn legend_rows(&self, series: usize) -> u16 {
        let max_rows = self.area.height.saturating_sub(MIN_HEIGHT - 2);
        u16::try_from(series).unwrap_or(u16::MAX).min(max_rows)
    }
}

impl Rasterizer for TerminalRasterizer {
    type Image = Buffer;

    fn rasterize(&self, chart: &ChartData) -> Result<Buffer, RenderError> {
        if self.area.width < MIN_WIDTH || self.area.height < MIN_HEIGHT {
            return Err(RenderError::SurfaceTooSmall {
                width: self.area.width,
                height: self.area.height,
            });
        }

        let [x_min, mut x_max] = chart.x_axis.bounds;
        let [y_min, y_max] = chart.y_axis.bounds;
        if !(x_min.is_finite() && x_max.is_finite() && y_min.is_finite() && y_max.is_finite()) {
            return Err(RenderError::Degenerate("non-finite axis bounds"));
        }
        if x_max < x_min || y_max <= y_min {
            return Err(RenderError::Degenerate("inverted axis bounds"));
        }
        // Two rounds inside the same millisecond
        if x_max == x_min {
            x_max = x_min + 1.0;
        }

        let segments: Vec<(Color, Vec<(f64, f64)>)> = chart
            .series
            .iter()
            .enumerate()
            .flat_map(|(i, series)| {
                series
                    .segments()
                    .into_iter()
                    .map(move |segment| (series_color(i), segment))
            })
            .collect();

        let datasets: Vec<Dataset> = segments
            .iter()
            .map(|(color, points)| {
                Dataset::default()
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(*color))
                    .data(points)
            })
            .collect();

        let legend_rows = self.legend_rows(chart.series.len());
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(MIN_HEIGHT - 2), Constraint::Length(legend_rows)])
            .split(self.area);

        let plot = Chart::new(datasets)
            .block(
                Block::default()
                    .title(chart.title.as_str())
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .x_axis(
                Axis::default()
                    .title(chart.x_axis.title.as_str())
                    .bounds([x_min, x_max])
                    .labels(chart.x_axis.labels.iter().map(|l| Span::raw(l.as_str())).collect()),
            )
            .y_axis(
                Axis::default()
                    .title(chart.y_axis.title.as_str())
                    .bounds([y_min, y_max])
                    .labels(chart.y_axis.labels.iter().map(|l| Span::raw(l.as_str())).collect()),
            )
            // The legend is drawn below the plot instead
            .hidden_legend_constraints((Constraint::Length(0), Constraint::Length(0)));

        let legend: Vec<Line> = chart
            .series
            .iter()
            .enumerate()
            .map(|(i, series)| {
                Line::from(vec![
                    Span::styled("■ ", Style::default().fg(series_color(i))),
                    Span::raw(series.label.as_str()),
                ])
            })
            .collect();

        let mut buf = Buffer::empty(self.area);
        plot.render(chunks[0], &mut buf);
        Paragraph::new(legend).render(chunks[1], &mut buf);
        Ok(buf)
    }
}
