use crate::table::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every chart type the shaper knows how to prepare data for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    StackedBar,
    Pie,
    Table,
    SummaryTable,
    Bubble,
    HeatMap,
    Scatter,
    BoxPlot,
    Histogram,
    Timeline,
    Sankey,
}

impl ChartKind {
    pub const ALL: [ChartKind; 13] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::StackedBar,
        ChartKind::Pie,
        ChartKind::Table,
        ChartKind::SummaryTable,
        ChartKind::Bubble,
        ChartKind::HeatMap,
        ChartKind::Scatter,
        ChartKind::BoxPlot,
        ChartKind::Histogram,
        ChartKind::Timeline,
        ChartKind::Sankey,
    ];

    /// Parse a caller-supplied chart type. Underscores, spaces and case are ignored
    /// and a few common spellings are accepted.
    pub fn parse(raw: &str) -> Option<ChartKind> {
        let norm: String = raw
            .chars()
            .filter(|c| *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let kind = match norm.as_str() {
            "line" | "linechart" => ChartKind::Line,
            "bar" | "barchart" => ChartKind::Bar,
            "stackedbar" | "stackedbarchart" => ChartKind::StackedBar,
            "pie" | "piechart" => ChartKind::Pie,
            "table" => ChartKind::Table,
            "summarytable" => ChartKind::SummaryTable,
            "bubble" | "bubblechart" => ChartKind::Bubble,
            "heatmap" => ChartKind::HeatMap,
            "scatter" | "scatterplot" => ChartKind::Scatter,
            "box" | "boxplot" => ChartKind::BoxPlot,
            "histogram" => ChartKind::Histogram,
            "timeline" | "timelinechart" => ChartKind::Timeline,
            "sankey" | "sankeychart" => ChartKind::Sankey,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line_chart",
            ChartKind::Bar => "bar_chart",
            ChartKind::StackedBar => "stacked_bar_chart",
            ChartKind::Pie => "pie_chart",
            ChartKind::Table => "table",
            ChartKind::SummaryTable => "summary_table",
            ChartKind::Bubble => "bubble_chart",
            ChartKind::HeatMap => "heat_map",
            ChartKind::Scatter => "scatter_plot",
            ChartKind::BoxPlot => "box_plot",
            ChartKind::Histogram => "histogram",
            ChartKind::Timeline => "timeline",
            ChartKind::Sankey => "sankey",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Small grouped table handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl AggregateTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Vec<&Value> {
        match self.column_index(name) {
            Some(i) => self.rows.iter().filter_map(|r| r.get(i)).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarMode {
    Group,
    Stack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binning {
    /// Equal-width time bins.
    Time,
    /// Equal-width numeric bins.
    Numeric,
    /// One bar per distinct value.
    Categorical,
}

/// How the renderer should read an aggregate table. Each chart kind produces
/// exactly one variant; field values are column names of the aggregate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum RenderDirective {
    Line { x: String, y: String, series: Option<String>, frequency: Frequency, show_legend: bool },
    Bar { x: String, y: String, series: Option<String>, mode: BarMode, show_legend: bool },
    Pie { names: String, values: String },
    Table { columns: Vec<String> },
    Bubble { x: String, y: String, size: String, color: String, show_legend: bool },
    HeatMap { x: String, y: String, z: String },
    Scatter { x: String, y: String, size: String },
    BoxPlot { x: String, min: String, q1: String, median: String, q3: String, max: String },
    Histogram { x: String, y: String, binning: Binning, bins: usize },
    Timeline { start: String, end: String, lane: Option<String> },
    Sankey { source: String, target: String, value: String },
}

/// Output of shaping one requested chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedChart {
    pub title: String,
    pub kind: ChartKind,
    pub table: AggregateTable,
    pub directive: RenderDirective,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_round_trips_canonical_names() {
        assert_eq!(ChartKind::parse("Heat Map"), Some(ChartKind::HeatMap));
        assert_eq!(ChartKind::parse("stacked_bar"), Some(ChartKind::StackedBar));
        assert_eq!(ChartKind::parse("timeline_chart"), Some(ChartKind::Timeline));
        assert_eq!(ChartKind::parse("SankeyChart"), Some(ChartKind::Sankey));
        assert_eq!(ChartKind::parse("radar"), None);
        for k in ChartKind::ALL {
            assert_eq!(ChartKind::parse(k.as_str()), Some(k));
        }
    }
}
