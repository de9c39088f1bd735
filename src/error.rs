use crate::resolver::ResolveError;
use crate::shaper::ShapingError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot encode chart payload: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("cannot encode request log: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a single chart could not be produced. Every variant is non-fatal for the
/// dashboard: the assembler turns it into a placeholder and moves on.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("columns {requested:?} not found")]
    ColumnMismatch { requested: Vec<String> },
    #[error("chart type '{0}' is not supported")]
    UnsupportedChartKind(String),
    #[error(transparent)]
    Shaping(#[from] ShapingError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ChartError {
    /// Short heading shown in the chart's placeholder.
    pub fn placeholder_message(&self, dataset: &str) -> String {
        match self {
            ChartError::Resolve(e) if e.is_not_found() => format!("Dataset '{dataset}' not found"),
            ChartError::Resolve(e) => format!("Dataset '{dataset}' could not be loaded: {e}"),
            ChartError::ColumnMismatch { requested } => format!("Columns {requested:?} not found"),
            ChartError::UnsupportedChartKind(kind) => format!("Chart type '{kind}' is not supported yet."),
            ChartError::Shaping(ShapingError::EmptyResult { .. }) => "No data to display".to_string(),
            ChartError::Shaping(e) => format!("Cannot draw chart: {e}"),
            ChartError::Render(e) => format!("Cannot render chart: {e}"),
        }
    }
}
