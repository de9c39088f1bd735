use crate::categorize::Categorizer;
use crate::chart::{AggregateTable, ChartKind, RenderDirective, ShapedChart};
use crate::config::EngineConfig;
use crate::error::{ChartError, PublishError, RenderError};
use crate::matcher;
use crate::resolver::{DatasetResolver, ResolveError};
use crate::shaper::ChartShaper;
use crate::store::BlobStore;
use crate::timewindow::{self, TimeWindow};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

fn untitled() -> String {
    "Untitled".to_string()
}

/// One requested chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub dataset: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardRequest {
    #[serde(default)]
    pub user_query: String,
    #[serde(default)]
    pub dashboard: Vec<ChartSpec>,
    /// Column name -> case-insensitive substring every row must contain.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl DashboardRequest {
    /// Accepts a plain request object, a bare list of chart specs, or either of
    /// those wrapped in a `{"dashboard_data": ..., "user_query": ...}` envelope
    /// (itself optionally the first element of a list).
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        use serde_json::Value as Json;
        match value {
            Json::Array(items) => {
                if items.first().is_some_and(|v| v.get("dashboard_data").is_some()) {
                    return Self::from_value(items.into_iter().next().unwrap_or_default());
                }
                let dashboard = serde_json::from_value(Json::Array(items))?;
                Ok(Self { dashboard, ..Self::default() })
            }
            Json::Object(mut obj) => match obj.remove("dashboard_data") {
                Some(data) => {
                    let mut req = Self::from_value(data)?;
                    if req.user_query.is_empty() {
                        if let Some(q) = obj.get("user_query").and_then(Json::as_str) {
                            req.user_query = q.to_string();
                        }
                    }
                    Ok(req)
                }
                None => serde_json::from_value(Json::Object(obj)),
            },
            other => serde_json::from_value(other),
        }
    }
}

/// Turns a shaped chart into an HTML fragment.
pub trait ChartRenderer {
    fn render(&self, chart: &ShapedChart) -> Result<String, RenderError>;
}

/// Emits a chart container holding the title and a JSON payload that a
/// client-side charting library draws from.
pub struct EmbedRenderer {
    palette: Vec<String>,
}

impl EmbedRenderer {
    pub fn new(palette: Vec<String>) -> Self {
        Self { palette }
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    kind: ChartKind,
    table: &'a AggregateTable,
    directive: &'a RenderDirective,
    palette: &'a [String],
}

impl ChartRenderer for EmbedRenderer {
    fn render(&self, chart: &ShapedChart) -> Result<String, RenderError> {
        let payload = Payload { kind: chart.kind, table: &chart.table, directive: &chart.directive, palette: &self.palette };
        // keep the payload from closing its own script element
        let json = serde_json::to_string(&payload)?.replace("</", "<\\/");
        Ok(format!(
            "<div class='chart-container' data-chart='{}'><h2>{}</h2><script type='application/json' class='chart-data'>{}</script></div>",
            chart.kind,
            escape_html(&chart.title),
            json
        ))
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn placeholder(message: &str) -> String {
    format!("<div class='chart-container placeholder'><h3>{}</h3></div>", escape_html(message))
}

/// Result of one requested chart: either a drawn chart or the reason it was replaced.
#[derive(Debug, Serialize)]
pub struct ChartOutcome {
    pub title: String,
    pub dataset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ShapedChart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub html: String,
}

impl ChartOutcome {
    pub fn is_placeholder(&self) -> bool {
        self.chart.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user_query: String,
    pub window: Option<TimeWindow>,
    pub charts: Vec<ChartOutcome>,
}

const SUMMARY_PENDING: &str = "<p>No summary available.</p>";

const PAGE_STYLE: &str = "body { font-family: Arial; background: #E9FFDB; color: #2F4F4F; margin: 0; text-align: center; }
.dashboard-container { display: grid; grid-template-columns: repeat(3, 1fr); gap: 20px; padding: 20px; max-width: 1600px; margin: 0 auto; }
.chart-container { background: #F8FFF1; padding: 15px; border-radius: 10px; box-shadow: 0 4px 10px rgba(0,0,0,0.1); }
#summary-view { max-width: 1000px; margin: auto; padding: 30px; text-align: left; }
footer { background: #D0E8C2; padding: 10px; margin-top: 20px; }";

impl Dashboard {
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.charts.iter().map(|c| c.html.as_str())
    }

    pub fn placeholders(&self) -> usize {
        self.charts.iter().filter(|c| c.is_placeholder()).count()
    }

    /// The full page. `summary_html` is inserted as-is into the summary section.
    pub fn render_page(&self, summary_html: Option<&str>) -> String {
        let charts = self.fragments().join("\n");
        let summary = match summary_html {
            Some(s) => format!("<div class='summary-body'>{s}</div>"),
            None => SUMMARY_PENDING.to_string(),
        };
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset='utf-8'>\n<title>Dashboard</title>\n<style>\n{PAGE_STYLE}\n</style>\n</head>\n<body>\n<h1>Dashboard</h1>\n<p class='query'>{}</p>\n<div class='dashboard-container'>\n{charts}\n</div>\n<div id='summary-view'>\n<h2>Summary</h2>\n{summary}\n</div>\n<footer>Generated by chartscope</footer>\n</body>\n</html>\n",
            escape_html(&self.user_query)
        )
    }
}

/// Keys written by [`publish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub page_key: String,
    pub request_key: String,
}

/// Store a rendered page under `dashboards/` and the request that produced it
/// under `logs/`, both stamped with the unix time of `at`.
pub fn publish(
    store: &mut dyn BlobStore,
    page_html: &str,
    request: &DashboardRequest,
    at: DateTime<Utc>,
) -> Result<Publication, PublishError> {
    let ts = at.timestamp();
    let publication = Publication {
        page_key: format!("dashboards/dashboard_{ts}.html"),
        request_key: format!("logs/input_{ts}.json"),
    };
    store.put(&publication.page_key, page_html.as_bytes())?;
    store.put(&publication.request_key, &serde_json::to_vec(request)?)?;
    info!(page = %publication.page_key, request = %publication.request_key, "dashboard published");
    Ok(publication)
}

/// Drives every chart of a request through resolve, match, shape and render,
/// isolating failures per chart.
pub struct Assembler<'a> {
    config: &'a EngineConfig,
    store: &'a dyn BlobStore,
    renderer: &'a dyn ChartRenderer,
    categorizer: Categorizer,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a EngineConfig, store: &'a dyn BlobStore, renderer: &'a dyn ChartRenderer) -> Self {
        let categorizer = Categorizer::default().with_descriptive_min_len(config.shaping.descriptive_min_len);
        Self { config, store, renderer, categorizer }
    }

    pub fn with_categorizer(mut self, categorizer: Categorizer) -> Self {
        self.categorizer = categorizer;
        self
    }

    pub fn assemble(&self, request: &DashboardRequest, now: DateTime<Utc>) -> Dashboard {
        let window = timewindow::resolve(&request.user_query, now);
        match &window {
            Some(w) => info!(start = %w.start, end = %w.end, "time window resolved from query"),
            None => info!("no time window in query"),
        }

        let mut charts = Vec::with_capacity(request.dashboard.len());
        for spec in &request.dashboard {
            info!(title = %spec.title, kind = %spec.kind, dataset = %spec.dataset, "processing chart");
            let outcome = self
                .build_chart(spec, window.as_ref(), &request.filters, now)
                .and_then(|chart| Ok((self.renderer.render(&chart)?, chart)));
            let outcome = match outcome {
                Ok((html, chart)) => ChartOutcome {
                    title: spec.title.clone(),
                    dataset: spec.dataset.clone(),
                    chart: Some(chart),
                    error: None,
                    html,
                },
                Err(e) => {
                    warn!(title = %spec.title, error = %e, "chart replaced by placeholder");
                    ChartOutcome {
                        title: spec.title.clone(),
                        dataset: spec.dataset.clone(),
                        chart: None,
                        html: placeholder(&e.placeholder_message(&spec.dataset)),
                        error: Some(e.to_string()),
                    }
                }
            };
            charts.push(outcome);
        }
        Dashboard { user_query: request.user_query.clone(), window, charts }
    }

    /// Resolve, filter, match and shape one requested chart.
    pub fn build_chart(
        &self,
        spec: &ChartSpec,
        window: Option<&TimeWindow>,
        filters: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<ShapedChart, ChartError> {
        let kind = ChartKind::parse(&spec.kind).ok_or_else(|| ChartError::UnsupportedChartKind(spec.kind.clone()))?;
        let requested: Vec<String> = spec
            .columns
            .iter()
            .filter(|c| !c.trim().eq_ignore_ascii_case("count"))
            .cloned()
            .collect();

        let resolver = DatasetResolver::new(self.store, &self.config.datasets).with_table_suffix(self.config.table_suffix.as_str());
        let mut table = resolver.resolve(&spec.dataset, window, now)?;
        if let Some(w) = window {
            table.retain_window(w);
        }
        table.apply_filters(filters);
        if table.is_empty() {
            return Err(ResolveError::NoData(spec.dataset.clone()).into());
        }

        let matched = matcher::match_columns(table.columns(), &requested, self.config.match_cutoff)
            .ok_or_else(|| ChartError::ColumnMismatch { requested: requested.clone() })?;
        let shaper = ChartShaper::new(&self.config.shaping, &self.categorizer);
        Ok(shaper.shape(table, kind, &matched, &spec.title)?)
    }
}
