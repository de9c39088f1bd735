use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub const DEFAULT_PALETTE: [&str; 15] = [
    "#FF5733", "#F39C12", "#2ECC71", "#3498DB", "#9B59B6",
    "#1ABC9C", "#E67E22", "#BDC3C7", "#F1C40F", "#C0392B",
    "#8E44AD", "#2980B9", "#27AE60", "#E74C3C", "#D35400",
];

/// Logical dataset name -> storage prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog(BTreeMap<String, String>);

impl Default for Catalog {
    fn default() -> Self {
        let mut m = BTreeMap::new();
        for name in ["anomaly_logs", "network_anomaly_logs", "stored_alerts", "task_database"] {
            m.insert(name.to_string(), format!("{name}/"));
        }
        Self(m)
    }
}

impl Catalog {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Look up a dataset by the name a caller typed: trimmed, case-insensitive,
    /// with an optional `.csv` suffix.
    pub fn prefix_for(&self, dataset: &str) -> Option<&str> {
        let key = dataset.trim().to_lowercase();
        let key = key.strip_suffix(".csv").unwrap_or(&key);
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }
}

/// Caps and thresholds used while shaping chart data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    pub line_top_categories: usize,
    pub bar_top_n: usize,
    pub legend_limit: usize,
    pub pie_top_n: usize,
    /// Share of the total above which a pie's `Other` slice is considered misleading.
    pub pie_other_max_share: f64,
    /// Share of rows above which a histogram drops its `Other` bucket.
    pub histogram_other_max_share: f64,
    pub histogram_bins: usize,
    pub table_top_n: usize,
    pub matrix_top_n: usize,
    pub box_top_n: usize,
    pub sankey_top_flows: usize,
    pub sankey_label_max: usize,
    /// Timeline rows starting on or before this date are treated as placeholders.
    pub timeline_min_start: String,
    pub weekly_span_days: i64,
    pub daily_span_days: i64,
    /// Mean string length above which a column counts as free text.
    pub descriptive_min_len: f64,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            line_top_categories: 6,
            bar_top_n: 10,
            legend_limit: 5,
            pie_top_n: 5,
            pie_other_max_share: 0.3,
            histogram_other_max_share: 0.3,
            histogram_bins: 30,
            table_top_n: 10,
            matrix_top_n: 15,
            box_top_n: 10,
            sankey_top_flows: 25,
            sankey_label_max: 30,
            timeline_min_start: "2005-01-01".to_string(),
            weekly_span_days: 60,
            daily_span_days: 7,
            descriptive_min_len: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub datasets: Catalog,
    pub palette: Vec<String>,
    /// Only keys with this suffix are treated as tables.
    pub table_suffix: String,
    /// Minimum similarity for a fuzzy column-name match.
    pub match_cutoff: f64,
    pub shaping: ShapingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            datasets: Catalog::default(),
            palette: DEFAULT_PALETTE.iter().map(|s| s.to_string()).collect(),
            table_suffix: ".csv".to_string(),
            match_cutoff: crate::matcher::CLOSE_MATCH_CUTOFF,
            shaping: ShapingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_is_forgiving() {
        let c = Catalog::default();
        assert_eq!(c.prefix_for(" Anomaly_Logs.csv "), Some("anomaly_logs/"));
        assert_eq!(c.prefix_for("stored_alerts"), Some("stored_alerts/"));
        assert_eq!(c.prefix_for("unknown"), None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json(r#"{"datasets":{"tickets":"tickets/"},"shaping":{"pie_top_n":7}}"#).unwrap();
        assert_eq!(cfg.datasets.prefix_for("tickets"), Some("tickets/"));
        assert_eq!(cfg.datasets.prefix_for("anomaly_logs"), None);
        assert_eq!(cfg.shaping.pie_top_n, 7);
        assert_eq!(cfg.shaping.bar_top_n, 10);
        assert_eq!(cfg.table_suffix, ".csv");
        assert_eq!(cfg.palette.len(), 15);
    }
}
