use crate::categorize::{Categorizer, OTHER};
use crate::chart::{AggregateTable, BarMode, Binning, ChartKind, Frequency, RenderDirective, ShapedChart};
use crate::config::ShapingConfig;
use crate::table::{Row, Table, Value};
use crate::timestamps::{self, start_of_day};
use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapingError {
    #[error("{kind} needs at least {needed} column(s), got {got}")]
    InsufficientColumns { kind: ChartKind, needed: usize, got: usize },
    #[error("{kind} needs a timestamp-like column")]
    NoTimeColumn { kind: ChartKind },
    #[error("{kind} has no rows left to plot")]
    EmptyResult { kind: ChartKind },
}

const TIME_NAME_HINTS: [&str; 4] = ["timestamp", "time", "created", "date"];

/// Turns a normalized table into the aggregate a given chart kind needs.
pub struct ChartShaper<'a> {
    config: &'a ShapingConfig,
    categorizer: &'a Categorizer,
}

impl<'a> ChartShaper<'a> {
    pub fn new(config: &'a ShapingConfig, categorizer: &'a Categorizer) -> Self {
        Self { config, categorizer }
    }

    pub fn shape(&self, table: Table, kind: ChartKind, columns: &[String], title: &str) -> Result<ShapedChart, ShapingError> {
        let needed = min_columns(kind);
        if columns.len() < needed {
            return Err(ShapingError::InsufficientColumns { kind, needed, got: columns.len() });
        }
        let (agg, directive) = match kind {
            ChartKind::Line => self.line(table, columns)?,
            ChartKind::Bar => self.bar(table, columns),
            ChartKind::StackedBar => self.stacked_bar(table, columns),
            ChartKind::Pie => self.pie(table, columns),
            ChartKind::Table => self.combinations(table, columns, Some(self.config.table_top_n)),
            ChartKind::SummaryTable => self.combinations(table, columns, None),
            ChartKind::Bubble => self.bubble(table, columns),
            ChartKind::HeatMap => self.heat_map(table, columns),
            ChartKind::Scatter => self.scatter(table, columns),
            ChartKind::BoxPlot => self.box_plot(table, columns),
            ChartKind::Histogram => self.histogram(table, columns),
            ChartKind::Timeline => self.timeline(table, columns),
            ChartKind::Sankey => self.sankey(table, columns),
        };
        if agg.is_empty() {
            return Err(ShapingError::EmptyResult { kind });
        }
        debug!(%kind, rows = agg.len(), "chart shaped");
        Ok(ShapedChart { title: title.to_string(), kind, table: agg, directive })
    }

    /// Replace free-text values with their category label.
    fn categorize_if_descriptive(&self, table: &mut Table, column: &str) {
        if self.categorizer.is_descriptive(table, column) {
            info!(column, "descriptive column, classifying into categories");
            let c = self.categorizer;
            table.map_column(column, |v| Value::Text(c.classify(&v.to_string()).to_string()));
        }
    }

    fn line(&self, mut table: Table, columns: &[String]) -> Result<(AggregateTable, RenderDirective), ShapingError> {
        let ts_col = columns
            .iter()
            .find(|c| {
                let lower = c.to_lowercase();
                TIME_NAME_HINTS.iter().any(|h| lower.contains(h))
            })
            .ok_or(ShapingError::NoTimeColumn { kind: ChartKind::Line })?
            .clone();
        let category = columns.iter().find(|c| **c != ts_col).cloned();
        if let Some(cat) = &category {
            self.categorize_if_descriptive(&mut table, cat);
        }

        parse_time_column(&mut table, &ts_col);
        let times: Vec<DateTime<Utc>> = table.values(&ts_col).filter_map(Value::as_time).collect();
        let (Some(min), Some(max)) = (times.iter().min().copied(), times.iter().max().copied()) else {
            return Err(ShapingError::EmptyResult { kind: ChartKind::Line });
        };
        let span_days = (max - min).num_days();
        let frequency = if span_days >= self.config.weekly_span_days {
            Frequency::Weekly
        } else if span_days >= self.config.daily_span_days {
            Frequency::Daily
        } else {
            Frequency::Hourly
        };
        debug!(span_days, ?frequency, "line bucket frequency");

        match category {
            Some(cat) => {
                keep_top(&mut table, &cat, self.config.line_top_categories);
                table.map_column(&ts_col, |v| v.as_time().map(|t| Value::Time(floor_time(t, frequency))).unwrap_or(Value::Null));
                let mut groups = group_rows(&table, &[&ts_col, &cat], |_| 1.0);
                sort_by_keys(&mut groups);
                let show_legend = distinct(&groups, 1) > 1;
                let agg = to_aggregate(vec![ts_col.clone(), cat.clone(), "count".into()], groups);
                Ok((agg, line_directive(ts_col, Some(cat), frequency, show_legend)))
            }
            None => {
                let mut counts: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
                for t in &times {
                    *counts.entry(floor_time(*t, frequency)).or_insert(0) += 1;
                }
                let mut agg = AggregateTable::new(vec![ts_col.clone(), "count".into()]);
                let (first, last) = (floor_time(min, frequency), floor_time(max, frequency));
                let mut t = first;
                while t <= last {
                    let n = counts.get(&t).copied().unwrap_or(0);
                    agg.rows.push(vec![Value::Time(t), Value::Int(n as i64)]);
                    t = t + step(frequency);
                }
                Ok((agg, line_directive(ts_col, None, frequency, false)))
            }
        }
    }

    fn bar(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let top_n = self.config.bar_top_n;
        if columns.len() < 2 {
            let x = columns[0].clone();
            self.categorize_if_descriptive(&mut table, &x);
            keep_top(&mut table, &x, top_n);
            let mut groups = group_rows(&table, &[&x], |_| 1.0);
            sort_by_keys(&mut groups);
            let agg = to_aggregate(vec![x.clone(), "count".into()], groups);
            return (agg, RenderDirective::Bar { x, y: "count".into(), series: None, mode: BarMode::Group, show_legend: false });
        }

        let (c1, c2) = (columns[0].clone(), columns[1].clone());
        let (time_col, series) = if is_time_like(&table, &c1) {
            (Some(c1.clone()), c2.clone())
        } else if is_time_like(&table, &c2) {
            (Some(c2.clone()), c1.clone())
        } else {
            (None, c2.clone())
        };
        table.map_column(&series, |v| match v {
            Value::Null => Value::Null,
            other => Value::Text(title_case(other.to_string().trim())),
        });

        let x = match &time_col {
            Some(tc) => {
                parse_time_column(&mut table, tc);
                table.derive_column("week", |r| match Table::get(r, tc) {
                    Value::Time(t) => Value::Time(floor_time(*t, Frequency::Weekly)),
                    _ => Value::Null,
                });
                "week".to_string()
            }
            None => c1.clone(),
        };

        self.categorize_if_descriptive(&mut table, &x);
        self.categorize_if_descriptive(&mut table, &series);
        keep_top(&mut table, &x, top_n);
        keep_top(&mut table, &series, self.config.legend_limit);

        let mut groups = group_rows(&table, &[&x, &series], |_| 1.0);
        sort_by_keys(&mut groups);
        let show_legend = distinct(&groups, 1) > 1;
        let agg = to_aggregate(vec![x.clone(), series.clone(), "count".into()], groups);
        (agg, RenderDirective::Bar { x, y: "count".into(), series: Some(series), mode: BarMode::Group, show_legend })
    }

    fn stacked_bar(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let (x, series) = (columns[0].clone(), columns[1].clone());
        self.categorize_if_descriptive(&mut table, &x);
        self.categorize_if_descriptive(&mut table, &series);
        keep_top(&mut table, &x, self.config.bar_top_n);
        keep_top(&mut table, &series, self.config.legend_limit);
        let mut groups = group_rows(&table, &[&x, &series], |_| 1.0);
        sort_by_keys(&mut groups);
        let show_legend = distinct(&groups, 1) > 1;
        let agg = to_aggregate(vec![x.clone(), series.clone(), "count".into()], groups);
        (agg, RenderDirective::Bar { x, y: "count".into(), series: Some(series), mode: BarMode::Stack, show_legend })
    }

    /// Category shares. The tail beyond the top N collapses into `Other`, unless
    /// that slice would exceed the configured share, in which case the tail is
    /// dropped instead.
    fn pie(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let name = columns[0].clone();
        let value = columns.get(1).cloned();
        self.categorize_if_descriptive(&mut table, &name);
        table.retain(|r| {
            let v = Table::get(r, &name);
            !v.is_null() && !v.to_string().eq_ignore_ascii_case("nan")
        });

        let numeric = value.as_deref().filter(|v| is_numeric_column(&table, v));
        let value_label = numeric.map(str::to_string).unwrap_or_else(|| "count".to_string());
        let mut groups = group_rows(&table, &[&name], |r| match numeric {
            Some(v) => Table::get(r, v).as_f64().unwrap_or(0.0),
            None => 1.0,
        });
        sort_by_weight_desc(&mut groups);

        let top_n = self.config.pie_top_n;
        if groups.len() > top_n {
            let total: f64 = groups.iter().map(|g| g.weight).sum();
            let tail: f64 = groups[top_n..].iter().map(|g| g.weight).sum();
            let existing_other: f64 = groups[..top_n].iter().filter(|g| g.keys[0].to_string() == OTHER).map(|g| g.weight).sum();
            let other = tail + existing_other;
            let share = if total > 0.0 { other / total } else { 0.0 };
            if share > self.config.pie_other_max_share {
                info!(share, "'Other' slice too large, keeping top categories only");
                groups.truncate(top_n);
            } else {
                groups.truncate(top_n);
                groups.retain(|g| g.keys[0].to_string() != OTHER);
                groups.push(Group { keys: vec![Value::Text(OTHER.to_string())], weight: other });
            }
        }

        let agg = to_aggregate(vec![name.clone(), value_label.clone()], groups);
        (agg, RenderDirective::Pie { names: name, values: value_label })
    }

    /// Distinct value combinations with their counts, most frequent first.
    fn combinations(&self, table: Table, columns: &[String], limit: Option<usize>) -> (AggregateTable, RenderDirective) {
        let cols: Vec<&str> = columns.iter().map(|s| s.as_str()).collect();
        let mut groups = group_rows(&table, &cols, |_| 1.0);
        sort_by_weight_desc(&mut groups);
        if let Some(n) = limit {
            groups.truncate(n);
        }
        let mut names: Vec<String> = columns.to_vec();
        names.push("count".into());
        let agg = to_aggregate(names.clone(), groups);
        (agg, RenderDirective::Table { columns: names })
    }

    fn bubble(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let (x, y, size) = (columns[0].clone(), columns[1].clone(), columns[2].clone());
        self.categorize_if_descriptive(&mut table, &x);
        self.categorize_if_descriptive(&mut table, &y);
        keep_top_pair(&mut table, &x, &y, self.config.matrix_top_n);
        let mut groups = group_rows(&table, &[&x, &y], |r| Table::get(r, &size).as_f64().unwrap_or(1.0));
        sort_by_keys(&mut groups);
        let show_legend = distinct(&groups, 1) > 1;
        let agg = to_aggregate(vec![x.clone(), y.clone(), size.clone()], groups);
        (agg, RenderDirective::Bubble { x, color: y.clone(), y, size, show_legend })
    }

    fn heat_map(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let (x, y) = (columns[0].clone(), columns[1].clone());
        for c in [&x, &y] {
            table.map_column(c, |v| match v {
                Value::Null => Value::Null,
                other => Value::Text(title_case(other.to_string().trim())),
            });
        }
        self.categorize_if_descriptive(&mut table, &x);
        self.categorize_if_descriptive(&mut table, &y);
        let agg = self.cross_counts(table, &x, &y);
        (agg, RenderDirective::HeatMap { x, y, z: "count".into() })
    }

    /// Counts over the cross product of two categorical dimensions, never raw points.
    fn scatter(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let (x, y) = (columns[0].clone(), columns[1].clone());
        self.categorize_if_descriptive(&mut table, &x);
        self.categorize_if_descriptive(&mut table, &y);
        let agg = self.cross_counts(table, &x, &y);
        (agg, RenderDirective::Scatter { x, y, size: "count".into() })
    }

    fn cross_counts(&self, mut table: Table, x: &str, y: &str) -> AggregateTable {
        keep_top_pair(&mut table, x, y, self.config.matrix_top_n);
        let mut groups = group_rows(&table, &[x, y], |_| 1.0);
        sort_by_keys(&mut groups);
        to_aggregate(vec![x.to_string(), y.to_string(), "count".into()], groups)
    }

    fn box_plot(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let (x, y) = (columns[0].clone(), columns[1].clone());
        self.categorize_if_descriptive(&mut table, &x);
        table.retain(|r| Table::get(r, &y).as_f64().is_some());
        keep_top(&mut table, &x, self.config.box_top_n);

        let mut by_key: BTreeMap<String, (Value, Vec<f64>)> = BTreeMap::new();
        for row in table.rows() {
            let k = Table::get(row, &x);
            if let Some(v) = Table::get(row, &y).as_f64() {
                by_key.entry(k.to_string()).or_insert_with(|| (k.clone(), Vec::new())).1.push(v);
            }
        }
        let names = ["min", "q1", "median", "q3", "max", "count"];
        let mut agg = AggregateTable::new(std::iter::once(x.clone()).chain(names.iter().map(|s| s.to_string())).collect());
        for (_, (key, mut vals)) in by_key {
            vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            agg.rows.push(vec![
                key,
                Value::Float(vals[0]),
                Value::Float(quantile(&vals, 0.25)),
                Value::Float(quantile(&vals, 0.5)),
                Value::Float(quantile(&vals, 0.75)),
                Value::Float(vals[vals.len() - 1]),
                Value::Int(vals.len() as i64),
            ]);
        }
        let d = RenderDirective::BoxPlot {
            x,
            min: "min".into(),
            q1: "q1".into(),
            median: "median".into(),
            q3: "q3".into(),
            max: "max".into(),
        };
        (agg, d)
    }

    /// Frequency distribution of one column. A dominant `Other` bucket is dropped
    /// so the chart does not collapse into a single bar.
    fn histogram(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let col = columns[0].clone();
        self.categorize_if_descriptive(&mut table, &col);
        table.retain(|r| !Table::get(r, &col).is_null());

        let total = table.len();
        let others = table.values(&col).filter(|v| v.to_string() == OTHER).count();
        if total > 0 && others as f64 / total as f64 > self.config.histogram_other_max_share {
            info!(others, total, "'Other' dominates, removing it from histogram");
            table.retain(|r| Table::get(r, &col).to_string() != OTHER);
        }

        let bins = self.config.histogram_bins.max(1);
        let all_time = !table.is_empty() && table.values(&col).all(|v| matches!(v, Value::Time(_)));
        let all_numeric = !table.is_empty() && table.values(&col).all(|v| matches!(v, Value::Int(_) | Value::Float(_)));

        if all_time || all_numeric {
            let xs: Vec<f64> = table
                .values(&col)
                .filter_map(|v| match v {
                    Value::Time(t) => Some(t.timestamp_millis() as f64),
                    other => other.as_f64(),
                })
                .collect();
            let binning = if all_time { Binning::Time } else { Binning::Numeric };
            let to_value = |x: f64| {
                if all_time {
                    Utc.timestamp_millis_opt(x as i64).single().map(Value::Time).unwrap_or(Value::Null)
                } else {
                    Value::Float(x)
                }
            };
            let mut agg = AggregateTable::new(vec!["bin_start".into(), "bin_end".into(), "count".into()]);
            for (lo, hi, n) in equal_width_bins(&xs, bins) {
                agg.rows.push(vec![to_value(lo), to_value(hi), Value::Int(n as i64)]);
            }
            return (agg, RenderDirective::Histogram { x: "bin_start".into(), y: "count".into(), binning, bins });
        }

        let mut groups = group_rows(&table, &[&col], |_| 1.0);
        sort_by_weight_desc(&mut groups);
        let n = groups.len();
        let agg = to_aggregate(vec![col.clone(), "count".into()], groups);
        (agg, RenderDirective::Histogram { x: col, y: "count".into(), binning: Binning::Categorical, bins: n })
    }

    /// Start/end spans. Rows with unparseable dates, or starts not after the
    /// configured minimum plausible date, are dropped.
    fn timeline(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        let (start, end) = (columns[0].clone(), columns[1].clone());
        let lane = columns.get(2).cloned();
        parse_time_column(&mut table, &start);
        parse_time_column(&mut table, &end);
        let floor = timestamps::parse_timestamp(&self.config.timeline_min_start)
            .unwrap_or_else(|| start_of_day(chrono::NaiveDate::from_ymd_opt(2005, 1, 1).unwrap_or_default()));
        table.retain(|r| match (Table::get(r, &start), Table::get(r, &end)) {
            (Value::Time(s), Value::Time(_)) => *s > floor,
            _ => false,
        });
        if let Some(l) = &lane {
            self.categorize_if_descriptive(&mut table, l);
        }

        let mut cols = vec![start.clone(), end.clone()];
        cols.extend(lane.clone());
        let mut agg = AggregateTable::new(cols.clone());
        let mut rows: Vec<Vec<Value>> = table
            .rows()
            .iter()
            .map(|r| cols.iter().map(|c| Table::get(r, c).clone()).collect())
            .collect();
        rows.sort_by(|a, b| cmp_value(&a[0], &b[0]));
        agg.rows = rows;
        (agg, RenderDirective::Timeline { start, end, lane })
    }

    /// Weighted source -> target flows, heaviest first.
    fn sankey(&self, mut table: Table, columns: &[String]) -> (AggregateTable, RenderDirective) {
        for c in columns {
            self.categorize_if_descriptive(&mut table, c);
        }
        let (source, target) = (columns[0].clone(), columns[1].clone());
        let weight = columns.get(2).cloned();
        for c in [&source, &target] {
            if is_time_like(&table, c) {
                table.map_column(c, |v| v.as_time().map(|t| Value::Text(t.format("%Y-%m").to_string())).unwrap_or(Value::Null));
            }
        }

        let mut groups = group_rows(&table, &[&source, &target], |r| match &weight {
            Some(w) => Table::get(r, w).as_f64().unwrap_or(0.0),
            None => 1.0,
        });
        sort_by_weight_desc(&mut groups);
        groups.truncate(self.config.sankey_top_flows);
        let max = self.config.sankey_label_max;
        for g in groups.iter_mut() {
            for k in g.keys.iter_mut() {
                *k = Value::Text(truncate_label(&k.to_string(), max));
            }
        }
        let agg = to_aggregate(vec![source.clone(), target.clone(), "value".into()], groups);
        (agg, RenderDirective::Sankey { source, target, value: "value".into() })
    }
}

fn min_columns(kind: ChartKind) -> usize {
    match kind {
        ChartKind::Line | ChartKind::Bar | ChartKind::Pie | ChartKind::Table | ChartKind::SummaryTable | ChartKind::Histogram => 1,
        ChartKind::StackedBar | ChartKind::HeatMap | ChartKind::Scatter | ChartKind::BoxPlot | ChartKind::Timeline | ChartKind::Sankey => 2,
        ChartKind::Bubble => 3,
    }
}

fn line_directive(x: String, series: Option<String>, frequency: Frequency, show_legend: bool) -> RenderDirective {
    RenderDirective::Line { x, y: "count".into(), series, frequency, show_legend }
}

#[derive(Debug, Clone)]
struct Group {
    keys: Vec<Value>,
    weight: f64,
}

/// Group rows by the given columns, summing `weight` per group. Rows with a null
/// key are skipped. Groups keep first-seen order.
fn group_rows(table: &Table, cols: &[&str], weight: impl Fn(&Row) -> f64) -> Vec<Group> {
    let mut index: AHashMap<Vec<String>, usize> = AHashMap::new();
    let mut out: Vec<Group> = Vec::new();
    for row in table.rows() {
        let vals: Vec<&Value> = cols.iter().map(|c| Table::get(row, c)).collect();
        if vals.iter().any(|v| v.is_null()) {
            continue;
        }
        let key: Vec<String> = vals.iter().map(|v| v.to_string()).collect();
        let w = weight(row);
        match index.get(&key) {
            Some(&i) => out[i].weight += w,
            None => {
                index.insert(key, out.len());
                out.push(Group { keys: vals.into_iter().cloned().collect(), weight: w });
            }
        }
    }
    out
}

fn to_aggregate(columns: Vec<String>, groups: Vec<Group>) -> AggregateTable {
    let mut agg = AggregateTable::new(columns);
    for g in groups {
        let mut row = g.keys;
        row.push(number(g.weight));
        agg.rows.push(row);
    }
    agg
}

fn number(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 9.0e15 {
        Value::Int(x as i64)
    } else {
        Value::Float(x)
    }
}

fn distinct(groups: &[Group], idx: usize) -> usize {
    groups.iter().filter_map(|g| g.keys.get(idx)).map(|v| v.to_string()).collect::<AHashSet<_>>().len()
}

fn cmp_value(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

fn sort_by_keys(groups: &mut [Group]) {
    groups.sort_by(|a, b| {
        a.keys
            .iter()
            .zip(b.keys.iter())
            .map(|(x, y)| cmp_value(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

fn sort_by_weight_desc(groups: &mut [Group]) {
    groups.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.keys.iter().map(|v| v.to_string()).cmp(b.keys.iter().map(|v| v.to_string())))
    });
}

/// Value frequencies of a column, most frequent first, ties by value.
fn value_counts(table: &Table, col: &str) -> Vec<(String, usize)> {
    let mut counts: AHashMap<String, usize> = AHashMap::new();
    for v in table.values(col).filter(|v| !v.is_null()) {
        *counts.entry(v.to_string()).or_insert(0) += 1;
    }
    let mut out: Vec<(String, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Keep only rows whose `col` value is among its `n` most frequent values.
fn keep_top(table: &mut Table, col: &str, n: usize) {
    let top: AHashSet<String> = value_counts(table, col).into_iter().take(n).map(|(k, _)| k).collect();
    table.retain(|r| {
        let v = Table::get(r, col);
        !v.is_null() && top.contains(&v.to_string())
    });
}

/// Cap two columns at once. Both top sets come from the same rows, so a pair
/// survives only when each side is frequent on its own.
fn keep_top_pair(table: &mut Table, x: &str, y: &str, n: usize) {
    let top = |col: &str| -> AHashSet<String> { value_counts(table, col).into_iter().take(n).map(|(k, _)| k).collect() };
    let (top_x, top_y) = (top(x), top(y));
    table.retain(|r| {
        let (a, b) = (Table::get(r, x), Table::get(r, y));
        !a.is_null() && !b.is_null() && top_x.contains(&a.to_string()) && top_y.contains(&b.to_string())
    });
}

fn parse_time_column(table: &mut Table, col: &str) {
    table.map_column(col, |v| v.as_time().map(Value::Time).unwrap_or(Value::Null));
    table.retain(|r| matches!(Table::get(r, col), Value::Time(_)));
}

/// A column is date-like when its name says so or every non-null cell is already a datetime.
fn is_time_like(table: &Table, col: &str) -> bool {
    if col.to_lowercase().contains("timestamp") {
        return true;
    }
    let mut seen = false;
    for v in table.values(col).filter(|v| !v.is_null()) {
        if !matches!(v, Value::Time(_)) {
            return false;
        }
        seen = true;
    }
    seen
}

fn is_numeric_column(table: &Table, col: &str) -> bool {
    let mut seen = false;
    for v in table.values(col).filter(|v| !v.is_null()) {
        if !matches!(v, Value::Int(_) | Value::Float(_)) {
            return false;
        }
        seen = true;
    }
    seen
}

fn floor_time(t: DateTime<Utc>, freq: Frequency) -> DateTime<Utc> {
    let day = start_of_day(t.date_naive());
    match freq {
        Frequency::Hourly => day + Duration::hours(t.hour() as i64),
        Frequency::Daily => day,
        Frequency::Weekly => day - Duration::days(t.weekday().num_days_from_monday() as i64),
    }
}

fn step(freq: Frequency) -> Duration {
    match freq {
        Frequency::Hourly => Duration::hours(1),
        Frequency::Daily => Duration::days(1),
        Frequency::Weekly => Duration::days(7),
    }
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// `(low, high, count)` for `bins` equal-width bins spanning the data.
fn equal_width_bins(xs: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let (Some(min), Some(max)) = (
        xs.iter().copied().reduce(f64::min),
        xs.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };
    if max <= min {
        return vec![(min, max, xs.len())];
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for x in xs {
        let i = (((x - min) / width).floor() as usize).min(bins - 1);
        counts[i] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, n)| (min + width * i as f64, min + width * (i + 1) as f64, n))
        .collect()
}

/// pandas-style `str.title()`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let head: String = label.chars().take(max).collect();
        format!("{head}...")
    }
}
