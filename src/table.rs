use crate::timestamps;
use crate::timewindow::TimeWindow;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("csv decode error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Time(DateTime<Utc>),
}

const NULL_TEXT_LEN: usize = "nan".len();

const NULL_MARKERS: [&str; 8] = ["", "nan", "NaN", "NA", "N/A", "null", "NULL", "None"];

impl Value {
    /// Type a raw CSV cell: empty and NaN-like markers become `Null`, numbers are
    /// parsed, everything else stays text.
    pub fn from_cell(s: &str) -> Value {
        let trimmed = s.trim();
        if NULL_MARKERS.contains(&trimmed) {
            return Value::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        Value::Text(trimmed.to_string())
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Interpret the cell as a timestamp, parsing text when needed.
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Text(s) => timestamps::parse_timestamp(s),
            Value::Int(i) => timestamps::parse_timestamp(&i.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Time(t) => {
                if t.num_seconds_from_midnight() == 0 && t.nanosecond() == 0 {
                    write!(f, "{}", t.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

pub type Row = BTreeMap<String, Value>;

/// Rows keyed by column name, with the column order remembered separately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Decode a headered CSV payload. Ragged rows are tolerated; missing cells are null.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut table = Table::new(Vec::new());
        for h in &headers {
            table.add_column(h);
        }
        for record in rdr.records() {
            let record = record?;
            let mut row = Row::new();
            for (i, h) in headers.iter().enumerate() {
                let v = record.get(i).map(Value::from_cell).unwrap_or(Value::Null);
                row.insert(h.clone(), v);
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Stack tables vertically. Columns are the ordered union; absent cells are null.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut out = Table::default();
        for t in tables {
            for c in &t.columns {
                out.add_column(c);
            }
            out.rows.extend(t.rows);
        }
        let columns = out.columns.clone();
        for row in out.rows.iter_mut() {
            for c in &columns {
                row.entry(c.clone()).or_insert(Value::Null);
            }
        }
        out
    }

    pub fn columns(&self) -> &[String] { &self.columns }
    pub fn rows(&self) -> &[Row] { &self.rows }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Register a column name if it is not already known.
    pub fn add_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn get<'a>(row: &'a Row, col: &str) -> &'a Value {
        static NULL: Value = Value::Null;
        row.get(col).unwrap_or(&NULL)
    }

    pub fn retain(&mut self, f: impl FnMut(&Row) -> bool) {
        self.rows.retain(f);
    }

    /// Rewrite every cell of `col` in place.
    pub fn map_column(&mut self, col: &str, mut f: impl FnMut(&Value) -> Value) {
        for row in self.rows.iter_mut() {
            let next = f(row.get(col).unwrap_or(&Value::Null));
            row.insert(col.to_string(), next);
        }
    }

    /// Set a derived column from each row.
    pub fn derive_column(&mut self, col: &str, mut f: impl FnMut(&Row) -> Value) {
        self.add_column(col);
        for row in self.rows.iter_mut() {
            let v = f(row);
            row.insert(col.to_string(), v);
        }
    }

    pub fn values<'a>(&'a self, col: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |r| Table::get(r, col))
    }

    /// Mean rendered string length of a column. Nulls render as `nan`.
    pub fn mean_text_len(&self, col: &str) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let total: usize = self
            .values(col)
            .map(|v| if v.is_null() { NULL_TEXT_LEN } else { v.to_string().chars().count() })
            .sum();
        total as f64 / self.rows.len() as f64
    }

    /// Canonical form used by every chart: lower-cased trimmed column names, a parsed
    /// `timestamp` (unparseable rows dropped) with its `month` bucket, and a `count`
    /// column defaulting to 1. Applying it twice changes nothing.
    pub fn normalize(self) -> Table {
        let mut out = Table::default();
        for c in &self.columns {
            out.add_column(&c.trim().to_lowercase());
        }
        out.rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(|(k, v)| (k.trim().to_lowercase(), v)).collect())
            .collect();

        if out.has_column("timestamp") {
            let before = out.rows.len();
            out.rows.retain_mut(|row| match row.get("timestamp").and_then(Value::as_time) {
                Some(t) => {
                    row.insert("timestamp".to_string(), Value::Time(t));
                    row.insert("month".to_string(), Value::Text(t.format("%Y-%m").to_string()));
                    true
                }
                None => false,
            });
            out.add_column("month");
            let dropped = before - out.rows.len();
            if dropped > 0 {
                tracing::debug!(dropped, "rows with unparseable timestamp removed");
            }
        }

        if !out.has_column("count") {
            out.derive_column("count", |_| Value::Int(1));
        }
        out
    }

    /// Keep rows whose `timestamp` lies inside the window (inclusive). Tables
    /// without a `timestamp` column are left untouched.
    pub fn retain_window(&mut self, window: &TimeWindow) {
        if !self.has_column("timestamp") {
            return;
        }
        self.rows.retain(|r| r.get("timestamp").and_then(Value::as_time).is_some_and(|t| window.contains_inclusive(t)));
    }

    /// Case-insensitive substring filters keyed by column name. Unknown columns are ignored.
    pub fn apply_filters(&mut self, filters: &BTreeMap<String, String>) {
        for (key, needle) in filters {
            let key = key.trim().to_lowercase();
            if !self.has_column(&key) {
                continue;
            }
            let needle = needle.to_lowercase();
            self.rows.retain(|r| Table::get(r, &key).to_string().to_lowercase().contains(&needle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cells_are_typed() {
        assert_eq!(Value::from_cell(" 42 "), Value::Int(42));
        assert_eq!(Value::from_cell("4.5"), Value::Float(4.5));
        assert_eq!(Value::from_cell("nan"), Value::Null);
        assert_eq!(Value::from_cell(""), Value::Null);
        assert_eq!(Value::from_cell("High"), Value::Text("High".into()));
    }

    #[test]
    fn concat_unions_columns() {
        let a = Table::from_csv(b"a,b\n1,2\n").unwrap();
        let b = Table::from_csv(b"b,c\n3,4\n").unwrap();
        let t = Table::concat([a, b]);
        assert_eq!(t.columns(), &["a", "b", "c"]);
        assert_eq!(t.len(), 2);
        assert_eq!(Table::get(&t.rows()[1], "a"), &Value::Null);
        assert_eq!(Table::get(&t.rows()[1], "c"), &Value::Int(4));
    }

    #[test]
    fn time_display_drops_midnight() {
        let d = Value::Time(Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap());
        assert_eq!(d.to_string(), "2024-02-03");
        let t = Value::Time(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap());
        assert_eq!(t.to_string(), "2024-02-03 04:05:06");
    }
}
