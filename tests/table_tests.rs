use chartscope::table::{Table, Value};
use chartscope::timewindow::TimeWindow;
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;

fn sample() -> Table {
    Table::from_csv(
        b" Timestamp ,Severity,Status\n2024-03-02 10:00:00,High,open\nnot a time,Low,closed\n2024-04-05 09:30:00,low,Open\n",
    )
    .unwrap()
}

#[test]
fn normalize_lowercases_and_derives_columns() {
    let t = sample().normalize();
    assert_eq!(t.columns(), &["timestamp", "severity", "status", "month", "count"]);
    assert_eq!(t.len(), 2);
    let first = &t.rows()[0];
    assert_eq!(Table::get(first, "timestamp"), &Value::Time(Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap()));
    assert_eq!(Table::get(first, "month"), &Value::Text("2024-03".into()));
    assert_eq!(Table::get(first, "count"), &Value::Int(1));
}

#[test]
fn normalize_is_idempotent() {
    let once = sample().normalize();
    let twice = once.clone().normalize();
    assert_eq!(once, twice);
}

#[test]
fn existing_count_column_is_kept() {
    let t = Table::from_csv(b"kind,count\na,5\n").unwrap().normalize();
    assert_eq!(Table::get(&t.rows()[0], "count"), &Value::Int(5));
    assert!(!t.has_column("month"));
}

#[test]
fn window_filter_is_inclusive() {
    let mut t = sample().normalize();
    let w = TimeWindow::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap(),
    )
    .unwrap();
    t.retain_window(&w);
    assert_eq!(t.len(), 1);
}

#[test]
fn substring_filters_ignore_case_and_unknown_columns() {
    let mut t = sample().normalize();
    let mut filters = BTreeMap::new();
    filters.insert("Status".to_string(), "OPEN".to_string());
    filters.insert("nonexistent".to_string(), "zzz".to_string());
    t.apply_filters(&filters);
    assert_eq!(t.len(), 2);
    filters.insert("severity".to_string(), "high".to_string());
    t.apply_filters(&filters);
    assert_eq!(t.len(), 1);
}

#[test]
fn null_cells_count_as_nan_text() {
    let t = Table::from_csv(b"id,note\n1,abcdefg\n2,\n").unwrap();
    assert_eq!(t.mean_text_len("note"), 5.0);
}
