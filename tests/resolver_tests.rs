use chartscope::config::Catalog;
use chartscope::resolver::{select_files, DatasetResolver, ResolveError, Selection};
use chartscope::store::{BlobStore, MemoryStore, ObjectMeta};
use chartscope::table::Value;
use chartscope::timewindow::TimeWindow;
use chrono::{DateTime, TimeZone, Utc};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn csv_for(date: &str) -> String {
    format!("Timestamp,Severity\n{date} 10:00:00,High\n{date} 11:00:00,Low\n")
}

/// Daily partitions for the given dates under `anomaly_logs/`.
fn partitioned(dates: &[&str]) -> MemoryStore {
    let mut store = MemoryStore::new();
    for d in dates {
        store.insert(format!("anomaly_logs/{d}.csv"), at(2025, 7, 20), csv_for(d));
    }
    store
}

#[test]
fn empty_previous_quarter_falls_back_to_recent_months() {
    // last five months, nothing between April and June
    let store = partitioned(&["2025-02-10", "2025-03-10", "2025-07-01", "2025-07-10", "2025-07-20"]);
    let files = store.list("anomaly_logs/").unwrap();
    let now = Utc.with_ymd_and_hms(2025, 7, 15, 12, 0, 0).unwrap();
    assert_eq!(
        select_files(&files, None, now),
        Selection::RecentMonths(vec!["anomaly_logs/2025-07-01.csv".into(), "anomaly_logs/2025-07-10.csv".into()])
    );

    let catalog = Catalog::default();
    let table = DatasetResolver::new(&store, &catalog).resolve("anomaly_logs", None, now).unwrap();
    assert_eq!(table.len(), 4);
}

#[test]
fn previous_quarter_is_preferred() {
    let store = partitioned(&["2025-03-31", "2025-04-01", "2025-06-30", "2025-07-01"]);
    let files = store.list("anomaly_logs/").unwrap();
    let now = at(2025, 7, 15);
    assert_eq!(
        select_files(&files, None, now),
        Selection::PreviousQuarter(vec!["anomaly_logs/2025-04-01.csv".into(), "anomaly_logs/2025-06-30.csv".into()])
    );
}

#[test]
fn window_selects_by_file_date_inclusive() {
    let store = partitioned(&["2024-02-29", "2024-03-01", "2024-03-31", "2024-04-01", "2024-04-02"]);
    let files = store.list("anomaly_logs/").unwrap();
    let w = TimeWindow::month(2024, 3).unwrap();
    let keys: Vec<String> = select_files(&files, Some(&w), at(2025, 1, 1)).keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["anomaly_logs/2024-03-01.csv", "anomaly_logs/2024-03-31.csv", "anomaly_logs/2024-04-01.csv"]);
}

#[test]
fn single_file_dataset_loads_latest_and_normalizes() {
    let mut store = MemoryStore::new();
    store.insert("task_database/tasks.csv", at(2025, 1, 2), "Task ID,Status\n1,Open\n2,Closed\n");
    store.insert("task_database/readme.txt", at(2025, 1, 3), "not a table");
    let catalog = Catalog::default();
    let t = DatasetResolver::new(&store, &catalog).resolve(" Task_Database.csv ", None, at(2025, 6, 1)).unwrap();
    assert_eq!(t.columns(), &["task id", "status", "count"]);
    assert_eq!(t.values("count").cloned().collect::<Vec<_>>(), vec![Value::Int(1), Value::Int(1)]);
}

#[test]
fn missing_data_is_not_found() {
    let store = MemoryStore::new();
    let catalog = Catalog::default();
    let resolver = DatasetResolver::new(&store, &catalog);
    let now = at(2025, 6, 1);

    let e = resolver.resolve("payroll", None, now).unwrap_err();
    assert!(matches!(e, ResolveError::UnknownDataset(_)));
    assert!(e.is_not_found());

    let e = resolver.resolve("stored_alerts", None, now).unwrap_err();
    assert!(matches!(e, ResolveError::NoFiles(_)));
}

#[test]
fn window_with_no_matching_files_is_no_data() {
    let store = partitioned(&["2024-01-10", "2024-01-11"]);
    let catalog = Catalog::default();
    let w = TimeWindow::month(2024, 3).unwrap();
    let e = DatasetResolver::new(&store, &catalog).resolve("anomaly_logs", Some(&w), at(2025, 1, 1)).unwrap_err();
    assert!(matches!(e, ResolveError::NoData(_)));
}

#[test]
fn selection_keys_follow_variant() {
    let files = vec![ObjectMeta { key: "x/a.csv".into(), last_modified: at(2024, 1, 1) }];
    assert_eq!(select_files(&files, None, at(2024, 6, 1)).keys(), vec!["x/a.csv"]);
}
