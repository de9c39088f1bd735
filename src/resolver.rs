use crate::config::Catalog;
use crate::store::{BlobStore, ObjectMeta, StoreError};
use crate::table::{Table, TableError};
use crate::timestamps::{date_token, start_of_day};
use crate::timewindow::TimeWindow;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("dataset '{0}' is not recognized")]
    UnknownDataset(String),
    #[error("dataset '{0}' has no files")]
    NoFiles(String),
    #[error("dataset '{0}' has no data for the selected period")]
    NoData(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot decode '{key}': {source}")]
    Decode { key: String, source: TableError },
}

impl ResolveError {
    /// Missing data, as opposed to a failing collaborator.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::UnknownDataset(_) | ResolveError::NoFiles(_) | ResolveError::NoData(_))
    }
}

/// Which files were picked for a dataset, and by which rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Files dated inside the window the query asked for.
    Window(Vec<String>),
    /// No window asked for: files dated in the previous completed quarter.
    PreviousQuarter(Vec<String>),
    /// Previous quarter was empty: files dated from the start of last month until now.
    RecentMonths(Vec<String>),
    /// Dataset is not time-partitioned: its most recently modified file.
    Latest(String),
    Nothing,
}

impl Selection {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Selection::Window(k) | Selection::PreviousQuarter(k) | Selection::RecentMonths(k) => {
                k.iter().map(|s| s.as_str()).collect()
            }
            Selection::Latest(k) => vec![k.as_str()],
            Selection::Nothing => Vec::new(),
        }
    }
}

/// `[start, end)` of the last fully completed calendar quarter before `now`.
pub fn previous_quarter(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let quarter = (now.month() - 1) / 3 + 1;
    let ymd = |y: i32, m: u32| start_of_day(NaiveDate::from_ymd_opt(y, m, 1).unwrap_or_default());
    if quarter == 1 {
        (ymd(now.year() - 1, 10), ymd(now.year(), 1))
    } else {
        let first_month = 3 * (quarter - 2) + 1;
        (ymd(now.year(), first_month), ymd(now.year(), first_month + 3))
    }
}

/// Midnight on the first day of the month before `now`.
pub fn first_day_of_previous_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let (y, m) = if now.month() == 1 { (now.year() - 1, 12) } else { (now.year(), now.month() - 1) };
    start_of_day(NaiveDate::from_ymd_opt(y, m, 1).unwrap_or_default())
}

/// Pick the files to load for one dataset.
///
/// An explicit window selects by embedded file date (inclusive). Without one, a
/// multi-file dataset falls back to the previous quarter, then to last month
/// through `now`; a single-file dataset uses its latest file.
pub fn select_files(files: &[ObjectMeta], window: Option<&TimeWindow>, now: DateTime<Utc>) -> Selection {
    let dated: Vec<(&str, DateTime<Utc>)> = files
        .iter()
        .filter_map(|f| date_token(&f.key).map(|d| (f.key.as_str(), start_of_day(d))))
        .collect();
    let pick = |keep: &dyn Fn(DateTime<Utc>) -> bool| -> Vec<String> {
        dated.iter().filter(|(_, d)| keep(*d)).map(|(k, _)| k.to_string()).collect()
    };

    if let Some(w) = window {
        return Selection::Window(pick(&|d| w.contains_inclusive(d)));
    }

    if files.len() > 1 {
        let (q_start, q_end) = previous_quarter(now);
        let in_quarter = pick(&|d| d >= q_start && d < q_end);
        if !in_quarter.is_empty() {
            info!(files = in_quarter.len(), start = %q_start.date_naive(), end = %q_end.date_naive(), "no date in query, merging previous quarter");
            return Selection::PreviousQuarter(in_quarter);
        }
        let since = first_day_of_previous_month(now);
        let recent = pick(&|d| d >= since && d <= now);
        info!(files = recent.len(), start = %since.date_naive(), end = %now.date_naive(), "previous quarter empty, merging current and previous month");
        return Selection::RecentMonths(recent);
    }

    match files.iter().max_by_key(|f| f.last_modified) {
        Some(latest) => Selection::Latest(latest.key.clone()),
        None => Selection::Nothing,
    }
}

/// Loads the files behind a logical dataset name and merges them into one
/// normalized table.
pub struct DatasetResolver<'a> {
    store: &'a dyn BlobStore,
    catalog: &'a Catalog,
    table_suffix: String,
}

impl<'a> DatasetResolver<'a> {
    pub fn new(store: &'a dyn BlobStore, catalog: &'a Catalog) -> Self {
        Self { store, catalog, table_suffix: ".csv".to_string() }
    }

    pub fn with_table_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.table_suffix = suffix.into();
        self
    }

    /// Table files under the dataset's prefix.
    pub fn list(&self, dataset: &str) -> Result<Vec<ObjectMeta>, ResolveError> {
        let prefix = self.catalog.prefix_for(dataset).ok_or_else(|| {
            let known: Vec<&str> = self.catalog.names().collect();
            warn!(dataset, ?known, "dataset not recognized");
            ResolveError::UnknownDataset(dataset.to_string())
        })?;
        let mut files = self.store.list(prefix)?;
        files.retain(|f| f.key.ends_with(&self.table_suffix));
        Ok(files)
    }

    pub fn resolve(&self, dataset: &str, window: Option<&TimeWindow>, now: DateTime<Utc>) -> Result<Table, ResolveError> {
        let files = self.list(dataset)?;
        if files.is_empty() {
            warn!(dataset, "no table files found");
            return Err(ResolveError::NoFiles(dataset.to_string()));
        }

        let selection = select_files(&files, window, now);
        if let (Selection::Window(keys), Some(w)) = (&selection, window) {
            info!(dataset, files = keys.len(), start = %w.start.date_naive(), end = %w.end.date_naive(), "merging files inside query window");
        }
        let keys = selection.keys();
        for k in &keys {
            info!(dataset, key = k, "included file");
        }

        let mut parts = Vec::with_capacity(keys.len());
        for key in keys {
            let bytes = self.store.get(key)?;
            let part = Table::from_csv(&bytes).map_err(|source| ResolveError::Decode { key: key.to_string(), source })?;
            parts.push(part);
        }
        let merged = Table::concat(parts);
        if merged.is_empty() {
            warn!(dataset, "table is empty after merging selected files");
            return Err(ResolveError::NoData(dataset.to_string()));
        }

        let table = merged.normalize();
        if table.is_empty() {
            warn!(dataset, "no rows with a usable timestamp");
            return Err(ResolveError::NoData(dataset.to_string()));
        }
        info!(dataset, rows = table.len(), columns = table.columns().len(), "dataset loaded");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn previous_quarter_wraps_year_from_q1() {
        assert_eq!(previous_quarter(at(2025, 2, 10)), (at(2024, 10, 1), at(2025, 1, 1)));
        assert_eq!(previous_quarter(at(2025, 5, 1)), (at(2025, 1, 1), at(2025, 4, 1)));
        assert_eq!(previous_quarter(at(2025, 12, 31)), (at(2025, 7, 1), at(2025, 10, 1)));
    }

    #[test]
    fn previous_month_wraps_year() {
        assert_eq!(first_day_of_previous_month(at(2025, 1, 20)), at(2024, 12, 1));
        assert_eq!(first_day_of_previous_month(at(2025, 7, 3)), at(2025, 6, 1));
    }

    #[test]
    fn single_file_uses_latest_modified() {
        let files = vec![ObjectMeta { key: "t/only.csv".into(), last_modified: at(2024, 1, 1) }];
        assert_eq!(select_files(&files, None, at(2025, 1, 1)), Selection::Latest("t/only.csv".into()));
        assert_eq!(select_files(&[], None, at(2025, 1, 1)), Selection::Nothing);
    }
}
