use chartscope::timewindow::{parse_fuzzy_date, resolve, TimeWindow};
use chrono::{DateTime, TimeZone, Utc};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

#[test]
fn explicit_range_is_taken_as_is() {
    let w = resolve("Show alerts from March 1, 2024 to March 15, 2024", at(2024, 6, 1)).unwrap();
    assert_eq!((w.start, w.end), (at(2024, 3, 1), at(2024, 3, 15)));

    let w = resolve("tickets from 2024-01-05 to 2024-02-10", at(2024, 6, 1)).unwrap();
    assert_eq!((w.start, w.end), (at(2024, 1, 5), at(2024, 2, 10)));
}

#[test]
fn range_survives_trailing_and_embedded_newlines() {
    let w = resolve("alerts from 2024-01-05 to 2024-02-10\n", at(2024, 6, 1)).unwrap();
    assert_eq!((w.start, w.end), (at(2024, 1, 5), at(2024, 2, 10)));

    let w = resolve("alerts from March 1, 2024\nto March 15, 2024\nfor the network team", at(2024, 6, 1)).unwrap();
    assert_eq!((w.start, w.end), (at(2024, 3, 1), at(2024, 3, 15)));
}

#[test]
fn reversed_range_falls_through_to_month() {
    let w = resolve("alerts from March 15 2024 to March 1 2024", at(2024, 6, 1)).unwrap();
    assert_eq!(w, TimeWindow::month(2024, 3).unwrap());
}

#[test]
fn equal_range_without_month_is_no_window() {
    assert_eq!(resolve("alerts from 2024-03-01 to 2024-03-01", at(2024, 6, 1)), None);
}

#[test]
fn month_token_selects_calendar_month() {
    let w = resolve("incidents in March 2024", at(2025, 1, 1)).unwrap();
    assert_eq!((w.start, w.end), (at(2024, 3, 1), at(2024, 4, 1)));
}

#[test]
fn december_rolls_into_next_year() {
    let w = resolve("December 2023 anomalies", at(2025, 1, 1)).unwrap();
    assert_eq!((w.start, w.end), (at(2023, 12, 1), at(2024, 1, 1)));
}

#[test]
fn month_without_year_uses_current_year() {
    let w = resolve("alerts for sep", at(2025, 10, 2)).unwrap();
    assert_eq!((w.start, w.end), (at(2025, 9, 1), at(2025, 10, 1)));
}

#[test]
fn no_time_expression_means_no_window() {
    assert_eq!(resolve("show me the top attackers", at(2025, 1, 1)), None);
    assert_eq!(resolve("the decision log", at(2025, 1, 1)), None);
}

#[test]
fn fuzzy_date_defaults_to_current_year() {
    let now = at(2024, 7, 1);
    assert_eq!(parse_fuzzy_date("Feb 10", now), Some(at(2024, 2, 10)));
    assert_eq!(parse_fuzzy_date("yesterday", now), None);
}
