use crate::timestamps::{self, start_of_day};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A resolved date window. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end { Some(Self { start, end }) } else { None }
    }

    /// Whole calendar month containing `year`/`month`.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Self::new(start_of_day(first), start_of_day(next))
    }

    /// Closed-interval membership, used for file dates and row filtering.
    pub fn contains_inclusive(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

static RE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bfrom\s+(.+?)\s+to\s+(.+)").unwrap()
});

static RE_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b(?:[\s\-]+(\d{4})\b)?",
    )
    .unwrap()
});

static RE_ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}(?:[T ].*)?$").unwrap()
});

static RE_US_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").unwrap());

static RE_ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)$").unwrap());

/// Resolve the time window a free-text query refers to.
///
/// An explicit `from X to Y` range wins when both ends parse and are ordered;
/// otherwise a month token selects that whole calendar month. Anything else is
/// treated as "no window".
pub fn resolve(query: &str, now: DateTime<Utc>) -> Option<TimeWindow> {
    if let Some(caps) = RE_RANGE.captures(query) {
        let start = parse_fuzzy_date(caps[1].trim(), now);
        let end = parse_fuzzy_date(caps[2].trim(), now);
        match (start, end) {
            (Some(s), Some(e)) if s < e => {
                debug!(start = %s, end = %e, "explicit range in query");
                return Some(TimeWindow { start: s, end: e });
            }
            _ => debug!("range phrase present but unusable, trying month token"),
        }
    }

    if let Some(caps) = RE_MONTH.captures(query) {
        let month = month_number(&caps[1])?;
        let year = caps
            .get(2)
            .and_then(|y| y.as_str().parse::<i32>().ok())
            .unwrap_or_else(|| now.year());
        let window = TimeWindow::month(year, month);
        if let Some(w) = &window {
            debug!(start = %w.start, end = %w.end, "month token in query");
        }
        return window;
    }

    None
}

#[derive(Debug, PartialEq)]
enum DateToken {
    Full(DateTime<Utc>),
    Month(u32),
    Year(i32),
    Day(u32),
    Filler,
    Other,
}

fn classify_token(raw: &str) -> DateToken {
    let tok = raw.trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '?' | '!' | '(' | ')'));
    let lower = tok.to_lowercase();
    if lower.is_empty() {
        return DateToken::Other;
    }
    if RE_ISO_DATE.is_match(tok) || RE_US_DATE.is_match(tok) {
        return timestamps::parse_timestamp(tok).map(DateToken::Full).unwrap_or(DateToken::Other);
    }
    if let Some(m) = month_number(&lower) {
        return DateToken::Month(m);
    }
    if lower == "of" || lower == "the" {
        return DateToken::Filler;
    }
    let digits = RE_ORDINAL
        .captures(&lower)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| lower.clone());
    if digits.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = digits.parse::<u32>() {
            return match digits.len() {
                4 if (1900..=2100).contains(&n) => DateToken::Year(n as i32),
                1 | 2 if (1..=31).contains(&n) => DateToken::Day(n),
                _ => DateToken::Other,
            };
        }
    }
    DateToken::Other
}

/// Lenient date parsing for user-typed fragments such as `March 1, 2024`,
/// `1st of mar 2024`, `2024-03-01` or `03/01/2024`.
///
/// Leading words that are not part of a date are skipped; parsing stops at the
/// first unrelated word once a date has started. A month is required unless the
/// fragment holds a complete numeric date. Missing day is 1, missing year is the
/// year of `now`.
pub fn parse_fuzzy_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut started = false;
    let (mut month, mut day, mut year) = (None, None, None);

    for raw in text.split(|c: char| c.is_whitespace() || c == ',') {
        if raw.is_empty() {
            continue;
        }
        match classify_token(raw) {
            DateToken::Full(t) => {
                if started {
                    break;
                }
                return Some(t);
            }
            DateToken::Month(m) if month.is_none() => {
                month = Some(m);
                started = true;
            }
            DateToken::Day(d) if day.is_none() => {
                day = Some(d);
                started = true;
            }
            DateToken::Year(y) if year.is_none() => {
                year = Some(y);
                started = true;
            }
            DateToken::Filler if started => {}
            DateToken::Filler | DateToken::Other if !started => {}
            _ => break,
        }
    }

    let month = month?;
    let date = NaiveDate::from_ymd_opt(year.unwrap_or_else(|| now.year()), month, day.unwrap_or(1))?;
    Some(start_of_day(date))
}

fn month_number(token: &str) -> Option<u32> {
    let m = match token.to_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn fuzzy_dates_cover_common_spellings() {
        let n = now();
        assert_eq!(parse_fuzzy_date("March 1, 2024", n), Some(day(2024, 3, 1)));
        assert_eq!(parse_fuzzy_date("1st of mar 2024", n), Some(day(2024, 3, 1)));
        assert_eq!(parse_fuzzy_date("2024-03-01", n), Some(day(2024, 3, 1)));
        assert_eq!(parse_fuzzy_date("03/01/2024", n), Some(day(2024, 3, 1)));
        assert_eq!(parse_fuzzy_date("the alerts of Feb 2024", n), Some(day(2024, 2, 1)));
        assert_eq!(parse_fuzzy_date("Feb 2024 please", n), Some(day(2024, 2, 1)));
        assert_eq!(parse_fuzzy_date("april", n), Some(day(2025, 4, 1)));
    }

    #[test]
    fn fuzzy_dates_reject_incomplete_or_invalid() {
        let n = now();
        assert_eq!(parse_fuzzy_date("", n), None);
        assert_eq!(parse_fuzzy_date("last week", n), None);
        assert_eq!(parse_fuzzy_date("12", n), None);
        assert_eq!(parse_fuzzy_date("Feb 30 2024", n), None);
    }

    #[test]
    fn range_stops_at_trailing_words() {
        let w = resolve("show alerts from 2024-01-05 to 2024-02-10 for network team", now()).unwrap();
        assert_eq!(w.start, day(2024, 1, 5));
        assert_eq!(w.end, day(2024, 2, 10));
    }

    #[test]
    fn month_name_inside_other_words_is_ignored() {
        assert_eq!(resolve("decision support metrics", now()), None);
        assert_eq!(resolve("marketing alerts", now()), None);
    }
}
