use tracing::{debug, info};

/// Default similarity needed for a fuzzy column match.
pub const CLOSE_MATCH_CUTOFF: f64 = 0.6;

/// Closest actual column name for one requested name, if any clears `cutoff`.
///
/// Similarity is the Ratcliff/Obershelp ratio `2*M / (|a| + |b|)` over lower-cased
/// names; when scores tie the earlier schema column wins. An exact case-insensitive
/// hit is used as the fallback when no fuzzy candidate clears the cutoff.
pub fn match_column<'a>(actual: &'a [String], requested: &str, cutoff: f64) -> Option<&'a str> {
    let want = requested.trim().to_lowercase();
    let lowered: Vec<String> = actual.iter().map(|a| a.to_lowercase()).collect();
    // get_close_matches rejects cutoffs outside [0, 1]
    if (0.0..=1.0).contains(&cutoff) {
        let candidates: Vec<&str> = lowered.iter().map(String::as_str).collect();
        if let Some(hit) = difflib::get_close_matches(&want, candidates, 1, cutoff as f32).first() {
            if let Some(i) = lowered.iter().position(|l| l == hit) {
                debug!(requested, matched = %actual[i], "fuzzy column match");
                return Some(actual[i].as_str());
            }
        }
    }
    lowered.iter().position(|l| *l == want).map(|i| actual[i].as_str())
}

/// Map every requested column onto the dataset's schema, keeping request order.
///
/// Returns `None` unless every requested name resolves; a partial mapping is never
/// returned.
pub fn match_columns(actual: &[String], requested: &[String], cutoff: f64) -> Option<Vec<String>> {
    let matched: Vec<Option<&str>> = requested.iter().map(|r| match_column(actual, r, cutoff)).collect();
    info!(?requested, ?actual, ?matched, "column matching");
    if requested.is_empty() || matched.iter().any(Option::is_none) {
        return None;
    }
    Some(matched.into_iter().flatten().map(str::to_string).collect())
}
