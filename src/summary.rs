use crate::assembler::escape_html;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("cannot start summarizer '{program}': {source}")]
    Spawn { program: String, source: std::io::Error },
    #[error("summarizer i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot encode summarizer input: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("summarizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Produces a narrative for a rendered dashboard.
pub trait Summarizer {
    fn summarize(&self, user_query: &str, dashboard_text: &str) -> Result<String, SummaryError>;
}

#[derive(Serialize)]
struct SummaryInput<'a> {
    user_query: &'a str,
    dashboard_text: &'a str,
}

/// Runs an external program, writing `{"user_query", "dashboard_text"}` as JSON on
/// its stdin. Stdout is the summary, either raw text or `{"summary": "..."}`.
#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
}

impl CommandSummarizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Split a whitespace-separated command line. `None` when it is blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl Summarizer for CommandSummarizer {
    fn summarize(&self, user_query: &str, dashboard_text: &str) -> Result<String, SummaryError> {
        let input = serde_json::to_vec(&SummaryInput { user_query, dashboard_text })?;
        info!(program = %self.program, bytes = input.len(), "invoking summarizer");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SummaryError::Spawn { program: self.program.clone(), source })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SummaryError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(bytes = stdout.len(), "summarizer replied");
        Ok(extract_summary(&stdout))
    }
}

fn extract_summary(stdout: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(stdout) {
        Ok(v) => match v.get("summary").and_then(|s| s.as_str()) {
            Some(s) => s.to_string(),
            None => stdout.trim().to_string(),
        },
        Err(_) => stdout.trim().to_string(),
    }
}

static RE_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script.*?</script>").unwrap());
static RE_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style.*?</style>").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Visible text of an HTML page: scripts, styles and tags removed, whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let s = RE_SCRIPT.replace_all(html, "");
    let s = RE_STYLE.replace_all(&s, "");
    let s = RE_TAG.replace_all(&s, " ");
    RE_SPACE.replace_all(&s, " ").trim().to_string()
}

static RE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\**\s*(executive summary|key findings|risk assessment|actionable recommendations)\s*\**:?").unwrap()
});
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+").unwrap());

const MOJIBAKE: [(&str, &str); 5] = [
    ("â€¢", "•"),
    ("â€™", "'"),
    ("â€“", "–"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
];

fn inline_markup(line: &str) -> String {
    let s = escape_html(line);
    let s = RE_HEADING.replace_all(&s, "<strong>$1</strong>");
    let s = RE_BOLD.replace_all(&s, "<strong>$1</strong>");
    RE_ITALIC.replace_all(&s, "<em>$1</em>").into_owned()
}

/// Light markdown-ish formatting of a summary for display: section headings and
/// numbered lines in bold, `**bold**`/`*italic*`, and `•`/`+`/`*`/`-` bullets as lists.
pub fn format_summary_html(text: &str) -> String {
    let mut text = text.to_string();
    for (bad, good) in MOJIBAKE {
        text = text.replace(bad, good);
    }

    let mut blocks: Vec<String> = Vec::new();
    let mut bullets: Vec<String> = Vec::new();
    let flush = |blocks: &mut Vec<String>, bullets: &mut Vec<String>| {
        if !bullets.is_empty() {
            blocks.push(format!("<ul>{}</ul>", bullets.concat()));
            bullets.clear();
        }
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if RE_NUMBERED.is_match(line) {
            flush(&mut blocks, &mut bullets);
            blocks.push(format!("<strong>{}</strong>", inline_markup(line)));
        } else if let Some(rest) = ["•", "+", "* ", "- "].iter().find_map(|p| line.strip_prefix(p)) {
            bullets.push(format!("<li>{}</li>", inline_markup(rest.trim())));
        } else {
            flush(&mut blocks, &mut bullets);
            blocks.push(inline_markup(line));
        }
    }
    flush(&mut blocks, &mut bullets);

    blocks.join("<br>").replace("<br><ul>", "<ul>").replace("</ul><br>", "</ul>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_json_or_raw() {
        assert_eq!(extract_summary("{\"summary\": \"all quiet\"}"), "all quiet");
        assert_eq!(extract_summary("  plain text\n"), "plain text");
    }

    #[test]
    fn blank_command_line_is_none() {
        assert!(CommandSummarizer::from_command_line("   ").is_none());
        let c = CommandSummarizer::from_command_line("python3 summarize.py --short").unwrap();
        assert_eq!(c.program, "python3");
        assert_eq!(c.args, vec!["summarize.py", "--short"]);
    }
}
