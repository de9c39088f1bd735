use anyhow::Context;
use chartscope::assembler::{publish, Assembler, Dashboard, DashboardRequest, EmbedRenderer};
use chartscope::config::EngineConfig;
use chartscope::store::FsStore;
use chartscope::summary::{format_summary_html, html_to_text, CommandSummarizer, Summarizer};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chartscope", version, about = "Shape tabular event logs into dashboard charts")]
struct Cli {
    /// Dashboard request JSON (`-` for stdin)
    #[arg(default_value = "-")]
    request: String,

    /// Directory holding the dataset prefixes
    #[arg(long = "store-root", default_value = ".")]
    store_root: PathBuf,

    /// Engine configuration (JSON). Built-in defaults when absent.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Output format: html | json
    #[arg(long = "format", default_value = "html")]
    format: String,

    /// Reference time for relative windows (RFC3339); defaults to the current time
    #[arg(long = "now")]
    now: Option<String>,

    /// Command that turns the dashboard text into a summary (JSON on stdin)
    #[arg(long = "summary-cmd")]
    summary_cmd: Option<String>,

    /// Also write the page to `dashboards/` and the request to `logs/` under this directory
    #[arg(long = "publish-root")]
    publish_root: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading request from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading request {source}"))
    }
}

fn render_with_summary(summary_cmd: Option<&str>, request: &DashboardRequest, dashboard: &Dashboard) -> String {
    let summary = match summary_cmd.and_then(CommandSummarizer::from_command_line) {
        Some(s) => {
            let page_text = html_to_text(&dashboard.render_page(None));
            match s.summarize(&request.user_query, &page_text) {
                Ok(text) => Some(format_summary_html(&text)),
                Err(e) => {
                    tracing::warn!(error = %e, "summary unavailable");
                    None
                }
            }
        }
        None => None,
    };
    dashboard.render_page(summary.as_deref())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = match &cli.config {
        Some(p) => EngineConfig::from_path(p).with_context(|| format!("loading config {}", p.display()))?,
        None => EngineConfig::default(),
    };
    let now: DateTime<Utc> = match &cli.now {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --now '{s}'"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let text = read_request(&cli.request)?;
    let request = DashboardRequest::from_json(&text).context("parsing dashboard request")?;
    if request.dashboard.is_empty() {
        anyhow::bail!("no dashboard data provided");
    }

    let store = FsStore::new(&cli.store_root);
    tracing::info!(root = %store.root().display(), charts = request.dashboard.len(), "assembling dashboard");
    let renderer = EmbedRenderer::new(config.palette.clone());
    let assembler = Assembler::new(&config, &store, &renderer);
    let dashboard = assembler.assemble(&request, now);
    tracing::info!(charts = dashboard.charts.len(), placeholders = dashboard.placeholders(), "dashboard assembled");

    if !matches!(cli.format.as_str(), "html" | "json") {
        anyhow::bail!("unknown --format '{}' (expected html or json)", cli.format);
    }
    let page = (cli.format == "html" || cli.publish_root.is_some())
        .then(|| render_with_summary(cli.summary_cmd.as_deref(), &request, &dashboard));

    if let (Some(root), Some(page)) = (&cli.publish_root, &page) {
        let mut out = FsStore::new(root);
        let published = publish(&mut out, page, &request, now)
            .with_context(|| format!("publishing dashboard under {}", root.display()))?;
        tracing::info!(path = %root.join(&published.page_key).display(), "page written");
    }

    match (cli.format.as_str(), page) {
        ("html", Some(page)) => println!("{page}"),
        _ => println!("{}", serde_json::to_string_pretty(&dashboard)?),
    }
    Ok(())
}
