//! CLI command definitions, routing, and tracing setup.

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use linkforge_core::runner::{ProgressReporter, RunConfig};
use linkforge_core::CancellationToken;
use linkforge_shared::{
    AppConfig, LinkOutcome, OutcomeKind, RunSummary, init_config, load_config, validate_token,
};
use linkforge_store::{DocumentStore, ShopStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LinkForge — internal link automation for product descriptions.
#[derive(Parser)]
#[command(
    name = "linkforge",
    version,
    about = "Insert scoped, idempotent keyword links into remote product descriptions.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process every document of a collection.
    Run {
        /// Collection handle to process.
        collection: String,

        /// Keywords to link, comma-separated, applied in order.
        #[arg(short, long)]
        keywords: String,

        /// URL the inserted links point at.
        #[arg(long)]
        link_url: String,

        /// Heading text delimiting the target region (defaults to config).
        #[arg(long)]
        marker: Option<String>,

        /// Minimum ms between documents (defaults to config).
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Process without persisting anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Preview the outcome for a single document without persisting.
    Check {
        /// Document handle to check.
        handle: String,

        /// Keywords to link, comma-separated, applied in order.
        #[arg(short, long)]
        keywords: String,

        /// URL the inserted link would point at.
        #[arg(long)]
        link_url: String,

        /// Heading text delimiting the target region (defaults to config).
        #[arg(long)]
        marker: Option<String>,
    },

    /// List the document handles of a collection.
    List {
        /// Collection handle to list.
        collection: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "linkforge=info",
        1 => "linkforge=debug",
        _ => "linkforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            collection,
            keywords,
            link_url,
            marker,
            pacing_ms,
            dry_run,
        } => {
            cmd_run(
                &collection,
                &keywords,
                &link_url,
                marker.as_deref(),
                pacing_ms,
                dry_run,
            )
            .await
        }
        Command::Check {
            handle,
            keywords,
            link_url,
            marker,
        } => cmd_check(&handle, &keywords, &link_url, marker.as_deref()).await,
        Command::List { collection } => cmd_list(&collection).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    collection: &str,
    keywords: &str,
    link_url: &str,
    marker: Option<&str>,
    pacing_ms: Option<u64>,
    dry_run: bool,
) -> Result<()> {
    let config = load_config()?;

    // Persisting needs the admin token; a dry run does not.
    if !dry_run {
        validate_token(&config)?;
    }

    let keywords = parse_keywords(keywords)?;
    let link_target = parse_link_url(link_url)?;

    let store = ShopStore::new(&config.store)?;

    info!(collection, "listing collection documents");
    let handles = store.list_documents(collection).await?;
    if handles.is_empty() {
        println!("No documents found in collection '{collection}'.");
        return Ok(());
    }

    let run_config = RunConfig {
        marker_text: marker
            .map(String::from)
            .unwrap_or_else(|| config.defaults.marker_text.clone()),
        keywords,
        link_target,
        pacing: Duration::from_millis(pacing_ms.unwrap_or(config.defaults.pacing_ms)),
        dry_run,
    };

    info!(
        collection,
        documents = handles.len(),
        dry_run,
        "processing collection"
    );

    // Ctrl-C requests cooperative cancellation; the in-flight document
    // finishes its transaction first.
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let reporter = CliProgress::new();
    let summary =
        linkforge_core::run(&store, &handles, &run_config, &cancel, &reporter).await?;

    print_summary(&summary, handles.len(), dry_run);
    Ok(())
}

async fn cmd_check(
    handle: &str,
    keywords: &str,
    link_url: &str,
    marker: Option<&str>,
) -> Result<()> {
    let config = load_config()?;
    let keywords = parse_keywords(keywords)?;
    let link_target = parse_link_url(link_url)?;
    let marker_text = marker.unwrap_or(&config.defaults.marker_text);

    let store = ShopStore::new(&config.store)?;
    let document = store.fetch_document(handle).await?;

    let pass = linkforge_core::process(&document.html, marker_text, &keywords, &link_target);

    println!();
    println!("  {handle}: {}", pass.outcome);
    if let Some(html) = pass.html {
        println!();
        println!("  Would persist:");
        println!("{html}");
    }
    println!();

    Ok(())
}

async fn cmd_list(collection: &str) -> Result<()> {
    let config = load_config()?;
    let store = ShopStore::new(&config.store)?;

    let handles = store.list_documents(collection).await?;
    info!(collection, count = handles.len(), "collection listed");

    for handle in &handles {
        println!("{handle}");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

/// Split the comma-separated keyword list, preserving order.
fn parse_keywords(raw: &str) -> Result<Vec<String>> {
    let keywords: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();

    if keywords.is_empty() {
        return Err(eyre!("no keywords given (expected a comma-separated list)"));
    }
    Ok(keywords)
}

fn parse_link_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| eyre!("invalid link URL '{raw}': {e}"))?;
    Ok(url.to_string())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn document_started(&self, handle: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {handle}"));
    }

    fn document_finished(&self, handle: &str, outcome: &LinkOutcome) {
        self.spinner.println(format!("  {handle}: {outcome}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Summary output
// ---------------------------------------------------------------------------

fn print_summary(summary: &RunSummary, listed: usize, dry_run: bool) {
    println!();
    if dry_run {
        println!("  Dry run complete — nothing was persisted.");
    } else {
        println!("  Run complete!");
    }
    println!("  Run ID:         {}", summary.run_id);
    println!("  Documents:      {} of {listed}", summary.total());
    println!("  Linked:         {}", summary.linked);
    println!("  Already linked: {}", summary.already_linked);
    println!("  No match:       {}", summary.no_match);
    println!("  Errors:         {}", summary.errors);

    if summary.errors > 0 {
        println!();
        for report in &summary.reports {
            if report.outcome.kind() == OutcomeKind::Error {
                println!("  ! {}: {}", report.handle, report.outcome);
            }
        }
    }
    println!();
}
