//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sheetbind_binder::Document;
use sheetbind_core::pipeline::{
    ProgressReporter, RenderConfig, RenderResult, build_binder, open_loader, render_file,
};
use sheetbind_loader::ContentLoader;
use sheetbind_shared::{
    AppConfig, CacheSettings, SheetSource, init_config, load_config, load_config_from,
};
use sheetbind_storage::Storage;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sheetbind: keep a static page's copy in a Google Sheet.
#[derive(Parser)]
#[command(
    name = "sheetbind",
    version,
    about = "Bind Google Sheets content onto the fixed slots of a static page.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.sheetbind/sheetbind.toml.
    #[arg(long, global = true, env = "SHEETBIND_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Load content (cache or sheet) and bind it into a page.
    Render {
        /// Page to render.
        input: PathBuf,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Load content and print it as JSON.
    Content,

    /// Cache inspection.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// List the binding table.
    Slots {
        /// Check which slots resolve to an element in this page.
        #[arg(long)]
        page: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show when the cache was written and whether it is still fresh.
    Status,
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

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sheetbind=info",
        1 => "sheetbind=debug",
        _ => "sheetbind=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config {
        action: ConfigAction::Init,
    } = &cli.command
    {
        return cmd_config_init().await;
    }

    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Render { input, out } => cmd_render(&config, input, out).await,
        Command::Content => cmd_content(&config).await,
        Command::Cache {
            action: CacheAction::Status,
        } => cmd_cache_status(&config).await,
        Command::Slots { page } => cmd_slots(&config, page.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_render(config: &AppConfig, input: PathBuf, out: Option<PathBuf>) -> Result<()> {
    if !input.is_file() {
        return Err(eyre!("page '{}' does not exist", input.display()));
    }

    info!(input = %input.display(), "rendering page");

    let loader = open_loader(config).await?;
    let binder = build_binder(config)?;
    let render_config = RenderConfig {
        input,
        output: out.clone(),
    };

    let reporter = CliProgress::new();
    let result = render_file(&render_config, &loader, &binder, &reporter).await?;

    match &out {
        Some(path) => {
            eprintln!();
            eprintln!("  Page rendered!");
            eprintln!("  Output:  {}", path.display());
            print_summary(&result);
            eprintln!();
        }
        None => print!("{}", result.html),
    }

    Ok(())
}

fn print_summary(result: &RenderResult) {
    let source = result
        .source
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none (load failed, defaults kept)".into());
    eprintln!("  Source:  {source}");
    eprintln!("  Fields:  {}", result.fields);
    eprintln!("  Applied: {}", result.report.applied);
    eprintln!(
        "  Skipped: {} without value, {} without target",
        result.report.missing_value, result.report.missing_target
    );
    eprintln!("  Time:    {:.2}s", result.elapsed.as_secs_f64());
}

async fn cmd_content(config: &AppConfig) -> Result<()> {
    let loader = open_loader(config).await?;
    let content = loader.load().await;

    println!("{}", serde_json::to_string_pretty(&content)?);
    Ok(())
}

async fn cmd_cache_status(config: &AppConfig) -> Result<()> {
    let settings = CacheSettings::from(config);
    if !settings.db_path.exists() {
        println!("No cache yet ({} does not exist).", settings.db_path.display());
        return Ok(());
    }

    let storage = Storage::open_readonly(&settings.db_path).await?;
    let ttl = settings.ttl;
    let db_path = settings.db_path.clone();
    let loader = ContentLoader::new(SheetSource::from(config), settings, storage)?;

    let Some(entry) = loader.cache_entry().await? else {
        println!("Cache at {} is empty.", db_path.display());
        return Ok(());
    };

    let now = chrono::Utc::now();
    let age = entry.age(now);
    println!("  Cache:   {}", db_path.display());
    println!("  Written: {}", entry.written_at.to_rfc3339());
    println!("  Age:     {}m {}s", age.num_minutes(), age.num_seconds() % 60);
    println!("  TTL:     {}m", ttl.num_minutes());
    println!(
        "  Status:  {}",
        if entry.is_fresh(now, ttl) { "fresh" } else { "expired" }
    );
    println!("  Fields:  {}", entry.content.len());
    Ok(())
}

fn cmd_slots(config: &AppConfig, page: Option<&Path>) -> Result<()> {
    let binder = build_binder(config)?;

    let Some(page) = page else {
        for rule in binder.rules() {
            println!(
                "{:<12} {:<36} {:<52} {}",
                rule.category, rule.key, rule.target, rule.action
            );
        }
        return Ok(());
    };

    let html = std::fs::read_to_string(page)
        .map_err(|e| eyre!("cannot read '{}': {e}", page.display()))?;
    let doc = Document::parse(&html);

    let statuses = binder.audit(&doc);
    let missing = statuses.iter().filter(|s| s.matched == 0).count();
    for status in &statuses {
        let mark = if status.matched > 0 { "ok" } else { "--" };
        println!(
            "{mark} {:<36} {:<52} {}",
            status.rule.key, status.rule.target, status.matched
        );
    }
    println!();
    println!(
        "{} of {} slots resolve in {}",
        statuses.len() - missing,
        statuses.len(),
        page.display()
    );
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &RenderResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_render_with_output() {
        let cli = Cli::try_parse_from(["sheetbind", "-v", "render", "site/index.html", "-o", "dist/index.html"])
            .expect("parse");
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Render { input, out } => {
                assert_eq!(input, PathBuf::from("site/index.html"));
                assert_eq!(out, Some(PathBuf::from("dist/index.html")));
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn parses_slots_audit() {
        let cli = Cli::try_parse_from(["sheetbind", "slots", "--page", "index.html"]).expect("parse");
        assert!(matches!(cli.command, Command::Slots { page: Some(_) }));
    }
}
