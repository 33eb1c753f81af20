//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use civicore_compiler::{CivicClient, InfoCompiler};
use civicore_crawler::{CustomSearchFinder, MentionRelevancy, NewsCrawler};
use civicore_shared::{
    AppConfig, candidate_id, config_file_path, init_config, load_config, resolve_api_key,
};
use civicore_storage::{EntityStore, KIND_CANDIDATE, SqliteStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Civicore — compile civic-election data and news coverage.
#[derive(Parser)]
#[command(
    name = "civicore",
    version,
    about = "Compile elections, candidates, and news coverage into a canonical record set.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Entity database path (overrides the configured location).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

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
    /// Query the civic-data API and compile election/candidate records.
    Compile {
        /// Also crawl news coverage for every compiled candidate.
        #[arg(long)]
        with_news: bool,
    },

    /// Crawl news coverage for a single candidate.
    Crawl {
        /// Candidate name as reported by the contest feed.
        #[arg(long)]
        name: String,

        /// Candidate party (used to derive the candidate id).
        #[arg(long)]
        party: String,
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
        0 => "civicore=info",
        1 => "civicore=debug",
        _ => "civicore=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compile { with_news } => cmd_compile(cli.db, with_news).await,
        Command::Crawl { name, party } => cmd_crawl(cli.db, &name, &party).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_compile(db: Option<PathBuf>, with_news: bool) -> Result<()> {
    let config = load_config()?;
    if config.compiler.addresses.is_empty() {
        return Err(eyre!(
            "no addresses configured — add [compiler] addresses to {}",
            config_file_path()?.display()
        ));
    }

    let api_key = resolve_api_key(&config.civic_api.api_key_env)?;
    let store = open_store(&config, db).await?;

    let client = CivicClient::new(&config.civic_api.base_url, api_key)?;
    let compiler = InfoCompiler::new(client, config.compiler.addresses.clone());

    info!(addresses = config.compiler.addresses.len(), "starting compile");
    let summary = compiler.compile_info(&store).await?;

    println!();
    println!("  Compile finished.");
    println!("  Elections:       {}", summary.elections);
    println!("  Candidates:      {}", summary.candidates);
    println!("  Contest entries: {}", summary.contest_entries);
    println!("  Skipped queries: {}", summary.skipped_queries);
    println!();

    if with_news {
        crawl_all_candidates(&config, &store).await?;
    }
    Ok(())
}

async fn cmd_crawl(db: Option<PathBuf>, name: &str, party: &str) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config, db).await?;
    let crawler = build_crawler(&config)?;

    let id = candidate_id(name, party);
    info!(candidate = name, "starting news crawl");
    let summary = crawler.compile_articles(name, &id, &store).await?;

    println!();
    println!("  Crawl finished for {name}.");
    println!("  Articles stored: {}", summary.articles_stored);
    println!("  URLs skipped:    {}", summary.urls_skipped);
    println!();
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config).map_err(|e| eyre!("render config: {e}"))?;
    println!("# {}", config_file_path()?.display());
    print!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn open_store(config: &AppConfig, db: Option<PathBuf>) -> Result<SqliteStore> {
    let path = match db {
        Some(path) => path,
        None => civicore_shared::resolve_db_path(config)?,
    };
    info!(?path, "opening entity store");
    Ok(SqliteStore::open(&path).await?)
}

fn build_crawler(config: &AppConfig) -> Result<NewsCrawler> {
    let search_key = resolve_api_key(&config.search.api_key_env)?;
    let finder = CustomSearchFinder::new(
        reqwest::Client::new(),
        &config.search.base_url,
        search_key,
        &config.search.engine_id,
    );
    let relevancy = MentionRelevancy::new(config.crawl_policies.relevance_min_mentions);

    Ok(NewsCrawler::new(
        &config.crawl_policies,
        Box::new(finder),
        Box::new(relevancy),
    )?)
}

/// Crawl news for every stored candidate, one at a time.
async fn crawl_all_candidates(config: &AppConfig, store: &SqliteStore) -> Result<()> {
    let crawler = build_crawler(config)?;
    let candidates = store.query_by_kind(KIND_CANDIDATE).await?;

    let bar = ProgressBar::new(candidates.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:30.cyan} {pos}/{len} {msg}")
            .expect("progress template"),
    );

    let mut stored = 0usize;
    for candidate in &candidates {
        let Some(name) = candidate.field("name").and_then(|f| f.as_str()) else {
            bar.inc(1);
            continue;
        };
        bar.set_message(name.to_string());
        let summary = crawler.compile_articles(name, &candidate.key, store).await?;
        stored += summary.articles_stored;
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("  News articles stored: {stored}");
    println!();
    Ok(())
}
