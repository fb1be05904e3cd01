use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use hearth_core::{EntityMatch, HearthConfig, ResultSet, SearchMode, SearchRequest};
use hearth_hass::{EntitySnapshotProvider, HassClient, StaticSnapshot};
use hearth_index::{embedder_from_config, EntityStore, Indexer, SyncReport, VectorIndex};
use hearth_mcp::tools::HearthServer;
use hearth_search::{EmbeddingIndex, HybridSearch, SemanticIndex, UnavailableIndex};

const CONFIG_FILE: &str = ".hearth.toml";

#[derive(Parser)]
#[command(
    name = "hearth",
    version,
    about = "Hybrid entity search for Home Assistant",
    long_about = "Hearth finds Home Assistant entities from natural language.\n\n\
                   Semantic search ranks entities by embedding similarity, keyword search\n\
                   matches substrings, and hybrid search combines both. When the semantic\n\
                   index is unavailable, searches fall back to keyword matching.\n\n\
                   Examples:\n  \
                     hearth index                          Embed all entities\n  \
                     hearth search 'lights in the kitchen' Hybrid search\n  \
                     hearth search fan --mode keyword      Substring search only\n  \
                     hearth search '' --domain sensor      List sensors\n  \
                     hearth mcp                            Serve tools over MCP stdio\n  \
                     hearth doctor                         Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .hearth.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable listing (default)\n  \
                         json      The result body as JSON\n  \
                         markdown  Markdown tables grouped by domain"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Home Assistant URL (overrides HASS_URL and the config file)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Home Assistant long-lived access token (overrides HASS_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Search entities
    #[command(
        long_about = "Search Home Assistant entities.\n\n\
        Modes: semantic (embedding similarity), keyword (substring), hybrid (both, default).\n\
        An empty query lists entities. Use --snapshot to search a saved /api/states dump\n\
        instead of a live instance.\n\n\
        Examples:\n  hearth search 'living room lights'\n  hearth search 'temperature' --domain sensor --area kitchen\n  hearth search garage --mode keyword --limit 5"
    )]
    Search {
        /// Search query (empty lists entities)
        #[arg(default_value = "")]
        query: String,

        /// Only return entities of this domain (e.g. light, sensor)
        #[arg(long)]
        domain: Option<String>,

        /// Only return entities in this area id
        #[arg(long)]
        area: Option<String>,

        /// Maximum results (default from config: 10)
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum semantic similarity, 0 to 1 (default from config: 0.7)
        #[arg(long)]
        threshold: Option<f64>,

        /// semantic, keyword, or hybrid (default from config: hybrid)
        #[arg(long)]
        mode: Option<String>,

        /// Read entities from a JSON states dump instead of Home Assistant
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Sync the index before searching
        #[arg(long)]
        index: bool,
    },
    /// Embed entities into the semantic index
    #[command(long_about = "Embed entities into the semantic index.\n\n\
        Only entities whose description changed since the last run are embedded.\n\
        Entities that no longer exist are removed. Use --rebuild after changing\n\
        the embedding model.\n\n\
        Examples:\n  hearth index\n  hearth index --snapshot states.json\n  hearth index --rebuild")]
    Index {
        /// Read entities from a JSON states dump instead of Home Assistant
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Drop the stored index and embed everything again
        #[arg(long)]
        rebuild: bool,
    },
    /// Show what the semantic index holds
    Status,
    /// Start the MCP server on stdio
    #[command(long_about = "Start the MCP server on stdio.\n\n\
        Exposes search_entities, reindex_entities and index_status.\n\
        Logs go to stderr; stdout carries the protocol.")]
    Mcp {
        /// Serve entities from a JSON states dump instead of Home Assistant
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Create a default .hearth.toml configuration file
    #[command(long_about = "Create a default .hearth.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .hearth.toml already exists.")]
    Init,
    /// Check your hearth setup and environment
    #[command(long_about = "Check your hearth setup and environment.\n\n\
        Runs diagnostics for the config file, Home Assistant connection,\n\
        embedding provider and search index. Use --format json for\n\
        machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON
    Json,
    /// Markdown
    Markdown,
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mhearth\x1b[0m v{version}: hybrid entity search for Home Assistant\n");

        println!("Quick start:");
        println!("  \x1b[36mhearth init\x1b[0m                   Create a .hearth.toml config file");
        println!("  \x1b[36mhearth index\x1b[0m                  Embed your entities");
        println!("  \x1b[36mhearth search 'porch light'\x1b[0m   Find entities\n");

        println!("All commands:");
        println!("  \x1b[32msearch\x1b[0m    Semantic, keyword, or hybrid entity search");
        println!("  \x1b[32mindex\x1b[0m     Embed entities into the semantic index");
        println!("  \x1b[32mstatus\x1b[0m    Show what the index holds");
        println!("  \x1b[32mdoctor\x1b[0m    Check your setup and environment");
        println!("  \x1b[32mmcp\x1b[0m       Start MCP server for assistants");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("hearth v{version}: hybrid entity search for Home Assistant\n");

        println!("Quick start:");
        println!("  hearth init                   Create a .hearth.toml config file");
        println!("  hearth index                  Embed your entities");
        println!("  hearth search 'porch light'   Find entities\n");

        println!("All commands:");
        println!("  search    Semantic, keyword, or hybrid entity search");
        println!("  index     Embed entities into the semantic index");
        println!("  status    Show what the index holds");
        println!("  doctor    Check your setup and environment");
        println!("  mcp       Start MCP server for assistants");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'hearth <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("HEARTH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<HearthConfig> {
    let config = match &cli.config {
        Some(path) => HearthConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                HearthConfig::from_file(default_path)?
            } else {
                HearthConfig::default()
            }
        }
    };

    let mut config = config.with_env_overrides();
    if let Some(url) = &cli.url {
        config.hass.url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.hass.token = Some(token.clone());
    }
    Ok(config)
}

fn snapshot_provider(
    config: &HearthConfig,
    snapshot: Option<&Path>,
) -> Result<Arc<dyn EntitySnapshotProvider>> {
    match snapshot {
        Some(path) => {
            let snapshot = StaticSnapshot::from_file(path)?;
            tracing::debug!(entities = snapshot.len(), path = %path.display(), "loaded states dump");
            Ok(Arc::new(snapshot))
        }
        None => {
            if config.hass.token.is_none() {
                miette::bail!(miette::miette!(
                    help = "Set HASS_TOKEN, pass --token, or add token under [hass] in .hearth.toml.\n       Use --snapshot <file> to work from a saved /api/states dump instead.",
                    "No Home Assistant token configured"
                ));
            }
            Ok(Arc::new(HassClient::with_config(&config.hass)?))
        }
    }
}

fn open_indexer(config: &HearthConfig) -> Result<Indexer> {
    if let Some(env_var) = config.embedding.api_key_env() {
        if config.embedding.api_key.is_none() && std::env::var(env_var).is_err() {
            miette::bail!(miette::miette!(
                help = format!(
                    "Set {env_var} or add api_key in your .hearth.toml under [embedding]"
                ),
                "No API key configured for embedding provider '{}'",
                config.embedding.provider
            ));
        }
    }

    let embedder = embedder_from_config(&config.embedding)?;
    let store = EntityStore::open(&config.index.path)?;
    Ok(Indexer::new(store, embedder, Arc::new(VectorIndex::new())))
}

/// Open the index for searching. Failures degrade searches to keyword
/// matching instead of aborting.
fn open_for_search(config: &HearthConfig) -> std::result::Result<Indexer, String> {
    match open_indexer(config) {
        Ok(indexer) => Ok(indexer),
        Err(e) => {
            tracing::warn!(error = %e, "semantic index unavailable, searching by keyword");
            Err(e.to_string())
        }
    }
}

/// Publish the stored index; searches fall back to keyword matching if it
/// cannot be loaded.
fn warm_start(indexer: &Indexer) {
    if let Err(e) = indexer.load() {
        tracing::warn!(error = %e, "stored index not loaded");
    }
}

async fn sync_index(
    indexer: &Indexer,
    snapshot: &dyn EntitySnapshotProvider,
    rebuild: bool,
) -> Result<SyncReport> {
    let is_tty = std::io::stderr().is_terminal();
    let spinner = if is_tty {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .into_diagnostic()?,
        );
        pb.set_message("Fetching entities...");
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let entities = match snapshot.list_entities(None, None, usize::MAX).await {
        Ok(entities) => entities,
        Err(e) => {
            if let Some(pb) = &spinner {
                pb.finish_with_message("Failed");
            }
            return Err(e).into_diagnostic();
        }
    };

    if let Some(pb) = &spinner {
        pb.set_message(format!("Embedding {} entities...", entities.len()));
    }

    let report = indexer.sync(&entities, rebuild).await.inspect_err(|_e| {
        if let Some(pb) = &spinner {
            pb.finish_with_message("Failed");
        }
    })?;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    Ok(report)
}

fn print_report(report: &SyncReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("# Index Sync\n");
            println!("| Embedded | Unchanged | Removed | Total | Version |");
            println!("|---:|---:|---:|---:|---:|");
            println!(
                "| {} | {} | {} | {} | {} |",
                report.embedded, report.unchanged, report.removed, report.total, report.version
            );
        }
        OutputFormat::Text => {
            println!(
                "Indexed {} entities ({} embedded, {} unchanged, {} removed), version {}",
                report.total, report.embedded, report.unchanged, report.removed, report.version
            );
        }
    }
    Ok(())
}

fn print_results(results: &ResultSet, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("# Search Results for `{}`\n", results.query);
            if let Some(error) = &results.error {
                println!("**Error:** {error}");
                return Ok(());
            }
            println!("Mode: {} | {} result(s)\n", results.search_mode, results.count);

            let mut by_domain: BTreeMap<&str, Vec<&EntityMatch>> = BTreeMap::new();
            for result in &results.results {
                by_domain.entry(result.domain.as_str()).or_default().push(result);
            }
            for (domain, matches) in by_domain {
                println!("## {domain} ({})\n", matches.len());
                println!("| Entity | Name | State | Similarity | Reason |");
                println!("|---|---|---|---:|---|");
                for m in matches {
                    println!(
                        "| `{}` | {} | {} | {:.3} | {} |",
                        m.entity_id,
                        m.friendly_name,
                        m.state,
                        m.similarity,
                        m.match_reason.replace('|', "\\|"),
                    );
                }
                println!();
            }
        }
        OutputFormat::Text => {
            if let Some(error) = &results.error {
                eprintln!("error: {error}");
                return Ok(());
            }
            if results.results.is_empty() {
                println!("No results found.");
                return Ok(());
            }
            for (i, m) in results.results.iter().enumerate() {
                println!(
                    "{}. {} ({}) [{}] similarity {:.3}",
                    i + 1,
                    m.entity_id,
                    m.friendly_name,
                    m.state,
                    m.similarity,
                );
                println!("   {}", m.match_reason);
            }
            let domains: Vec<String> = results
                .domains
                .iter()
                .map(|(domain, count)| format!("{domain}: {count}"))
                .collect();
            println!(
                "\n{} result(s) via {} search ({})",
                results.count,
                results.search_mode,
                domains.join(", ")
            );
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

async fn run_doctor(
    config: &HearthConfig,
    config_path: &Path,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    if config_path.exists() {
        checks.push(CheckResult::pass(
            "config_file",
            format!("{} found", config_path.display()),
        ));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            format!("{} not found", config_path.display()),
            "run 'hearth init' to create a default config",
        ));
    }

    // 2. Home Assistant
    checks.push(CheckResult::info("hass_url", config.hass.url.clone()));
    match HassClient::with_config(&config.hass) {
        Ok(client) => {
            checks.push(CheckResult::pass("hass_token", "token configured"));
            match client.check_api().await {
                Ok(message) => checks.push(CheckResult::pass("hass_api", message)),
                Err(e) => checks.push(CheckResult::fail(
                    "hass_api",
                    e.to_string(),
                    "check the URL and that the token has not been revoked",
                )),
            }
        }
        Err(_) => checks.push(CheckResult::fail(
            "hass_token",
            "HASS_TOKEN not set",
            "create a long-lived access token in your Home Assistant profile and export HASS_TOKEN=...",
        )),
    }

    // 3. Embedding provider + API key
    let emb = &config.embedding;
    checks.push(CheckResult::pass(
        "embedding_provider",
        format!("{} (model: {}, {} dims)", emb.provider, emb.model, emb.dimensions),
    ));
    if let Some(env_var) = emb.api_key_env() {
        if emb.resolve_api_key().is_ok() {
            checks.push(CheckResult::pass(
                "embedding_api_key",
                format!("{env_var} set"),
            ));
        } else {
            checks.push(CheckResult::fail(
                "embedding_api_key",
                format!("{env_var} not set"),
                format!("export {env_var}=... or set api_key in .hearth.toml [embedding]"),
            ));
        }
    }

    // 4. Search index
    let index_path = &config.index.path;
    if index_path.exists() {
        match EntityStore::open(index_path) {
            Ok(store) => {
                let stats = store.stats()?;
                let model = store.embedding_model()?;
                let detail = format!(
                    "{} entities in {} domains ({} bytes)",
                    stats.total_entities, stats.total_domains, stats.index_size_bytes
                );
                match model {
                    Some((stored, _)) if stored != emb.model => checks.push(CheckResult::fail(
                        "search_index",
                        format!("{detail}, built with {stored}"),
                        "run 'hearth index --rebuild' to re-embed with the configured model",
                    )),
                    _ => checks.push(CheckResult::pass("search_index", detail)),
                }
            }
            Err(e) => checks.push(CheckResult::fail(
                "search_index",
                e.to_string(),
                format!("delete {} and run 'hearth index'", index_path.display()),
            )),
        }
    } else {
        checks.push(CheckResult::info(
            "search_index",
            "not found (run 'hearth index' to create; searches use keyword matching until then)",
        ));
    }

    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let version = env!("CARGO_PKG_VERSION");
            println!("hearth v{version}: environment check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# hearth configuration

[hass]
# url = "http://homeassistant.local:8123"   # or HASS_URL
# token = "..."                              # or HASS_TOKEN
# timeout_secs = 10

[embedding]
# "hash" works offline; "voyage" and "openai" call a remote API
# provider = "hash"
# model = "hash-256"
# dimensions = 256
# api_key = "..."                            # or VOYAGE_API_KEY / OPENAI_API_KEY
# base_url = "https://api.voyageai.com/v1"

[search]
# default_limit = 10
# max_limit = 100
# similarity_threshold = 0.7
# default_mode = "hybrid"                    # semantic, keyword, or hybrid
# semantic_timeout_ms = 5000
# keyword_timeout_ms = 5000

[index]
# path = ".hearth/index.db"
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Search {
            ref query,
            ref domain,
            ref area,
            limit,
            threshold,
            ref mode,
            ref snapshot,
            index,
        }) => {
            let config = load_config(&cli)?;
            let provider = snapshot_provider(&config, snapshot.as_deref())?;

            let requested = match mode {
                Some(mode) => mode.trim().parse::<SearchMode>().ok(),
                None => Some(config.search.default_mode),
            };
            let semantic: Arc<dyn EmbeddingIndex> = if index {
                let indexer = open_indexer(&config)?;
                let report = sync_index(&indexer, provider.as_ref(), false).await?;
                tracing::info!(total = report.total, version = report.version, "index ready");
                Arc::new(SemanticIndex::new(indexer.embedder(), indexer.index()))
            } else if requested == Some(SearchMode::Keyword) {
                Arc::new(UnavailableIndex::new("keyword search does not use embeddings"))
            } else {
                match open_for_search(&config) {
                    Ok(indexer) => {
                        warm_start(&indexer);
                        Arc::new(SemanticIndex::new(indexer.embedder(), indexer.index()))
                    }
                    Err(reason) => Arc::new(UnavailableIndex::new(reason)),
                }
            };

            let search = HybridSearch::new(provider, semantic, config.search.clone());
            let request = SearchRequest {
                query: query.clone(),
                domain: domain.clone(),
                area_id: area.clone(),
                limit,
                similarity_threshold: threshold,
                search_mode: mode.clone(),
            };
            let results = search.search(&request).await;
            print_results(&results, cli.format)?;
            if results.is_error() {
                std::process::exit(1);
            }
        }
        Some(Command::Index {
            ref snapshot,
            rebuild,
        }) => {
            let config = load_config(&cli)?;
            let provider = snapshot_provider(&config, snapshot.as_deref())?;
            let indexer = open_indexer(&config)?;
            let report = sync_index(&indexer, provider.as_ref(), rebuild).await?;
            print_report(&report, cli.format)?;
        }
        Some(Command::Status) => {
            let config = load_config(&cli)?;
            let indexer = open_indexer(&config)?;
            indexer.load()?;
            let status = indexer.index().snapshot().status();
            let stats = indexer.store_stats()?;

            match cli.format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "index": status,
                        "store": stats,
                        "path": config.index.path,
                    });
                    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# Index Status\n");
                    println!("- **Path:** `{}`", config.index.path.display());
                    println!("- **Model:** {} ({} dims)", status.model, status.dimensions);
                    println!("- **Entities:** {}", status.entities);
                    println!("- **Size:** {} bytes\n", stats.index_size_bytes);
                    if !status.domains.is_empty() {
                        println!("| Domain | Entities |");
                        println!("|---|---:|");
                        for (domain, count) in &status.domains {
                            println!("| {domain} | {count} |");
                        }
                    }
                }
                OutputFormat::Text => {
                    println!("Index:    {}", config.index.path.display());
                    println!("Model:    {} ({} dims)", status.model, status.dimensions);
                    println!(
                        "Entities: {} in {} domains ({} bytes)",
                        status.entities, stats.total_domains, stats.index_size_bytes
                    );
                    for (domain, count) in &status.domains {
                        println!("  {domain:<20} {count}");
                    }
                }
            }
        }
        Some(Command::Mcp { ref snapshot }) => {
            let config = load_config(&cli)?;
            let provider = snapshot_provider(&config, snapshot.as_deref())?;
            let server = match open_for_search(&config) {
                Ok(indexer) => {
                    warm_start(&indexer);
                    HearthServer::new(provider, Arc::new(indexer), config.search)
                }
                Err(reason) => HearthServer::without_index(provider, config.search, reason),
            };
            hearth_mcp::server::run_server(server).await?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            let config = load_config(&cli)?;
            let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            run_doctor(&config, &config_path, cli.format, use_color).await?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "hearth", &mut std::io::stdout());
        }
    }

    Ok(())
}
