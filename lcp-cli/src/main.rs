//! LCP CLI
//!
//! Runs the cache server and inspects persisted snapshots.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lcp_api::{ApiConfig, ApiServer};
use lcp_cache::{
    json_marshal, marshal_with, spawn_refresh, Cache, CacheConfig, CorruptSnapshotPolicy, Marshal,
    RefreshConfig, RefreshHandle, SnapshotFile,
};
use lcp_core::constants::DEFAULT_CACHE_FOLDER;
use lcp_core::error::LcpError;
use lcp_core::models::{AppleMusicCache, GitHubRepository, SteamGame};
use lcp_core::traits::CacheData;
use lcp_sources::{http_client, load_sources, validate_cache_name, SourceConfig, SourceKind};

/// LCP - self-refreshing JSON caches with live streams
#[derive(Parser)]
#[command(name = "lcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cache server
    Serve(ServeArgs),

    /// Print a persisted snapshot
    Inspect {
        /// Cache name
        name: String,
        /// Folder holding snapshot files
        #[arg(long, env = "CACHE_FOLDER", default_value = DEFAULT_CACHE_FOLDER)]
        cache_folder: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,
    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,
    /// JSON source list
    #[arg(short, long, env = "LCP_SOURCES", default_value = "sources.json")]
    sources: PathBuf,
    /// Folder holding snapshot files
    #[arg(long, env = "CACHE_FOLDER", default_value = DEFAULT_CACHE_FOLDER)]
    cache_folder: PathBuf,
    /// Whitespace-separated bearer tokens (defaults to VALID_TOKENS)
    #[arg(long)]
    tokens: Option<String>,
    /// Move unreadable snapshot files aside instead of refusing to start
    #[arg(long)]
    discard_corrupt: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "lcp=debug,info"
    } else {
        "lcp=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    match cli.command {
        Commands::Serve(args) => cmd_serve(args).await,
        Commands::Inspect { name, cache_folder } => cmd_inspect(&name, &cache_folder).await,
    }
}

/// Run the cache server until Ctrl+C
async fn cmd_serve(args: ServeArgs) -> Result<()> {
    let sources = load_sources(&args.sources)
        .with_context(|| format!("Failed to load sources from {}", args.sources.display()))?;
    if sources.is_empty() {
        bail!("No sources configured in {}", args.sources.display());
    }

    let mut config = ApiConfig::from_env();
    if let Some(tokens) = &args.tokens {
        config = config.with_tokens(tokens.split_whitespace());
    }
    if config.valid_tokens.is_empty() {
        warn!("No bearer tokens configured; every cache request will be rejected");
    }

    let policy = if args.discard_corrupt {
        CorruptSnapshotPolicy::Discard
    } else {
        CorruptSnapshotPolicy::Fail
    };
    let client = http_client().context("Failed to build HTTP client")?;

    println!("{}", "🚀 Starting LCP cache server...".cyan().bold());

    let mut server = ApiServer::new(config);
    let mut handles = Vec::with_capacity(sources.len());

    for source in &sources {
        let handle = match source.kind {
            SourceKind::Json => {
                let (cache, handle) =
                    start_cache::<serde_json::Value>(source, &client, &args.cache_folder, policy, json_marshal())
                        .await?;
                server = server.mount(cache);
                handle
            }
            SourceKind::AppleMusic => {
                let marshal = marshal_with(AppleMusicCache::summarize);
                let (cache, handle) =
                    start_cache::<AppleMusicCache>(source, &client, &args.cache_folder, policy, marshal).await?;
                server = server.mount(cache);
                handle
            }
            SourceKind::Steam => {
                let (cache, handle) =
                    start_cache::<Vec<SteamGame>>(source, &client, &args.cache_folder, policy, json_marshal())
                        .await?;
                server = server.mount(cache);
                handle
            }
            SourceKind::Github => {
                let (cache, handle) = start_cache::<Vec<GitHubRepository>>(
                    source,
                    &client,
                    &args.cache_folder,
                    policy,
                    json_marshal(),
                )
                .await?;
                server = server.mount(cache);
                handle
            }
        };
        println!("   {} /{} every {}s", "Cache:".green(), source.name, source.interval_secs);
        handles.push(handle);
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .context("Invalid bind address")?;
    println!("   {} http://{}", "Listening on:".green(), addr);
    println!("   {} http://{}/health", "Health check:".dimmed(), addr);
    println!("\n   Press Ctrl+C to stop.\n");

    server.run(addr, shutdown_signal()).await.context("API server failed")?;

    for handle in handles {
        let name = handle.name().to_string();
        if let Err(err) = handle.stop().await {
            error!(cache = %name, error = %err, "Refresh loop did not stop cleanly");
        }
    }

    println!("{}", "👋 LCP stopped.".cyan());
    Ok(())
}

/// Opens one cache, seeds it with an initial fetch, and starts its refresh loop.
async fn start_cache<T: CacheData>(
    source: &SourceConfig,
    client: &reqwest::Client,
    root: &Path,
    policy: CorruptSnapshotPolicy,
    marshal: Marshal<T>,
) -> Result<(Arc<Cache<T>>, RefreshHandle)> {
    let upstream = Arc::new(source.source()?);
    let fetch = move |client: reqwest::Client| {
        let upstream = upstream.clone();
        async move { upstream.fetch::<T>(&client).await }
    };

    let initial = fetch(client.clone()).await;
    if let Err(err) = &initial {
        warn!(cache = %source.name, error = %err, "Initial fetch failed");
    }

    let config = CacheConfig::new(&source.name, root).on_corrupt(policy);
    let cache = Arc::new(open_cache(config, initial).await?.with_marshal(marshal));

    let handle = spawn_refresh(
        cache.clone(),
        client.clone(),
        fetch,
        RefreshConfig::every(source.interval()),
    );
    info!(cache = %source.name, url = %source.url, "Cache ready");

    Ok((cache, handle))
}

/// Opens a cache seeded with the initial fetch result, if it succeeded.
async fn open_cache<T: CacheData>(config: CacheConfig, initial: Result<T, LcpError>) -> Result<Cache<T>> {
    let name = config.name.clone();
    let apply_initial = initial.is_ok();

    match Cache::open(config, initial.unwrap_or_default(), apply_initial).await {
        Ok(cache) => Ok(cache),
        Err(err) if err.is_storage_error() => Err(anyhow::Error::new(err).context(format!(
            "Cache '{name}' cannot read its snapshot file (use --discard-corrupt to move a corrupt file aside)"
        ))),
        Err(err) => Err(anyhow::Error::new(err).context(format!("Failed to open cache '{name}'"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Print a persisted snapshot
async fn cmd_inspect(name: &str, cache_folder: &Path) -> Result<()> {
    validate_cache_name(name)?;
    let file = SnapshotFile::new(cache_folder, name);
    let snapshot = file
        .load::<serde_json::Value>()
        .await
        .with_context(|| format!("Failed to read {}", file.path().display()))?;

    let Some(snapshot) = snapshot else {
        println!("{} {}", "No snapshot at".yellow(), file.path().display());
        return Ok(());
    };

    let age = Utc::now().signed_duration_since(snapshot.updated);
    println!("{} {}", "📦 Cache:".cyan().bold(), name);
    println!("   {} {}", "File:".dimmed(), file.path().display());
    println!(
        "   {} {} ({}s ago)",
        "Updated:".dimmed(),
        snapshot.updated.to_rfc3339(),
        age.num_seconds().max(0)
    );
    println!("\n{}", serde_json::to_string_pretty(&snapshot.data)?);

    Ok(())
}
