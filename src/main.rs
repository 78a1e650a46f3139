use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nullroute::blocklist::{SourceFetcher, Updater};
use nullroute::cache::DnsCache;
use nullroute::config::{ServerConfig, SourceConfig};
use nullroute::host_dns::NoopHostDns;
use nullroute::matcher::Matcher;
use nullroute::query_log::TracingQueryLog;
use nullroute::server::{self, ServerHandles, ServerStats};
use nullroute::upstream::UpstreamClient;
use tokio::sync::broadcast;

/// A recursive-forwarding DNS server that sinks queries for blocked
/// domains to NXDOMAIN and forwards everything else upstream.
#[derive(Parser, Debug)]
#[command(name = "nullroute", version, about)]
struct Cli {
    /// Path to the server settings YAML file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the blocklist sources/presets YAML file.
    #[arg(long, default_value = "config/sources.yml")]
    sources: PathBuf,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the upstream resolver address (`ip:port`).
    #[arg(long)]
    upstream: Option<String>,

    /// Tracing filter, e.g. `debug`, `nullroute=trace`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log_level))
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream = upstream;
    }

    let matcher = Arc::new(Matcher::from_files(
        &config.blocklist.blocklist_file,
        Some(config.blocklist.whitelist_file.as_path()),
    )?);
    tracing::info!(
        domains = matcher.snapshot().blocklist_size(),
        "blocklist loaded"
    );

    let cache = Arc::new(DnsCache::new(
        config.cache.max_size,
        config.cache.min_ttl,
        config.cache.max_ttl,
    ));

    let upstream_addr = config.upstream_addr()?;
    let upstream = Arc::new(UpstreamClient::new(upstream_addr, Duration::from_secs(5)));

    let stats = Arc::new(ServerStats::default());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let updater = if config.blocklist.auto_update && cli.sources.exists() {
        let source_config = SourceConfig::load(&cli.sources)?;
        let cache_dir = PathBuf::from("cache/sources");
        let fetcher = SourceFetcher::new(cache_dir.clone(), source_config.fetch_timeout())?;
        let updater = Arc::new(Updater::new(
            fetcher,
            source_config,
            Arc::clone(&matcher),
            config.blocklist.blocklist_file.clone(),
            Some(config.blocklist.whitelist_file.clone()),
            cache_dir,
            config.blocklist.update_preset.clone(),
            Duration::from_secs(config.blocklist.update_interval),
        ));
        let run_on_startup = config.blocklist.update_on_startup;
        let updater_handle = Arc::clone(&updater);
        tokio::spawn(async move {
            updater_handle.run(run_on_startup).await;
        });
        Some(updater)
    } else {
        None
    };

    let handles = ServerHandles {
        matcher,
        cache,
        enable_cache: config.enable_cache,
        upstream,
        stats,
        query_log: Arc::new(TracingQueryLog),
        host_dns: Arc::new(NoopHostDns),
    };

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("ctrl-c received, shutting down");
        let _ = shutdown_tx.send(());
    });

    let bind_addr = config.bind_addr();
    server::run_udp_server(bind_addr, handles, config.max_workers, shutdown_rx).await?;

    if let Some(updater) = updater {
        updater.stop();
    }

    Ok(())
}
