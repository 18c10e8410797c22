//! `statusboard` binary: serve the dashboard or print one snapshot

use anyhow::{anyhow, bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use statusboard_core::Pipeline;
use statusboard_server::config::CONFIG_ENV;
use statusboard_server::{routes, AppConfig, AppState};
use statusboard_upstream::{http_client, Refresher, SnapshotCache, UpstreamSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("statusboard")
        .version(statusboard_server::VERSION)
        .about("Customer website status dashboard")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .env(CONFIG_ENV)
                .value_parser(value_parser!(PathBuf))
                .help("Path to TOML config (environment variables override it)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the dashboard")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help("Bind host (overrides [server].host)"),
                )
                .arg(
                    Arg::new("port")
                        .long("port")
                        .value_parser(value_parser!(u16))
                        .help("Bind port (overrides [server].port)"),
                ),
        )
        .subcommand(Command::new("snapshot").about("Run one refresh and print it as JSON"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config =
        AppConfig::load(path.map(PathBuf::as_path)).context("failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

fn refresher(config: &AppConfig) -> Refresher {
    Refresher::new(Pipeline::new().with_workers(config.http.resolve_workers))
}

fn source(config: &AppConfig) -> Result<Arc<dyn UpstreamSource>> {
    let http = http_client(config.http.timeout())?;
    Ok(config.source.build(http))
}

async fn serve(config: AppConfig, args: &ArgMatches) -> Result<()> {
    let host = args
        .get_one::<String>("host")
        .cloned()
        .unwrap_or_else(|| config.server.host.clone());
    let port = args
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(config.server.port);
    let bind = format!("{host}:{port}")
        .parse::<SocketAddr>()
        .map_err(|err| anyhow!("invalid bind address {host}:{port}: {err}"))?;

    let source = source(&config)?;
    let cache = SnapshotCache::with_ttl(refresher(&config), config.cache.ttl());
    info!(
        source = %source.identity(),
        ttl_seconds = cache.ttl().as_secs(),
        "statusboard configured"
    );
    let state = AppState::new(config.access_password.as_str(), source, cache);

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(bind, async {
            tokio::signal::ctrl_c().await.ok();
        })
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(addr = %bound, "statusboard listening");
    server.await;
    info!("statusboard stopped");
    Ok(())
}

async fn snapshot(config: AppConfig) -> Result<()> {
    let source = source(&config)?;
    let snapshot = refresher(&config).refresh(source.as_ref()).await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    if let Some(error) = &snapshot.error {
        bail!("refresh failed: {error}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = load_config(matches.get_one::<PathBuf>("config"))?;

    match matches.subcommand() {
        Some(("serve", args)) => serve(config, args).await,
        Some(("snapshot", _)) => snapshot(config).await,
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("no command given"),
    }
}
