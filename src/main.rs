use anyhow::Result;
use bekind::cli::{Cli, Command, DnsArgs, WebArgs};
use bekind::config::FileConfig;
use bekind::dns::{RecordStore, Resolver};
use bekind::shows::{self, ShowSource};
use bekind::{external_ip, hosts, DnsConfig, DnsServer, Web, WebConfig};
use clap::Parser;
use is_terminal::IsTerminal;
use lazy_static::lazy_static;
use std::sync::Arc;
use time::macros::format_description;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

lazy_static! {
    static ref LOG_TIME_FORMAT: &'static [time::format_description::FormatItem<'static>] = format_description!(
        version = 2,
        "[year repr:last_two]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_init(&cli.level);

    match cli.command {
        Command::Version => {
            version();
            Ok(())
        }
        Command::Dns(args) => run_dns(args, cli.verbose).await,
        Command::Web(args) => run_web(args, cli.verbose).await,
    }
}

fn tracing_init(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(UtcTime::new(*LOG_TIME_FORMAT))
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(level).into()),
        )
        .init();
}

/// Our own events and the per-request access log.
fn default_filter(level: &str) -> String {
    format!("bekind={level},tower_http={level}")
}

fn version() {
    println!("Version:   {}", env!("CARGO_PKG_VERSION"));
    println!("Branch:    {}", option_env!("BEKIND_BRANCH").unwrap_or("unknown"));
    println!("Revision:  {}", option_env!("BEKIND_REVISION").unwrap_or("unknown"));
    println!("Timestamp: {}", option_env!("BEKIND_TIMESTAMP").unwrap_or("unknown"));
}

/// Cancel the returned token on ctrl-c.
fn shutdown_on_signal() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("quitting from signal");
        }
        token.cancel();
    });
    shutdown
}

async fn run_dns(args: DnsArgs, verbose: bool) -> Result<()> {
    let config = DnsConfig::from_sources(args, FileConfig::load().dns)?;
    if verbose {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    let config = Arc::new(config);

    let self_addr = if config.self_records.is_empty() {
        config.self_addr
    } else {
        external_ip::self_addr(config.self_addr).await
    };
    let store = RecordStore::from_config(&config, self_addr);
    let resolver = Resolver::new(&config, store)?;
    let server = DnsServer::bind(config.clone(), resolver).await?;

    server.run(shutdown_on_signal()).await?;
    tracing::info!("goodbye");
    Ok(())
}

async fn run_web(args: WebArgs, verbose: bool) -> Result<()> {
    let config = WebConfig::from_sources(args, FileConfig::load().web)?;
    if verbose {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    let shutdown = shutdown_on_signal();

    let (publisher, show_list) = shows::channel();
    let source = ShowSource::new()?;
    tokio::spawn(shows::refresh(source.clone(), publisher, shutdown.clone()));

    let mut web = Web::new(config)?;
    let bindings = hosts::bindings(web.config(), show_list, source);
    web.setup_routes(bindings);

    web.run(shutdown).await?;
    tracing::info!("goodbye");
    Ok(())
}
