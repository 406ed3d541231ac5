//! Command line surface.
//!
//! Every setting is optional at this level so that values from the
//! [config file][crate::config::FileConfig] can fill the gaps. Defaults are applied when the two
//! sources are merged, see [`DnsConfig::from_sources`][crate::config::DnsConfig::from_sources]
//! and [`WebConfig::from_sources`][crate::config::WebConfig::from_sources].

use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bekind", about = "Personal edge service: DNS responder and virtual-host web server")]
pub struct Cli {
    /// Print the effective configuration before starting.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level used when `RUST_LOG` isn't set.
    #[arg(long, global = true, default_value = "info", value_name = "LEVEL")]
    pub level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print build metadata.
    Version,
    /// Run the DNS responder.
    Dns(DnsArgs),
    /// Run the virtual-host web server.
    Web(WebArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct DnsArgs {
    /// Base domain to answer for.
    #[arg(short, long)]
    pub domain: Option<String>,

    /// UDP port to bind [default: 7353].
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind [default: 0.0.0.0].
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// TTL (seconds) of fixed record answers [default: 30].
    #[arg(long)]
    pub ttl: Option<u32>,

    /// Fixed record, as `name:address`.
    #[arg(short = 'r', long = "record", value_name = "NAME:ADDRESS")]
    pub records: Vec<String>,

    /// Label answered with the server's own address.
    #[arg(short = 's', long = "self", value_name = "NAME")]
    pub self_records: Vec<String>,

    /// Own address, used when it can't be discovered.
    #[arg(long)]
    pub self_addr: Option<IpAddr>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct WebArgs {
    /// Base domain host names are qualified with.
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Address (or `localhost`) and port to listen on [default: 127.0.0.1:443].
    #[arg(long)]
    pub listen: Option<String>,

    /// Root directory of static content.
    #[arg(long)]
    pub web_dir: Option<PathBuf>,

    /// Directory certificates are cached in.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Host name certificates may be issued for.
    #[arg(short = 'H', long = "host", value_name = "NAME")]
    pub hosts: Vec<String>,

    /// Global ceiling of requests per second [default: 20].
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// Host serving requests for unregistered host names. Without it, those get a 404.
    #[arg(long)]
    pub default_host: Option<String>,

    /// Contact address registered with the ACME account.
    #[arg(long, value_name = "EMAIL")]
    pub acme_contact: Vec<String>,

    /// Use the ACME staging directory.
    #[arg(long)]
    pub acme_staging: bool,

    /// Per-request timeout in seconds [default: 10].
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}
