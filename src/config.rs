use crate::cli::{DnsArgs, WebArgs};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub type SharedDnsConfig = Arc<DnsConfig>;
pub type SharedWebConfig = Arc<WebConfig>;

/// Environment variable selecting the config file.
pub const CONFIG_FILE_ENV: &str = "BEKIND_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_DNS_PORT: u16 = 7353;
pub const DEFAULT_TTL: u32 = 30;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:443";
pub const DEFAULT_RATE_LIMIT: u32 = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Port of the plaintext listener redirecting to HTTPS.
pub const HTTP_PORT: u16 = 80;

/// Settings read from the JSON config file. Same keys as the long command line flags, grouped
/// per command.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct FileConfig {
    pub dns: DnsSection,
    pub web: WebSection,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct DnsSection {
    pub domain: Option<String>,
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub ttl: Option<u32>,
    pub records: HashMap<String, String>,
    #[serde(rename = "self")]
    pub self_records: Vec<String>,
    pub self_addr: Option<IpAddr>,
}

#[serde_as]
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct WebSection {
    pub domain: Option<String>,
    pub listen: Option<String>,
    pub web_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub hosts: Vec<String>,
    pub rate_limit: Option<u32>,
    pub default_host: Option<String>,
    pub acme_contact: Vec<String>,
    pub acme_staging: Option<bool>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
}

impl FileConfig {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load the file named by [`CONFIG_FILE_ENV`] (or [`DEFAULT_CONFIG_FILE`]). A missing file
    /// yields an empty config, an unreadable one is logged and ignored.
    #[must_use]
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        match Self::try_from_file(&path) {
            Ok(conf) => {
                tracing::debug!("loaded config from {path}");
                conf
            }
            Err(Error::IO(err)) if err.kind() == ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!(file = %path, error = %err, "ignoring config file");
                Self::default()
            }
        }
    }
}

/// Settings of the DNS responder.
#[derive(Serialize, Debug, Clone)]
pub struct DnsConfig {
    /// Base domain, lower case, always ending with `.`.
    pub domain: String,
    pub bind_addr: SocketAddr,
    pub ttl: u32,
    /// Fixed records as configured, label to unparsed address.
    pub records: BTreeMap<String, String>,
    /// Labels answered with the server's own address.
    pub self_records: Vec<String>,
    /// Operator supplied own address.
    pub self_addr: Option<IpAddr>,
}

impl DnsConfig {
    /// Merge command line flags over config file values. Flags win; repeated flags replace the
    /// file's list when given at all.
    pub fn from_sources(args: DnsArgs, file: DnsSection) -> Result<Self, Error> {
        let domain = args
            .domain
            .or(file.domain)
            .ok_or(Error::MissingSetting("domain"))?;
        let port = args.port.or(file.port).unwrap_or(DEFAULT_DNS_PORT);
        let bind = args
            .bind
            .or(file.bind)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let records: BTreeMap<String, String> = if args.records.is_empty() {
            file.records
                .into_iter()
                .map(|(label, addr)| (normalize_label(&label), addr))
                .collect()
        } else {
            args.records
                .iter()
                .map(|r| parse_record_flag(r))
                .collect::<Result<_, _>>()?
        };
        let self_records = if args.self_records.is_empty() {
            file.self_records
        } else {
            args.self_records
        };

        Ok(DnsConfig {
            domain: normalize_domain(&domain),
            bind_addr: SocketAddr::new(bind, port),
            ttl: args.ttl.or(file.ttl).unwrap_or(DEFAULT_TTL),
            records,
            self_records: self_records.iter().map(|l| normalize_label(l)).collect(),
            self_addr: args.self_addr.or(file.self_addr),
        })
    }
}

/// Settings of the virtual-host web server.
#[serde_as]
#[derive(Serialize, Debug, Clone)]
pub struct WebConfig {
    /// Base domain, lower case, without a trailing `.`.
    pub domain: String,
    pub listen: String,
    pub web_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Certificate allow-list, fully qualified.
    pub hosts: Vec<String>,
    pub rate_limit: NonZeroU32,
    /// Fully qualified default host, if the fallback is enabled.
    pub default_host: Option<String>,
    pub acme_contact: Vec<String>,
    pub acme_staging: bool,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
}

impl WebConfig {
    /// Merge command line flags over config file values. Flags win; repeated flags replace the
    /// file's list when given at all.
    pub fn from_sources(args: WebArgs, file: WebSection) -> Result<Self, Error> {
        let domain = args
            .domain
            .or(file.domain)
            .ok_or(Error::MissingSetting("domain"))?;
        let domain = normalize_domain(&domain).trim_end_matches('.').to_string();
        let web_dir = args
            .web_dir
            .or(file.web_dir)
            .ok_or(Error::MissingSetting("web-dir"))?;
        let cache_dir = args
            .cache_dir
            .or(file.cache_dir)
            .ok_or(Error::MissingSetting("cache-dir"))?;
        let rate_limit = args
            .rate_limit
            .or(file.rate_limit)
            .unwrap_or(DEFAULT_RATE_LIMIT);
        let rate_limit = NonZeroU32::new(rate_limit).ok_or(Error::InvalidSetting {
            name: "rate-limit",
            value: rate_limit.to_string(),
        })?;
        let hosts = if args.hosts.is_empty() {
            file.hosts
        } else {
            args.hosts
        };
        let acme_contact = if args.acme_contact.is_empty() {
            file.acme_contact
        } else {
            args.acme_contact
        };

        Ok(WebConfig {
            listen: args
                .listen
                .or(file.listen)
                .unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            web_dir,
            cache_dir,
            hosts: hosts.iter().map(|h| qualify(h, &domain)).collect(),
            rate_limit,
            default_host: args
                .default_host
                .or(file.default_host)
                .map(|h| qualify(&h, &domain)),
            acme_contact,
            acme_staging: args.acme_staging || file.acme_staging.unwrap_or(false),
            timeout: args
                .timeout
                .map(Duration::from_secs)
                .or(file.timeout)
                .unwrap_or(DEFAULT_TIMEOUT),
            domain,
        })
    }

    /// Qualify a host name with this config's domain.
    #[must_use]
    pub fn qualify(&self, host: &str) -> String {
        qualify(host, &self.domain)
    }

    /// Resolve [`WebConfig::listen`] to a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, Error> {
        self.listen
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| Error::InvalidListenAddr(self.listen.clone()))
    }
}

/// Append `domain` to `host` unless it is the domain itself or already one of its subdomains.
#[must_use]
pub fn qualify(host: &str, domain: &str) -> String {
    let host = normalize_label(host);
    if host == domain || host.ends_with(&format!(".{domain}")) {
        host
    } else {
        format!("{host}.{domain}")
    }
}

fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_ascii_lowercase();
    if domain.ends_with('.') {
        domain
    } else {
        format!("{domain}.")
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn parse_record_flag(flag: &str) -> Result<(String, String), Error> {
    match flag.split_once(':') {
        Some((label, addr)) if !label.is_empty() => {
            Ok((normalize_label(label), addr.trim().to_string()))
        }
        _ => Err(Error::InvalidSetting {
            name: "record",
            value: flag.to_string(),
        }),
    }
}
