//! Error types.

use std::net::Ipv6Addr;
use std::path::PathBuf;
use trust_dns_proto::error::ProtoError;

/// Error enumerates the possible bekind error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a fixed record's configured address could not be parsed. The record is kept
    /// in the [`RecordStore`][crate::dns::records::RecordStore] so that a query for it fails
    /// visibly instead of being skipped.
    #[error("record \"{label}\" has an invalid address: {raw:?}")]
    InvalidAddress { label: String, raw: String },

    /// Returned when a fixed record holds an IPv6 address and an `A` answer was requested.
    #[error("record \"{0}\" has IPv6 address {1}, which can't be served as an A record")]
    NotIPv4(String, Ipv6Addr),

    /// Returned by [`ids::generator`][crate::ids::generator] for lengths outside
    /// [`ids::MIN_LENGTH`][crate::ids::MIN_LENGTH]..=[`ids::MAX_LENGTH`][crate::ids::MAX_LENGTH].
    #[error("invalid id length {0}")]
    InvalidIdLength(usize),

    /// Returned at startup when the web root or certificate cache directory is missing or lacks
    /// the required permissions.
    #[error("directory {0} is not accessible: {1}")]
    Inaccessible(PathBuf, String),

    /// Returned when a required setting was given neither as a flag nor in the config file.
    #[error("missing required setting \"{0}\"")]
    MissingSetting(&'static str),

    /// Returned when a setting's value is malformed or out of range.
    #[error("invalid value for \"{name}\": {value:?}")]
    InvalidSetting { name: &'static str, value: String },

    /// Returned when the web listen address can't be resolved to a socket address.
    #[error("invalid listen address \"{0}\"")]
    InvalidListenAddr(String),

    /// Returned when a request names a host with no registered entry and no usable default.
    #[error("host \"{0}\" not found")]
    HostNotFound(String),

    /// Returned when a show date isn't of the form `yy-mm-dd`.
    #[error("invalid show date {0:?}")]
    InvalidShowDate(String),

    /// Returned when a show's track list couldn't be fetched.
    #[error("show {0:?} is unavailable")]
    ShowUnavailable(String),

    /// Returned when the global request rate ceiling has been reached.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Returned when the external IP metadata lookup answers with something that isn't an IP.
    #[error("external IP lookup returned {0:?}")]
    ExternalIP(String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when reading JSON from disk fails due to invalid content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),

    /// Returned when the plain HTTP listener fails.
    #[error("HTTP server error")]
    HTTPServer(#[from] hyper::Error),

    /// Returned when an outbound HTTP request fails.
    #[error("HTTP client error")]
    HTTPClient(#[from] reqwest::Error),
}
