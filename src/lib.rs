//! bekind
//!
//! A small personal edge service for a single domain:
//!
//! * a [DNS responder][dns] answering `A` questions from fixed records, or with the caller's own
//!   IP address, or with fresh random [ids].
//! * a [virtual-host web server][web] routing requests by `Host` header, with automatic TLS
//!   certificates for an allow-list of host names and a global rate limit.
//!
//! Both are started from the command line, `bekind dns ...` and `bekind web ...`. Settings can
//! also be given in a JSON [config file][config::FileConfig].
//!
#![warn(clippy::pedantic)]

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod external_ip;
pub mod hosts;
pub mod ids;
pub mod shows;
pub mod web;

pub use config::{DnsConfig, SharedDnsConfig, SharedWebConfig, WebConfig};
pub use dns::DnsServer;
pub use web::Web;
