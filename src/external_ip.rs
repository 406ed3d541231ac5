//! Discovery of the server's own public address.
//!
//! The address is read once at startup from the cloud instance metadata service. When that
//! isn't reachable (e.g. not running on a cloud instance) the operator supplied address is used.

use crate::error::Error;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{info, warn};

const METADATA_URL: &str =
    "http://metadata/computeMetadata/v1/instance/network-interfaces/0/access-configs/0/external-ip";
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Ask the instance metadata service for the external IP.
///
/// # Errors
///
/// Returns [`Error::HTTPClient`] if the metadata service can't be reached, and
/// [`Error::ExternalIP`] if its answer isn't an IP address.
pub async fn external_ip() -> Result<IpAddr, Error> {
    let client = reqwest::Client::builder()
        .timeout(METADATA_TIMEOUT)
        .build()?;
    let body = client
        .get(METADATA_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    parse_ip(&body)
}

/// Resolve the address self records should point at: the discovered external IP, falling back
/// to `fallback`.
pub async fn self_addr(fallback: Option<IpAddr>) -> Option<IpAddr> {
    let addr = match external_ip().await {
        Ok(ip) => Some(ip),
        Err(err) => {
            warn!(error = %err, "external IP lookup failed");
            fallback
        }
    };
    if let Some(ip) = addr {
        info!(self_addr = %ip, "resolved self address");
    }
    addr
}

fn parse_ip(body: &str) -> Result<IpAddr, Error> {
    body.trim()
        .parse()
        .map_err(|_| Error::ExternalIP(body.to_string()))
}
