//! Automatic certificates for the allow-listed host names.
//!
//! Certificates are issued and renewed over ACME (TLS-ALPN-01) and cached in the configured
//! cache directory, so restarts don't trigger issuance again. The handshake resolver only hands
//! out certificates for names on the allow-list. Handshakes for any other server name fail,
//! whatever hosts have routes registered.

use crate::config::WebConfig;
use futures::StreamExt;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use rustls_acme::axum::AxumAcceptor;
use rustls_acme::caches::DirCache;
use rustls_acme::{AcmeConfig, AcmeState};
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Gates certificate resolution on the allow-list before delegating to the ACME resolver.
pub struct AllowListResolver {
    allowed: Arc<HashSet<String>>,
    inner: Arc<dyn ResolvesServerCert>,
}

impl AllowListResolver {
    pub fn new(allowed: Arc<HashSet<String>>, inner: Arc<dyn ResolvesServerCert>) -> Self {
        AllowListResolver { allowed, inner }
    }

    #[must_use]
    pub fn permits(&self, server_name: Option<&str>) -> bool {
        permits(&self.allowed, server_name)
    }
}

impl ResolvesServerCert for AllowListResolver {
    fn resolve(&self, client_hello: ClientHello) -> Option<Arc<CertifiedKey>> {
        let server_name = client_hello.server_name();
        if !self.permits(server_name) {
            warn!(sni = ?server_name, "handshake for a host outside the allow-list");
            return None;
        }
        self.inner.resolve(client_hello)
    }
}

fn permits(allowed: &HashSet<String>, server_name: Option<&str>) -> bool {
    server_name.map_or(false, |name| {
        allowed.contains(name.trim_end_matches('.').to_ascii_lowercase().as_str())
    })
}

pub struct CertificateManager {
    allowed: Arc<HashSet<String>>,
    cache_dir: PathBuf,
    contact: Vec<String>,
    production: bool,
}

impl CertificateManager {
    #[must_use]
    pub fn new(config: &WebConfig) -> Self {
        CertificateManager {
            allowed: Arc::new(config.hosts.iter().cloned().collect()),
            cache_dir: config.cache_dir.clone(),
            contact: config
                .acme_contact
                .iter()
                .map(|c| format!("mailto:{c}"))
                .collect(),
            production: !config.acme_staging,
        }
    }

    #[must_use]
    pub fn allow_list(&self) -> &HashSet<String> {
        &self.allowed
    }

    /// Build the TLS acceptor and spawn the task driving issuance and renewal. The task stops
    /// when `shutdown` is cancelled.
    #[must_use]
    pub fn acceptor(&self, shutdown: CancellationToken) -> AxumAcceptor {
        let mut domains: Vec<&String> = self.allowed.iter().collect();
        domains.sort();
        info!(domains = ?domains, production = self.production, "starting certificate manager");

        let state = AcmeConfig::new(domains)
            .contact(self.contact.iter())
            .cache(DirCache::new(self.cache_dir.clone()))
            .directory_lets_encrypt(self.production)
            .state();

        let resolver = AllowListResolver::new(self.allowed.clone(), state.resolver());
        let mut rustls_config = ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_cert_resolver(Arc::new(resolver));
        rustls_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        let acceptor = state.axum_acceptor(Arc::new(rustls_config));

        tokio::spawn(drive(state, shutdown));
        acceptor
    }
}

async fn drive(mut state: AcmeState<io::Error, io::Error>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            event = state.next() => match event {
                Some(Ok(ok)) => info!(event = ?ok, "certificate manager"),
                Some(Err(err)) => error!(error = ?err, "certificate manager"),
                None => return,
            },
            () = shutdown.cancelled() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_allow_listed_names() {
        let allowed: HashSet<String> = ["www.example.com".to_string()].into();
        assert!(permits(&allowed, Some("www.example.com")));
        assert!(permits(&allowed, Some("WWW.Example.com.")));
        assert!(!permits(&allowed, Some("evil.example.com")));
        assert!(!permits(&allowed, None));
    }
}
