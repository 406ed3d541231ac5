use axum::Router;
use std::collections::HashMap;
use tracing::{info, warn};

type Setup = Box<dyn FnOnce(Router) -> Router + Send>;

/// Binds a group of routes to a virtual host, or to every host when `host` is empty.
pub struct RouteSetup {
    pub host: String,
    pub prefix: String,
    setup: Setup,
}

impl RouteSetup {
    /// `setup` is handed an empty [`Router`] and returns it with its routes added. It runs once,
    /// when the binding is applied.
    pub fn new(
        host: impl Into<String>,
        prefix: impl Into<String>,
        setup: impl FnOnce(Router) -> Router + Send + 'static,
    ) -> Self {
        RouteSetup {
            host: host.into(),
            prefix: prefix.into(),
            setup: Box::new(setup),
        }
    }

    /// A binding visible on every host.
    pub fn global(
        prefix: impl Into<String>,
        setup: impl FnOnce(Router) -> Router + Send + 'static,
    ) -> Self {
        Self::new("", prefix, setup)
    }
}

/// The routes of one virtual host, and the prefixes they were bound at, in binding order.
#[derive(Default)]
pub struct HostEntry {
    router: Router,
    prefixes: Vec<String>,
}

impl HostEntry {
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Attach a group at `prefix`. Returns `false`, leaving the entry untouched, when a group is
    /// already bound at that prefix.
    fn attach(&mut self, prefix: String, setup: Setup) -> bool {
        if self.prefixes.contains(&prefix) {
            return false;
        }
        let group = setup(Router::new());
        let router = std::mem::take(&mut self.router);
        self.router = if prefix == "/" {
            router.merge(group)
        } else {
            router.nest(&prefix, group)
        };
        self.prefixes.push(prefix);
        true
    }
}

/// Virtual hosts by fully qualified name, plus the shared routes every host sees. Filled by
/// [`HostRegistry::setup_routes`] before serving, read-only afterwards.
#[derive(Default)]
pub struct HostRegistry {
    shared: HostEntry,
    hosts: HashMap<String, HostEntry>,
}

impl HostRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the bindings in order. Bindings for a host create its entry on first use. A binding
    /// repeating an already bound `(host, prefix)` pair is skipped, so applying the same
    /// bindings twice leaves the reachable routes unchanged.
    pub fn setup_routes(&mut self, bindings: impl IntoIterator<Item = RouteSetup>) {
        for binding in bindings {
            let prefix = normalize_prefix(&binding.prefix);
            let host = binding.host.trim_end_matches('.').to_ascii_lowercase();
            let entry = if host.is_empty() {
                &mut self.shared
            } else {
                self.hosts.entry(host.clone()).or_default()
            };
            if entry.attach(prefix.clone(), binding.setup) {
                info!(host = %host, prefix = %prefix, "route bound");
            } else {
                warn!(host = %host, prefix = %prefix, "duplicate route binding skipped");
            }
        }
    }

    #[must_use]
    pub fn get(&self, host: &str) -> Option<&HostEntry> {
        self.hosts.get(host)
    }

    #[must_use]
    pub fn shared(&self) -> &HostEntry {
        &self.shared
    }

    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    /// Split into the shared router and the per host routers.
    #[must_use]
    pub fn into_routers(self) -> (Router, HashMap<String, Router>) {
        let hosts = self
            .hosts
            .into_iter()
            .map(|(name, entry)| (name, entry.router))
            .collect();
        (self.shared.router, hosts)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{prefix}")
    }
}
