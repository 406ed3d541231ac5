use crate::config::{SharedWebConfig, WebConfig, HTTP_PORT};
use crate::error::Error;
use crate::web::dispatch::{
    allow_listed, rate_limit, rate_limiter, request_host, Dispatcher, SharedAllowList,
};
use crate::web::registry::{HostRegistry, RouteSetup};
use crate::web::tls::CertificateManager;
use crate::web::web_error::panic_response;
use axum::body::Body;
use axum::http::header::LOCATION;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn, Level};

/// How long in-flight requests get to finish once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The virtual-host web server.
pub struct Web {
    config: SharedWebConfig,
    registry: HostRegistry,
}

impl Web {
    /// Check the startup preconditions: the certificate cache directory must be a writable
    /// directory and the web root a readable one.
    pub fn new(config: WebConfig) -> Result<Self, Error> {
        writable_dir(&config.cache_dir)?;
        readable_dir(&config.web_dir)?;
        Ok(Web {
            config: Arc::new(config),
            registry: HostRegistry::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SharedWebConfig {
        &self.config
    }

    pub fn setup_routes(&mut self, bindings: impl IntoIterator<Item = RouteSetup>) {
        self.registry.setup_routes(bindings);
    }

    /// Assemble the application: shared routes first, every other request dispatched by host.
    /// `tls` restricts every route to the certificate allow-list.
    #[must_use]
    pub fn into_router(self, tls: bool) -> Router {
        let config = self.config;
        let (shared, hosts) = self.registry.into_routers();
        let mut names: Vec<String> = hosts.keys().cloned().collect();
        names.sort();
        let dispatcher = Dispatcher::new(hosts, config.default_host.clone());
        let app = shared.fallback(move |req: Request<Body>| async move {
            dispatcher.dispatch(req).await
        });

        let app = if tls {
            let allowed: SharedAllowList = Arc::new(config.hosts.iter().cloned().collect());
            for name in names.iter().filter(|name| !allowed.contains(*name)) {
                warn!(host = %name, "host has routes but is not on the certificate allow-list");
            }
            app.layer(middleware::from_fn_with_state(allowed, allow_listed))
        } else {
            app
        };

        app.layer(middleware::from_fn_with_state(
            rate_limiter(config.rate_limit),
            rate_limit,
        ))
        .layer(TimeoutLayer::new(config.timeout))
        .layer(access_log())
        .layer(CatchPanicLayer::custom(panic_response))
    }

    /// Serve until `shutdown` is cancelled. On a loopback address plain HTTP is served.
    /// Otherwise HTTPS, with certificates from the [`CertificateManager`], plus a plaintext
    /// listener redirecting to HTTPS.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), Error> {
        let config = self.config.clone();
        let addr = config.listen_addr()?;
        let on_localhost = addr.ip().is_loopback();
        info!(addr = %addr, localhost = on_localhost, "web server starting");

        let res = if on_localhost {
            serve_plain(self.into_router(false), addr, shutdown).await
        } else {
            let acceptor = CertificateManager::new(&config).acceptor(shutdown.clone());
            tokio::spawn(redirect_to_https(
                SocketAddr::new(addr.ip(), HTTP_PORT),
                shutdown.clone(),
            ));
            serve_tls(self.into_router(true), addr, acceptor, shutdown).await
        };
        match &res {
            Ok(()) => info!("web server stopped"),
            Err(err) => error!(error = %err, "web server failed"),
        }
        res
    }
}

async fn serve_plain(app: Router, addr: SocketAddr, shutdown: CancellationToken) -> Result<(), Error> {
    axum::Server::try_bind(&addr)?
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn serve_tls(
    app: Router,
    addr: SocketAddr,
    acceptor: rustls_acme::axum::AxumAcceptor,
    shutdown: CancellationToken,
) -> Result<(), Error> {
    let handle = axum_server::Handle::new();
    let drain = handle.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
    });
    axum_server::bind(addr)
        .acceptor(acceptor)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;
    Ok(())
}

/// Plaintext listener whose only job is redirecting to HTTPS. Its failure is logged and leaves
/// the primary listener alone.
async fn redirect_to_https(addr: SocketAddr, shutdown: CancellationToken) {
    info!(addr = %addr, "redirect listener starting");
    if let Err(err) = serve_plain(redirect_router(), addr, shutdown).await {
        error!(addr = %addr, error = %err, "redirect listener failed");
    }
}

#[must_use]
pub fn redirect_router() -> Router {
    Router::new()
        .fallback(|req: Request<Body>| async move { https_redirect(&req) })
        .layer(access_log())
}

/// One `INFO` span and event per request, under the `tower_http::trace` target.
fn access_log() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

fn https_redirect(req: &Request<Body>) -> Response {
    let Some(host) = request_host(req) else {
        return (StatusCode::BAD_REQUEST, "missing host").into_response();
    };
    let path = req.uri().path_and_query().map_or("/", |pq| pq.as_str());
    let location = format!("https://{host}{path}");
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
}

fn writable_dir(path: &Path) -> Result<(), Error> {
    let meta = std::fs::metadata(path)
        .map_err(|err| Error::Inaccessible(path.to_path_buf(), err.to_string()))?;
    if !meta.is_dir() {
        return Err(Error::Inaccessible(path.to_path_buf(), "not a directory".into()));
    }
    tempfile::NamedTempFile::new_in(path)
        .map(drop)
        .map_err(|err| Error::Inaccessible(path.to_path_buf(), format!("not writable: {err}")))
}

fn readable_dir(path: &Path) -> Result<(), Error> {
    std::fs::read_dir(path)
        .map(|_| ())
        .map_err(|err| Error::Inaccessible(path.to_path_buf(), err.to_string()))
}
