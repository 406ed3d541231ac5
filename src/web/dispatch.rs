use crate::error::Error;
use crate::web::web_error::WebError;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::HOST;
use axum::http::uri::Authority;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Router;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use tower::ServiceExt;
use tracing::{debug, warn};

pub type SharedRateLimiter = Arc<DefaultDirectRateLimiter>;
pub type SharedAllowList = Arc<HashSet<String>>;

/// Where a request for some host name ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// The host has its own entry.
    Exact(&'a str),
    /// The host has no entry and the default host serves it.
    Default(&'a str),
    NotFound,
}

/// Routes requests to the virtual host named by their `Host` header.
#[derive(Clone)]
pub struct Dispatcher {
    // Router isn't Sync, each request serves a clone taken under the lock.
    hosts: Arc<HashMap<String, Mutex<Router>>>,
    default_host: Option<String>,
}

impl Dispatcher {
    /// `default_host` enables the fallback for unregistered hosts.
    #[must_use]
    pub fn new(hosts: HashMap<String, Router>, default_host: Option<String>) -> Self {
        Dispatcher {
            hosts: Arc::new(
                hosts
                    .into_iter()
                    .map(|(name, router)| (name, Mutex::new(router)))
                    .collect(),
            ),
            default_host,
        }
    }

    #[must_use]
    pub fn select<'a>(&'a self, host: &'a str) -> Target<'a> {
        if self.hosts.contains_key(host) {
            return Target::Exact(host);
        }
        match &self.default_host {
            Some(default) if self.hosts.contains_key(default) => Target::Default(default),
            _ => Target::NotFound,
        }
    }

    /// The router serving `host`, if any.
    #[must_use]
    pub fn router(&self, host: &str) -> Option<Router> {
        let name = match self.select(host) {
            Target::Exact(name) => {
                debug!(host = %name, "dispatching");
                name
            }
            Target::Default(name) => {
                warn!(host = %host, default = %name, "using default host");
                name
            }
            Target::NotFound => {
                warn!(host = %host, "host not found");
                return None;
            }
        };
        let router = self.hosts.get(name)?;
        let router = router.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Some(router)
    }

    pub async fn dispatch(&self, req: Request<Body>) -> Response {
        let host = request_host(&req).unwrap_or_default();
        let Some(router) = self.router(&host) else {
            return WebError::from(Error::HostNotFound(host)).into_response();
        };
        match router.oneshot(req).await {
            Ok(res) => res,
            Err(never) => match never {},
        }
    }
}

/// The host a request is for, lower case, without port: the `Host` header, or the authority
/// of the request URI when there's no header (HTTP/2).
#[must_use]
pub fn request_host<B>(req: &Request<B>) -> Option<String> {
    let authority = match req.headers().get(HOST) {
        Some(value) => value.to_str().ok()?.parse::<Authority>().ok()?,
        None => req.uri().authority()?.clone(),
    };
    let host = authority.host().trim_end_matches('.').to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}

/// Answer 404 for hosts outside the certificate allow-list, before any route, shared ones
/// included, sees the request.
pub async fn allow_listed<B>(
    State(allowed): State<SharedAllowList>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    let host = request_host(&req).unwrap_or_default();
    if !allowed.contains(&host) {
        warn!(host = %host, "host is not on the allow-list");
        return WebError::from(Error::HostNotFound(host)).into_response();
    }
    next.run(req).await
}

#[must_use]
pub fn rate_limiter(per_second: NonZeroU32) -> SharedRateLimiter {
    Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
}

/// Reject requests over the global ceiling. Nothing is queued.
pub async fn rate_limit<B>(
    State(limiter): State<SharedRateLimiter>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    if limiter.check().is_err() {
        warn!(uri = %req.uri(), "rate limit exceeded");
        return WebError::from(Error::RateLimited).into_response();
    }
    next.run(req).await
}
