//! Virtual-host web server.
//!
//! Requests are routed by their `Host` header to the routes bound to that host with
//! [`RouteSetup`]. Routes bound with an empty host are shared by every host and take precedence.
//!
//! Every request passes, in order, through panic recovery, access logging, a request timeout
//! and a global rate limiter. Requests over the configured requests-per-second ceiling get a
//! `429 Too Many Requests` and never reach a handler.
//!
//! # Host resolution
//!
//! * A host with registered routes is served by them.
//! * Any other host is served by the `--default-host`, when one is configured and registered.
//!   Each fallback is logged.
//! * Otherwise the response is `404 Not Found`.
//!
//! When serving HTTPS, hosts outside the certificate allow-list (`--host`) always get a 404.
//!
//! # Listening
//!
//! On a loopback listen address plain HTTP is served, for local development. On any other
//! address HTTPS is served with certificates [issued automatically][tls], and a second listener
//! on port 80 redirects every request to its HTTPS equivalent.

pub mod dispatch;
pub mod registry;
pub mod server;
pub mod tls;
pub(crate) mod web_error;

pub use dispatch::Dispatcher;
pub use registry::{HostRegistry, RouteSetup};
pub use server::Web;
