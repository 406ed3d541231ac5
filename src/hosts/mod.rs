//! The virtual hosts served by default.
//!
//! | host    | serves |
//! |---------|--------|
//! | `id`    | `GET /` a random 20 symbol [id][crate::ids], `GET /:length` one of `length` symbols |
//! | `ip`    | `GET /` the caller's IP address |
//! | `echo`  | `GET /` the request as received |
//! | `pace`  | static site, index `pace.html` |
//! | `md`    | static site, index `md.html` |
//! | `www`   | static site, index `index.html`, and the [show archive][crate::shows] at `/zifim` |
//!
//! Host names are qualified with the web domain, e.g. `id.example.com`.

pub mod echo;
pub mod id;
pub mod ip;
pub mod statics;

use crate::config::WebConfig;
use crate::shows::{self, ShowList, ShowSource};
use crate::web::RouteSetup;

#[must_use]
pub fn bindings(config: &WebConfig, shows: ShowList, source: ShowSource) -> Vec<RouteSetup> {
    let web_dir = &config.web_dir;
    vec![
        RouteSetup::new(config.qualify("id"), "", id::routes),
        RouteSetup::new(config.qualify("ip"), "", ip::routes),
        RouteSetup::new(config.qualify("echo"), "", echo::routes),
        RouteSetup::new(config.qualify("pace"), "", statics::site(web_dir, "pace.html")),
        RouteSetup::new(config.qualify("md"), "", statics::site(web_dir, "md.html")),
        RouteSetup::new(config.qualify("www"), "", statics::site(web_dir, "index.html")),
        RouteSetup::new(config.qualify("www"), "/zifim", move |router| {
            shows::routes(router, shows, source)
        }),
    ]
}
