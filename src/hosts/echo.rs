use crate::web::web_error::WebError;
use axum::body::Body;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use std::fmt::Write;

pub fn routes(router: Router) -> Router {
    router.route("/", get(dump))
}

/// Echo the request back as text: request line, headers and body.
async fn dump(req: Request<Body>) -> Result<String, WebError> {
    let (parts, body) = req.into_parts();
    let body = hyper::body::to_bytes(body).await?;
    let mut out = String::new();
    write!(out, "{} {} {:?}\r\n", parts.method, parts.uri, parts.version)?;
    for (name, value) in &parts.headers {
        write!(out, "{name}: {}\r\n", String::from_utf8_lossy(value.as_bytes()))?;
    }
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(&body));
    Ok(out)
}
