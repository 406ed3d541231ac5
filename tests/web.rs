use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::header::LOCATION;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use bekind::cli::WebArgs;
use bekind::config::WebSection;
use bekind::hosts;
use bekind::shows::{self, ShowSource};
use bekind::web::server::redirect_router;
use bekind::web::RouteSetup;
use bekind::{Web, WebConfig};

async fn explode() -> &'static str {
    panic!("boom")
}

struct Fixture {
    web: Web,
    _web_dir: TempDir,
    _cache_dir: TempDir,
}

fn fixture(args: WebArgs) -> Fixture {
    let web_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    std::fs::write(web_dir.path().join("index.html"), "www home").unwrap();
    std::fs::write(web_dir.path().join("pace.html"), "pace home").unwrap();

    let config = WebConfig::from_sources(
        WebArgs {
            domain: Some("example.com".into()),
            listen: Some("127.0.0.1:0".into()),
            web_dir: Some(web_dir.path().to_path_buf()),
            cache_dir: Some(cache_dir.path().to_path_buf()),
            ..args
        },
        WebSection::default(),
    )
    .unwrap();
    let mut web = Web::new(config).unwrap();

    let (_publisher, show_list) = shows::channel();
    let source = ShowSource::with_urls("http://127.0.0.1:1/tree", "http://127.0.0.1:1").unwrap();
    let bindings = hosts::bindings(web.config(), show_list, source);
    web.setup_routes(bindings);
    web.setup_routes([
        RouteSetup::new("a.example.com", "", |router: Router| {
            router.route("/", get(|| async { "a" }))
        }),
        RouteSetup::new("boom.example.com", "", |router: Router| {
            router.route("/", get(explode))
        }),
    ]);

    Fixture {
        web,
        _web_dir: web_dir,
        _cache_dir: cache_dir,
    }
}

fn app(web: Web, tls: bool) -> Router {
    let peer: SocketAddr = "198.51.100.9:40000".parse().unwrap();
    web.into_router(tls).layer(MockConnectInfo(peer))
}

async fn get_host(app: &Router, host: &str, uri: &str) -> Response {
    let req = Request::builder()
        .uri(uri)
        .header("host", host)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

async fn body(res: Response) -> String {
    let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn dispatches_by_host() {
    let f = fixture(WebArgs::default());
    let app = app(f.web, false);

    let res = get_host(&app, "a.example.com", "/").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, "a");

    // port and case don't matter
    let res = get_host(&app, "A.Example.com:8443", "/").await;
    assert_eq!(body(res).await, "a");

    let res = get_host(&app, "www.example.com", "/").await;
    assert_eq!(body(res).await, "www home");
}

#[tokio::test]
async fn unknown_host_is_not_found() {
    let f = fixture(WebArgs::default());
    let app = app(f.web, false);

    let res = get_host(&app, "nope.example.com", "/").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_host_uses_default_host() {
    let f = fixture(WebArgs {
        default_host: Some("www".into()),
        ..WebArgs::default()
    });
    let app = app(f.web, false);

    let res = get_host(&app, "nope.example.com", "/").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, "www home");
}

#[tokio::test]
async fn rate_limit_rejects_excess() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut f = fixture(WebArgs {
        rate_limit: Some(1),
        ..WebArgs::default()
    });
    let counter = hits.clone();
    f.web.setup_routes([RouteSetup::new("count.example.com", "", move |router: Router| {
        router.route(
            "/",
            get(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "counted"
            }),
        )
    })]);
    let app = app(f.web, false);

    let first = get_host(&app, "count.example.com", "/").await;
    assert_eq!(first.status(), StatusCode::OK);
    let second = get_host(&app, "count.example.com", "/").await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panics_become_500() {
    let f = fixture(WebArgs::default());
    let app = app(f.web, false);

    let res = get_host(&app, "boom.example.com", "/").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // the server keeps serving
    let res = get_host(&app, "a.example.com", "/").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn repeated_setup_is_idempotent() {
    let mut f = fixture(WebArgs::default());
    f.web.setup_routes([RouteSetup::new("a.example.com", "", |router: Router| {
        router.route("/other", get(|| async { "other" }))
    })]);
    let app = app(f.web, false);

    // the first binding of a.example.com at "/" stays, the second one is skipped
    assert_eq!(body(get_host(&app, "a.example.com", "/").await).await, "a");
    let res = get_host(&app, "a.example.com", "/other").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn global_routes_serve_every_host() {
    let mut f = fixture(WebArgs::default());
    f.web.setup_routes([RouteSetup::global("", |router: Router| {
        router.route("/health", get(|| async { "ok" }))
    })]);
    let app = app(f.web, false);

    for host in ["a.example.com", "nope.example.com"] {
        let res = get_host(&app, host, "/health").await;
        assert_eq!(res.status(), StatusCode::OK, "{host}");
        assert_eq!(body(res).await, "ok");
    }
}

#[tokio::test]
async fn id_host() {
    let f = fixture(WebArgs::default());
    let app = app(f.web, false);

    let id = body(get_host(&app, "id.example.com", "/").await).await;
    assert_eq!(id.len(), hosts::id::DEFAULT_LENGTH + 1);
    assert!(id.ends_with('\n'));

    let id = body(get_host(&app, "id.example.com", "/7").await).await;
    assert_eq!(id.trim_end().len(), 7);

    let res = get_host(&app, "id.example.com", "/1").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let res = get_host(&app, "id.example.com", "/many").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ip_host() {
    let f = fixture(WebArgs::default());
    let app = app(f.web, false);

    let res = get_host(&app, "ip.example.com", "/").await;
    assert_eq!(body(res).await.trim_end(), "198.51.100.9");

    let req = Request::builder()
        .uri("/")
        .header("host", "ip.example.com")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(body(res).await.trim_end(), "203.0.113.7");
}

#[tokio::test]
async fn echo_host() {
    let f = fixture(WebArgs::default());
    let app = app(f.web, false);

    let req = Request::builder()
        .uri("/?x=1")
        .header("host", "echo.example.com")
        .body(Body::from("hello"))
        .unwrap();
    let text = body(app.oneshot(req).await.unwrap()).await;
    assert!(text.starts_with("GET /?x=1 HTTP/1.1\r\n"), "{text}");
    assert!(text.contains("host: echo.example.com\r\n"), "{text}");
    assert!(text.ends_with("\r\n\r\nhello"), "{text}");
}

#[tokio::test]
async fn show_routes() {
    let f = fixture(WebArgs::default());
    let app = app(f.web, false);

    let res = get_host(&app, "www.example.com", "/zifim/shows").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, "[]");

    let res = get_host(&app, "www.example.com", "/zifim/show/not-a-date").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tls_dispatch_honors_allow_list() {
    let mut f = fixture(WebArgs {
        hosts: vec!["www".into()],
        default_host: Some("www".into()),
        ..WebArgs::default()
    });
    f.web.setup_routes([RouteSetup::global("", |router: Router| {
        router.route("/health", get(|| async { "ok" }))
    })]);
    let app = app(f.web, true);

    let res = get_host(&app, "www.example.com", "/").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = get_host(&app, "www.example.com", "/health").await;
    assert_eq!(res.status(), StatusCode::OK);

    // registered, but no certificate may be issued for it
    let res = get_host(&app, "a.example.com", "/").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    // the default host doesn't step in
    let res = get_host(&app, "nope.example.com", "/").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    // the apex isn't on the list either
    let res = get_host(&app, "example.com", "/").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    // shared routes are gated too
    let res = get_host(&app, "nope.example.com", "/health").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let no_host = Request::builder().uri("/").body(Body::empty()).unwrap();
    let res = app.clone().oneshot(no_host).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_host_without_tls() {
    let f = fixture(WebArgs {
        default_host: Some("www".into()),
        ..WebArgs::default()
    });
    let app = app(f.web, false);

    // no host falls back like any unknown host
    let no_host = Request::builder().uri("/").body(Body::empty()).unwrap();
    let res = app.oneshot(no_host).await.unwrap();
    assert_eq!(body(res).await, "www home");
}

#[tokio::test]
async fn redirect_listener() {
    let app = redirect_router();

    let res = get_host(&app, "www.example.com:80", "/zifim/view/latest?x=1").await;
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        res.headers()[LOCATION],
        "https://www.example.com/zifim/view/latest?x=1"
    );

    let res = get_host(&app, "Example.com", "/").await;
    assert_eq!(res.headers()[LOCATION], "https://example.com/");

    let no_host = Request::builder().uri("/").body(Body::empty()).unwrap();
    let res = app.oneshot(no_host).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn missing_directories_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = WebConfig::from_sources(
        WebArgs {
            domain: Some("example.com".into()),
            web_dir: Some(dir.path().join("missing")),
            cache_dir: Some(dir.path().to_path_buf()),
            ..WebArgs::default()
        },
        WebSection::default(),
    )
    .unwrap();
    assert!(Web::new(config).is_err());
}
