use axum::Router;
use std::path::Path;
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};

/// A gzip compressed static site rooted at `web_dir`, answering `/` with the `index` file.
pub fn site(web_dir: &Path, index: &str) -> impl FnOnce(Router) -> Router + Send + 'static {
    let root = web_dir.to_path_buf();
    let index = root.join(index);
    move |router: Router| {
        router
            .route_service("/", ServeFile::new(index))
            .fallback_service(ServeDir::new(root))
            .layer(CompressionLayer::new())
    }
}
