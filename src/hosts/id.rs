use crate::ids;
use crate::web::web_error::WebError;
use axum::extract::Path;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::WithRejection;

pub const DEFAULT_LENGTH: usize = 20;

pub fn routes(router: Router) -> Router {
    router
        .route("/", get(default_id))
        .route("/:length", get(sized_id))
}

#[allow(clippy::unused_async)]
async fn default_id() -> Result<String, WebError> {
    new_id(DEFAULT_LENGTH)
}

#[allow(clippy::unused_async)]
async fn sized_id(
    WithRejection(Path(length), _): WithRejection<Path<usize>, WebError>,
) -> Result<String, WebError> {
    new_id(length)
}

fn new_id(length: usize) -> Result<String, WebError> {
    let generate = ids::generator(length)?;
    Ok(format!("{}\n", generate()))
}
