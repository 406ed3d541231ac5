use crate::error::Error;
use axum::extract::rejection::PathRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::any::Any;

pub(crate) struct WebError(anyhow::Error);

impl WebError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<Error>() {
            return match err {
                Error::HostNotFound(_) => StatusCode::NOT_FOUND,
                Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                Error::InvalidIdLength(_)
                | Error::InvalidShowDate(_)
                | Error::ShowUnavailable(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        match self.0.downcast_ref::<PathRejection>() {
            Some(PathRejection::FailedToDeserializePathParams(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let any_err = self.0;
        let body = Json(json!({
            "error": format!("{any_err}"),
        }));
        (status, body).into_response()
    }
}

impl<E> From<E> for WebError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Turns a handler panic into a 500 response.
#[allow(clippy::needless_pass_by_value)]
pub(crate) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "handler panicked");
    let body = Json(json!({
        "error": "internal server error",
    }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}
