use crate::error::Error;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let any_err = self.0;
        let status = match any_err.downcast_ref::<Error>() {
            Some(Error::NotReady) => StatusCode::SERVICE_UNAVAILABLE,
            Some(Error::EmptyQuery) => StatusCode::BAD_REQUEST,
            Some(Error::EmptyIndex) => StatusCode::NOT_FOUND,
            Some(Error::NotImplemented) => StatusCode::NOT_IMPLEMENTED,
            Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
            None if any_err.is::<QueryRejection>() => StatusCode::BAD_REQUEST,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {any_err:?}");
        }
        let body = Json(json!({
            "error": format!("{any_err}"),
        }));
        (status, body).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
