use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use crate::models::ErrorBody;

// Why an upstream lookup produced no heights
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("geoid heights section not found in upstream page")]
    MissingSection,
    #[error("{0} value not found in upstream page")]
    MissingModel(&'static str),
    #[error("{0} value {1:?} is not a number")]
    InvalidNumber(&'static str, String),
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("rate limit of {limit} requests per {window:?} exceeded")]
    RateLimited {
        limit: u32,
        window: Duration,
        retry_after: Duration,
    },
    #[error("invalid coordinates")]
    InvalidCoordinates,
    #[error(transparent)]
    Upstream(#[from] FetchError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::RateLimited {
                limit,
                window,
                retry_after,
            } => {
                let body = ErrorBody {
                    error: format!(
                        "429 Too Many Requests, only {} requests per every {} seconds allowed",
                        limit,
                        window.as_secs()
                    ),
                    limit: Some(limit),
                };
                // round up so clients never retry a little too early
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                let mut res = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                res.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
                res
            }
            AppError::InvalidCoordinates => error_response(StatusCode::BAD_REQUEST, "Invalid coordinates"),
            AppError::Upstream(e) => {
                // Log the real cause, the client only learns that the lookup failed
                tracing::error!("Elevation lookup failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve elevation data")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: message.to_string(),
        limit: None,
    };
    (status, Json(body)).into_response()
}
