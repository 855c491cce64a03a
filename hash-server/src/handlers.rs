//! HTTP routes and their handlers.

use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use tokio::time::sleep;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::{app::AppState, digest, stats::Statistics};

const TRANSFER_ENCODING_HEADER: &str = "content-transfer-encoding";
const SHUTDOWN_ACK: &str = "200 - Shutting down\n";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hash", any(hash))
        .route("/stats", get(stats))
        .route("/shutdown", any(shutdown))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler-local failures. Each one still produces a complete response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Hashing requested while draining or stopped.
    Unavailable,
    /// Statistics requested while draining or stopped.
    StatsUnavailable,
    WrongMethod,
    SecretTooLong { max: usize },
    MalformedForm,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::StatsUnavailable => StatusCode::FORBIDDEN,
            ApiError::WrongMethod | ApiError::SecretTooLong { .. } | ApiError::MalformedForm => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unavailable => "503 - Server is shutting down\n".to_string(),
            ApiError::StatsUnavailable => {
                "403 - Cannot process stats - server shutting down\n".to_string()
            }
            ApiError::WrongMethod => "400 - Request method must be 'POST'\n".to_string(),
            ApiError::SecretTooLong { max } => {
                format!("400 - Password must be <= {max} characters\n")
            }
            ApiError::MalformedForm => "400 - Request body must be a url-encoded form\n".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}

const PASSWORD_FIELD: &str = "password";

/// First `password` value of a url-encoded form body.
///
/// A missing field is the empty secret. Bodies that are not UTF-8 are rejected.
fn password_field(body: &[u8]) -> Result<String, ApiError> {
    let text = std::str::from_utf8(body).map_err(|_| ApiError::MalformedForm)?;
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(text).map_err(|_| ApiError::MalformedForm)?;
    Ok(pairs
        .into_iter()
        .find(|(key, _)| key == PASSWORD_FIELD)
        .map(|(_, value)| value)
        .unwrap_or_default())
}

/// `POST /hash`: delayed SHA-512 of the `password` form field.
///
/// Only requests that produce a digest are folded into the statistics.
async fn hash(
    State(app): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let _guard = app.admit().map_err(|state| {
        debug!(%state, "rejecting hash request");
        ApiError::Unavailable
    })?;

    if method != Method::POST {
        return Err(ApiError::WrongMethod);
    }

    let password = password_field(&body)?;
    let max = app.settings.max_secret_len;
    if password.chars().count() > max {
        return Err(ApiError::SecretTooLong { max });
    }

    sleep(app.settings.sample_delay()).await;

    let body = format!("\"{}\"", digest::hash_secret(&password));
    let response = ([(TRANSFER_ENCODING_HEADER, "BASE64")], body).into_response();

    app.stats.record_duration(started.elapsed());
    Ok(response)
}

/// `GET /stats`: request count and folding average latency as JSON.
async fn stats(State(app): State<AppState>) -> Result<Json<Statistics>, ApiError> {
    let _guard = app.admit().map_err(|state| {
        debug!(%state, "rejecting stats request");
        ApiError::StatsUnavailable
    })?;

    sleep(app.settings.sample_delay()).await;
    Ok(Json(app.stats.snapshot()))
}

/// `/shutdown`: acknowledges at once; the drain continues in the background.
async fn shutdown(State(app): State<AppState>) -> &'static str {
    app.request_shutdown();
    SHUTDOWN_ACK
}
