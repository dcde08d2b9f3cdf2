//! HTTP handlers

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::check::{Checker, Sources};

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Run (or reuse) a check and return it as JSON
pub async fn get_check<S: Sources>(State(checker): State<Arc<Checker<S>>>) -> Response {
    match checker.do_check().await {
        Ok(result) => Json(result.as_ref()).into_response(),
        Err(e) => {
            error!(error = %e, "Check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(format!("Check failed: {}", e))),
            )
                .into_response()
        }
    }
}

/// Same headers as GET, without running a check
pub async fn head_check() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")])
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
