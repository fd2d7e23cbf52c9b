use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use serde_json::json;

/// Request-level failures. Everything else (contact loading during fan-out,
/// per-recipient delivery) is logged and never reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{context}")]
    Storage {
        context: &'static str,
        #[source]
        source: DbErr,
    },
}

impl AppError {
    /// Adapter for `map_err`: `store.find_alert(id).await.map_err(AppError::storage("..."))`.
    pub fn storage(context: &'static str) -> impl FnOnce(DbErr) -> AppError {
        move |source| AppError::Storage { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let span = tracing::Span::current();
        if let AppError::Storage { context, source } = &self {
            // Driver detail stays in the logs.
            tracing::error!(error = %source, "{}", context);
            span.record("error", tracing::field::display(source));
        } else {
            span.record("error", tracing::field::display(&self));
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
