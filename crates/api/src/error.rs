use animefactory_billing::BillingError;
use animefactory_core::error::CoreError;
use animefactory_tensorart::TensorArtError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `animefactory_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A webhook that failed signature verification. 400, plain reject;
    /// the processor will not retry it as a server fault.
    #[error("Webhook Error: {0}")]
    SignatureRejected(String),

    /// An upstream (Stripe or TensorArt) call failed. The message is a fixed
    /// caller-facing label; upstream detail rides in `details` when present.
    #[error("{error}")]
    Upstream {
        error: &'static str,
        details: Option<serde_json::Value>,
    },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// A failed job submission to TensorArt.
    pub fn generation_failed(err: TensorArtError) -> Self {
        tracing::error!(error = %err, "Job submission failed");
        AppError::Upstream {
            error: "Job submission failed",
            details: tensorart_details(&err),
        }
    }

    /// A failed job status poll.
    pub fn status_check_failed(err: TensorArtError) -> Self {
        tracing::error!(error = %err, "Job status check failed");
        AppError::Upstream {
            error: "Job status check failed",
            details: tensorart_details(&err),
        }
    }

    /// A failed Stripe checkout session creation. Stripe's response body is
    /// logged but never forwarded; it can name internal price/account state.
    pub fn checkout_failed(err: BillingError) -> Self {
        tracing::error!(error = %err, "Stripe checkout failed");
        AppError::Upstream {
            error: "Stripe checkout failed",
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                    None,
                ),
                CoreError::Unauthorized(msg) => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    msg.clone(),
                    None,
                ),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                        None,
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Webhook signature rejection ---
            AppError::SignatureRejected(reason) => (
                StatusCode::BAD_REQUEST,
                "SIGNATURE_REJECTED",
                format!("Webhook Error: {reason}"),
                None,
            ),

            // --- Upstream call failures ---
            AppError::Upstream { error, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPSTREAM_ERROR",
                (*error).to_string(),
                details.clone(),
            ),

            // --- HTTP-specific errors ---
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(
    err: &sqlx::Error,
) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            None,
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}

/// Extract the upstream error payload for the `details` field, mirroring
/// what the generation API actually returned. Transport failures carry no
/// payload.
fn tensorart_details(err: &TensorArtError) -> Option<serde_json::Value> {
    match err {
        TensorArtError::Api { body, .. } => Some(
            serde_json::from_str(body)
                .unwrap_or_else(|_| serde_json::Value::String(body.clone())),
        ),
        _ => None,
    }
}
