//! Firebase bearer-token authentication extractor for Axum handlers.

use animefactory_core::error::CoreError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a Firebase ID token in the
/// `Authorization` header.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(uid = %user.uid, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The Firebase user id (from `claims.sub`).
    pub uid: String,
    /// The user's email address, when the token carries one.
    pub email: Option<String>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing or invalid Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing or invalid Authorization header".into(),
            ))
        })?;

        let claims = state.firebase.verify(token).await.map_err(|err| {
            tracing::debug!(error = %err, "Identity token rejected");
            AppError::Core(CoreError::Unauthorized("Unauthorized".into()))
        })?;

        Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
        })
    }
}
