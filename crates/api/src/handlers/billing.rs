//! Handlers for subscription checkout and credit balance lookup.
//!
//! Routes:
//! - `POST /api/create-checkout-session` — start a subscription purchase
//! - `GET  /api/credits`                 — current balance for the caller

use animefactory_core::error::CoreError;
use animefactory_core::pricing::PLAN_FREE;
use animefactory_core::types::Timestamp;
use animefactory_db::repositories::AccountRepo;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    #[serde(rename = "priceId")]
    pub price_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub url: String,
}

/// POST /api/create-checkout-session
///
/// Creates a subscription-mode checkout session for the caller. The price id
/// is passed through opaquely; Stripe is the authority on whether it exists.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateCheckoutRequest>,
) -> AppResult<impl IntoResponse> {
    if input.price_id.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "priceId must not be empty".into(),
        )));
    }

    let session = state
        .billing
        .create_subscription_checkout(&input.price_id, &user.uid)
        .await
        .map_err(AppError::checkout_failed)?;

    tracing::info!(uid = %user.uid, session_id = %session.id, "Checkout session created");
    Ok(Json(CreateCheckoutResponse { url: session.url }))
}

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub credits: i64,
    pub plan: String,
    #[serde(rename = "lastRenewed")]
    pub last_renewed: Option<Timestamp>,
}

/// GET /api/credits
///
/// Users who have never been credited simply have an empty balance; that is
/// not an error.
pub async fn get_credits(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let account = AccountRepo::find_by_uid(&state.pool, &user.uid).await?;

    let response = match account {
        Some(account) => CreditsResponse {
            credits: account.credits,
            plan: account.plan,
            last_renewed: Some(account.last_renewed),
        },
        None => CreditsResponse {
            credits: 0,
            plan: PLAN_FREE.to_string(),
            last_renewed: None,
        },
    };
    Ok(Json(response))
}
