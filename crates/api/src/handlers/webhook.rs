//! Stripe webhook handler: verifies, filters, maps, applies.
//!
//! The signature check is the only gate that may reject the HTTP call.
//! Once a payload has been authenticated, every downstream problem
//! (unexpected event kind, unknown price, database failure) is logged and
//! acknowledged with 200 so Stripe does not retry an event whose only
//! failure is our own bookkeeping. Those log lines are the input to manual
//! reconciliation.

use animefactory_billing::webhook::{self, EVENT_CHECKOUT_COMPLETED};
use animefactory_billing::StripeEvent;
use animefactory_core::pricing::grant_for_price;
use animefactory_db::repositories::AccountRepo;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /webhook
///
/// Consumes the raw body: the signature covers the exact bytes Stripe sent,
/// so nothing may parse or re-serialize the payload first.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::SignatureRejected("Missing stripe-signature header".into())
        })?;

    let now = chrono::Utc::now().timestamp();
    webhook::verify_signature(
        &state.config.stripe.webhook_secret,
        signature,
        &body,
        now,
        webhook::DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|err| AppError::SignatureRejected(err.to_string()))?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|err| AppError::SignatureRejected(format!("Invalid payload: {err}")))?;

    if event.event_type != EVENT_CHECKOUT_COMPLETED {
        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Ignoring webhook event kind"
        );
        return Ok(StatusCode::OK);
    }

    let Some(checkout) = event.completed_checkout() else {
        tracing::warn!(event_id = %event.id, "Completed checkout event with unexpected object shape");
        return Ok(StatusCode::OK);
    };

    let (Some(uid), Some(price_id)) =
        (checkout.metadata.firebase_uid, checkout.metadata.price_id)
    else {
        tracing::warn!(event_id = %event.id, "Checkout session missing crediting metadata");
        return Ok(StatusCode::OK);
    };

    let Some(grant) = grant_for_price(&price_id) else {
        tracing::warn!(event_id = %event.id, %price_id, "No credit grant mapped for price");
        return Ok(StatusCode::OK);
    };

    match AccountRepo::apply_grant(&state.pool, &uid, grant.credits, grant.plan).await {
        Ok(account) => {
            tracing::info!(
                event_id = %event.id,
                %uid,
                granted = grant.credits,
                balance = account.credits,
                plan = grant.plan,
                "Applied credit grant"
            );
        }
        Err(err) => {
            tracing::error!(
                event_id = %event.id,
                %uid,
                %price_id,
                error = %err,
                "Failed to apply credit grant, needs manual reconciliation"
            );
        }
    }

    Ok(StatusCode::OK)
}
