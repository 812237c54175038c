//! Route definition for the Stripe webhook endpoint.
//!
//! Mounted at the root, not under `/api`: the path is registered with
//! Stripe and carries its own authentication (the signature header).

use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook::stripe_webhook))
}
