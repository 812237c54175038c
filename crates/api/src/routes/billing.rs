//! Route definitions for checkout and credit balance.
//!
//! ```text
//! POST   /create-checkout-session    create_checkout_session
//! GET    /credits                    get_credits
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::billing;
use crate::state::AppState;

/// Routes merged into the `/api` nest.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/create-checkout-session",
            post(billing::create_checkout_session),
        )
        .route("/credits", get(billing::get_credits))
}
