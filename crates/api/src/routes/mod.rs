pub mod billing;
pub mod generation;
pub mod health;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /create-checkout-session    start a subscription purchase (auth)
/// /credits                    current credit balance (auth)
///
/// /generate                   submit a generation job (auth)
/// /job/{job_id}               poll a generation job (auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(billing::router())
        .merge(generation::router())
}
