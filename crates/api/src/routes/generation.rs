//! Route definitions for generation job submission and polling.
//!
//! ```text
//! POST   /generate          generate
//! GET    /job/{job_id}      job_status
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes merged into the `/api` nest.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generation::generate))
        .route("/job/{job_id}", get(generation::job_status))
}
