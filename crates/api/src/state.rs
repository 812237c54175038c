use std::sync::Arc;

use animefactory_billing::CheckoutClient;
use animefactory_tensorart::TensorArtClient;

use crate::auth::firebase::FirebaseAuth;
use crate::config::AppConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: animefactory_db::DbPool,
    /// Server configuration.
    pub config: Arc<AppConfig>,
    /// Firebase ID token verifier.
    pub firebase: Arc<FirebaseAuth>,
    /// Signed TensorArt job client.
    pub tensorart: Arc<TensorArtClient>,
    /// Stripe checkout client.
    pub billing: Arc<CheckoutClient>,
}
