//! Shared helpers for integration tests.
//!
//! [`build_test_app`] mirrors the router construction in `main.rs` (via
//! [`build_app_router`]) so integration tests exercise the same middleware
//! stack that production uses. Identity verification runs against a fixed
//! RSA test key instead of Google's JWKS endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use animefactory_api::auth::firebase::FirebaseAuth;
use animefactory_api::config::{AppConfig, FirebaseConfig, StripeConfig, TensorArtConfig};
use animefactory_api::router::build_app_router;
use animefactory_api::state::AppState;
use animefactory_billing::CheckoutClient;
use animefactory_core::signing::RequestSigner;
use animefactory_tensorart::TensorArtClient;

pub const TEST_KEY_PEM: &str = include_str!("../../../core/testdata/test_signing_key.pem");
pub const TEST_PUBLIC_PEM: &str = include_str!("../../../core/testdata/test_signing_key.pub.pem");

pub const TEST_PROJECT_ID: &str = "animefactory-test";
pub const TEST_KID: &str = "test-key";
pub const TEST_APP_ID: &str = "rt5k-rdeV";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_integration_test";

/// An address nothing listens on; tests that must not reach an upstream
/// point clients here so an accidental call fails fast.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Build a test `AppConfig` with both upstreams unreachable.
pub fn test_config() -> AppConfig {
    test_config_with(UNREACHABLE_URL, UNREACHABLE_URL)
}

/// Build a test `AppConfig` with explicit upstream hosts (wiremock URIs).
pub fn test_config_with(tensorart_url: &str, stripe_url: &str) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["https://animefactory.art".to_string()],
        request_timeout_secs: 30,
        upstream_timeout_secs: 5,
        frontend_url: "https://animefactory.art".to_string(),
        // Static assets live at the workspace root.
        public_dir: format!("{}/../../public", env!("CARGO_MANIFEST_DIR")),
        firebase: FirebaseConfig {
            project_id: TEST_PROJECT_ID.to_string(),
            jwks_url: String::new(),
        },
        stripe: StripeConfig {
            secret_key: "sk_test_integration".to_string(),
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
            api_url: stripe_url.to_string(),
        },
        tensorart: TensorArtConfig {
            app_id: TEST_APP_ID.to_string(),
            api_url: tensorart_url.to_string(),
            private_key_pem: Some(TEST_KEY_PEM.to_string()),
            private_key_file: None,
        },
    }
}

/// Build the full application router against the given pool with default
/// test configuration.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

/// Build the full application router from an explicit configuration.
pub fn build_test_app_with(pool: PgPool, config: AppConfig) -> Router {
    let decoding = DecodingKey::from_rsa_pem(TEST_PUBLIC_PEM.as_bytes())
        .expect("test public key must parse");
    let firebase = FirebaseAuth::with_static_keys(
        config.firebase.project_id.clone(),
        HashMap::from([(TEST_KID.to_string(), decoding)]),
    );

    let signer = RequestSigner::from_pem(&config.tensorart.app_id, TEST_KEY_PEM)
        .expect("test signing key must parse");
    let tensorart = TensorArtClient::new(config.tensorart.api_url.clone(), signer);

    let billing = CheckoutClient::with_client(
        reqwest::Client::new(),
        config.stripe.api_url.clone(),
        config.stripe.secret_key.clone(),
        config.frontend_url.clone(),
    );

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        firebase: Arc::new(firebase),
        tensorart: Arc::new(tensorart),
        billing: Arc::new(billing),
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Token minting
// ---------------------------------------------------------------------------

/// Mint a valid Firebase-shaped ID token for `uid`.
pub fn mint_id_token(uid: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    mint_token(
        uid,
        Some(TEST_KID),
        TEST_PROJECT_ID,
        &format!("https://securetoken.google.com/{TEST_PROJECT_ID}"),
        now + 3600,
    )
}

/// Mint an RS256 token with explicit header and claim fields, for building
/// the various invalid-token shapes.
pub fn mint_token(uid: &str, kid: Option<&str>, aud: &str, iss: &str, exp: i64) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let claims = json!({
        "sub": uid,
        "aud": aud,
        "iss": iss,
        "iat": chrono::Utc::now().timestamp(),
        "exp": exp,
        "email": format!("{uid}@example.com"),
    });
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes())
        .expect("test signing key must parse");
    encode(&header, &claims, &key).expect("token encoding succeeds")
}

// ---------------------------------------------------------------------------
// Webhook payloads
// ---------------------------------------------------------------------------

/// A `checkout.session.completed` event crediting `uid` for `price_id`.
pub fn checkout_completed_event(uid: &str, price_id: &str) -> Value {
    json!({
        "id": "evt_test_1",
        "object": "event",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_1",
            "object": "checkout.session",
            "metadata": { "firebaseUid": uid, "priceId": price_id },
        }},
    })
}

/// Sign `payload` with the test webhook secret at the current time.
pub fn signed_webhook_header(payload: &[u8]) -> String {
    animefactory_billing::webhook::sign_payload(
        TEST_WEBHOOK_SECRET,
        chrono::Utc::now().timestamp(),
        payload,
    )
}

// ---------------------------------------------------------------------------
// Request dispatch
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, token: Option<&str>, body: &Value) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST raw bytes to `/webhook`, optionally with a `stripe-signature` header.
pub async fn post_webhook(app: Router, payload: Vec<u8>, signature: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/webhook")
        .header(CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    let request = builder.body(Body::from(payload)).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
