use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use animefactory_api::auth::firebase::FirebaseAuth;
use animefactory_api::config::AppConfig;
use animefactory_api::router::build_app_router;
use animefactory_api::state::AppState;
use animefactory_billing::CheckoutClient;
use animefactory_core::signing::RequestSigner;
use animefactory_tensorart::TensorArtClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "animefactory_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AppConfig::load();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = animefactory_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    animefactory_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    animefactory_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Outbound HTTP client (shared; bounded timeout) ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream_timeout_secs))
        .build()
        .expect("Failed to build HTTP client");

    // --- TensorArt client ---
    let signer = RequestSigner::from_pem(&config.tensorart.app_id, &config.tensorart.private_key())
        .expect("Invalid TensorArt signing key");
    let tensorart =
        TensorArtClient::with_client(http.clone(), config.tensorart.api_url.clone(), signer);
    tracing::info!(api_url = %config.tensorart.api_url, "TensorArt client ready");

    // --- Stripe checkout client ---
    let billing = CheckoutClient::with_client(
        http.clone(),
        config.stripe.api_url.clone(),
        config.stripe.secret_key.clone(),
        config.frontend_url.clone(),
    );

    // --- Firebase token verifier ---
    let firebase = FirebaseAuth::new(
        http,
        config.firebase.project_id.clone(),
        config.firebase.jwks_url.clone(),
    );
    tracing::info!(project_id = %config.firebase.project_id, "Firebase verifier ready");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        firebase: Arc::new(firebase),
        tensorart: Arc::new(tensorart),
        billing: Arc::new(billing),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
