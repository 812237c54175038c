//! Stripe Checkout session creation for subscription purchases.

use serde::Deserialize;

/// Default Stripe API host.
pub const STRIPE_API_URL: &str = "https://api.stripe.com";

/// Path of the Checkout session collection.
pub const CHECKOUT_SESSIONS_PATH: &str = "/v1/checkout/sessions";

/// Where Stripe redirects after a completed payment, relative to the
/// frontend origin. Stripe substitutes the session id placeholder itself.
const SUCCESS_PATH: &str = "/generate?session_id={CHECKOUT_SESSION_ID}";

/// Where Stripe redirects when the customer backs out.
const CANCEL_PATH: &str = "/membership";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Request to Stripe timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Stripe API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Stripe returned a checkout session without a redirect URL")]
    MissingRedirectUrl,
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BillingError::Timeout
        } else {
            BillingError::Request(err)
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// The subset of a Stripe Checkout session the backend cares about.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for creating Stripe Checkout sessions.
///
/// Holds the secret key and the frontend origin the redirect URLs are
/// derived from.
pub struct CheckoutClient {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
    frontend_url: String,
}

impl CheckoutClient {
    pub fn new(
        secret_key: impl Into<String>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            STRIPE_API_URL,
            secret_key,
            frontend_url,
        )
    }

    /// Create a client against an explicit API host, reusing an existing
    /// `reqwest::Client`.
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        secret_key: impl Into<String>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            secret_key: secret_key.into(),
            frontend_url: frontend_url.into(),
        }
    }

    /// Create a subscription-mode Checkout session for `price_id`.
    ///
    /// The purchasing user's identity rides along in the session metadata so
    /// the completion webhook can credit the right account.
    pub async fn create_subscription_checkout(
        &self,
        price_id: &str,
        firebase_uid: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let success_url = format!("{}{SUCCESS_PATH}", self.frontend_url);
        let cancel_url = format!("{}{CANCEL_PATH}", self.frontend_url);
        let form = [
            ("mode", "subscription"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", &success_url),
            ("cancel_url", &cancel_url),
            ("metadata[firebaseUid]", firebase_uid),
            ("metadata[priceId]", price_id),
        ];

        let response = self
            .client
            .post(format!("{}{CHECKOUT_SESSIONS_PATH}", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let session: SessionResponse = Self::parse_response(response).await?;
        let url = session.url.ok_or(BillingError::MissingRedirectUrl)?;
        tracing::info!(session_id = %session.id, "Created Stripe checkout session");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BillingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unreadable body>"));
        Err(BillingError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BillingError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

impl std::fmt::Debug for CheckoutClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secret key stays out of logs.
        f.debug_struct("CheckoutClient")
            .field("api_url", &self.api_url)
            .field("frontend_url", &self.frontend_url)
            .finish_non_exhaustive()
    }
}
