//! Firebase ID token verification.
//!
//! Tokens are RS256-signed JWTs issued by Firebase Auth. Google publishes
//! the signing keys as a JWKS document; keys rotate, so an unknown `kid`
//! triggers one refetch before the token is rejected. Audience must equal
//! the Firebase project id and the issuer must be the project's
//! `securetoken` URL.

use std::collections::HashMap;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FirebaseAuthError {
    /// The token is not a structurally valid JWT (or names no key id).
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The token's `kid` is not among the published signing keys, even
    /// after a refresh.
    #[error("Token signed with unknown key id")]
    UnknownKeyId,

    /// Signature, expiry, audience, or issuer check failed.
    #[error("Token rejected: {0}")]
    Invalid(String),

    /// The signing-key endpoint could not be fetched or parsed.
    #[error("Failed to fetch identity provider keys: {0}")]
    KeyFetch(String),
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// The claims this backend reads from a verified ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    /// Firebase user id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifies Firebase ID tokens against Google's published signing keys.
///
/// The key cache is shared across requests; a refresh replaces it wholesale
/// so retired keys age out.
pub struct FirebaseAuth {
    project_id: String,
    jwks_url: String,
    client: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
    /// When set, the key cache is fixed and never refreshed (tests).
    static_keys: bool,
}

impl FirebaseAuth {
    /// Create a verifier that fetches signing keys from `jwks_url` on demand.
    pub fn new(
        client: reqwest::Client,
        project_id: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            client,
            keys: RwLock::new(HashMap::new()),
            static_keys: false,
        }
    }

    /// Create a verifier with a fixed key set that is never refreshed.
    pub fn with_static_keys(
        project_id: impl Into<String>,
        keys: HashMap<String, DecodingKey>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: String::new(),
            client: reqwest::Client::new(),
            keys: RwLock::new(keys),
            static_keys: true,
        }
    }

    /// Verify an ID token and return its claims.
    ///
    /// An unknown `kid` triggers exactly one key refresh; if the key is
    /// still unknown afterwards the token is rejected.
    pub async fn verify(&self, token: &str) -> Result<IdTokenClaims, FirebaseAuthError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| FirebaseAuthError::Malformed(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| FirebaseAuthError::Malformed("token header has no key id".into()))?;

        if let Some(claims) = self.try_decode(&kid, token).await? {
            return Ok(claims);
        }

        if self.static_keys {
            return Err(FirebaseAuthError::UnknownKeyId);
        }

        tracing::debug!(%kid, "Signing key not cached, refreshing JWKS");
        self.refresh_keys().await?;
        match self.try_decode(&kid, token).await? {
            Some(claims) => Ok(claims),
            None => Err(FirebaseAuthError::UnknownKeyId),
        }
    }

    // ---- private helpers ----

    /// Decode against the cached key for `kid`; `Ok(None)` when the key is
    /// not cached.
    async fn try_decode(
        &self,
        kid: &str,
        token: &str,
    ) -> Result<Option<IdTokenClaims>, FirebaseAuthError> {
        let keys = self.keys.read().await;
        let Some(key) = keys.get(kid) else {
            return Ok(None);
        };
        self.decode_with(key, token).map(Some)
    }

    fn decode_with(
        &self,
        key: &DecodingKey,
        token: &str,
    ) -> Result<IdTokenClaims, FirebaseAuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);

        let data = jsonwebtoken::decode::<IdTokenClaims>(token, key, &validation)
            .map_err(|e| FirebaseAuthError::Invalid(e.to_string()))?;
        if data.claims.sub.is_empty() {
            return Err(FirebaseAuthError::Invalid("token has no subject".into()));
        }
        Ok(data.claims)
    }

    /// Fetch the JWKS document and replace the key cache.
    async fn refresh_keys(&self) -> Result<(), FirebaseAuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FirebaseAuthError::KeyFetch(e.to_string()))?;
        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| FirebaseAuthError::KeyFetch(e.to_string()))?;

        let mut fresh = HashMap::with_capacity(jwks.keys.len());
        for jwk in jwks.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    fresh.insert(jwk.kid, key);
                }
                Err(err) => {
                    tracing::warn!(kid = %jwk.kid, error = %err, "Skipping unusable JWKS entry");
                }
            }
        }
        let count = fresh.len();
        *self.keys.write().await = fresh;
        tracing::info!(count, "Refreshed identity provider signing keys");
        Ok(())
    }
}

impl std::fmt::Debug for FirebaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseAuth")
            .field("project_id", &self.project_id)
            .field("jwks_url", &self.jwks_url)
            .field("static_keys", &self.static_keys)
            .finish_non_exhaustive()
    }
}
