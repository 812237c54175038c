//! RSA-SHA256 request signing for the generation API.
//!
//! Every outbound call to the generation API carries an `Authorization`
//! header proving ownership of the configured app id. The signature covers
//! the exact `{method, path, timestamp, nonce, body}` tuple, so the signed
//! body bytes must be the transmitted body bytes.

use base64::engine::general_purpose;
use base64::Engine;
use rand::Rng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Scheme label leading the `Authorization` header value.
pub const SIGNATURE_SCHEME: &str = "TAMS-SHA256-RSA";

/// Number of random bytes in a nonce (hex-encoded to twice this length).
pub const NONCE_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Key construction failure. Fatal at startup; signing never fails once the
/// key is built.
#[derive(Debug, thiserror::Error)]
pub enum SigningKeyError {
    #[error("Signing key is not valid PKCS#8 or PKCS#1 RSA PEM: {0}")]
    MalformedKey(String),
}

// ---------------------------------------------------------------------------
// Signed request envelope
// ---------------------------------------------------------------------------

/// The variable parts of one request signature.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Unix time in whole seconds, rendered as a decimal string.
    pub timestamp: String,
    /// Hex-encoded random nonce, unique per request.
    pub nonce: String,
    /// Base64-encoded RSA PKCS#1 v1.5 signature over the signing message.
    pub signature: String,
}

impl SignedRequest {
    /// Render the `Authorization` header value for this signature.
    pub fn header_value(&self, app_id: &str) -> String {
        format!(
            "{SIGNATURE_SCHEME} app_id={app_id},nonce_str={},timestamp={},signature={}",
            self.nonce, self.timestamp, self.signature
        )
    }
}

/// The canonical byte sequence a signature is computed over: the
/// newline-joined `method`, `path`, `timestamp`, `nonce`, and raw body.
pub fn signing_message(
    method: &str,
    path: &str,
    timestamp: &str,
    nonce: &str,
    body: &[u8],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(
        method.len() + path.len() + timestamp.len() + nonce.len() + body.len() + 4,
    );
    message.extend_from_slice(method.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(path.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(timestamp.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(nonce.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(body);
    message
}

/// Generate a fresh request nonce: [`NONCE_BYTES`] bytes from the process
/// CSPRNG, hex-encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

// ---------------------------------------------------------------------------
// Request signer
// ---------------------------------------------------------------------------

/// Signs outbound generation-API requests with the account's RSA private key.
///
/// Constructed once at startup from configuration and shared by reference;
/// signing consumes only randomness and the clock.
#[derive(Clone)]
pub struct RequestSigner {
    app_id: String,
    key: SigningKey<Sha256>,
}

impl RequestSigner {
    /// Build a signer from a PEM-encoded RSA private key.
    ///
    /// Accepts both PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1
    /// (`BEGIN RSA PRIVATE KEY`) encodings.
    pub fn from_pem(app_id: impl Into<String>, pem: &str) -> Result<Self, SigningKeyError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| SigningKeyError::MalformedKey(e.to_string()))?;
        Ok(Self {
            app_id: app_id.into(),
            key: SigningKey::new(key),
        })
    }

    /// The app id this signer authenticates as.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Sign a request with a fresh timestamp and nonce.
    pub fn sign(&self, method: &str, path: &str, body: &[u8]) -> SignedRequest {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let nonce = generate_nonce();
        let signature = self.sign_at(method, path, &timestamp, &nonce, body);
        SignedRequest {
            timestamp,
            nonce,
            signature,
        }
    }

    /// Sign a request with an explicit timestamp and nonce.
    ///
    /// Deterministic: identical inputs always produce the identical
    /// signature. Returns the base64-encoded signature.
    pub fn sign_at(
        &self,
        method: &str,
        path: &str,
        timestamp: &str,
        nonce: &str,
        body: &[u8],
    ) -> String {
        let message = signing_message(method, path, timestamp, nonce, body);
        let signature = self.key.sign(&message);
        general_purpose::STANDARD.encode(signature.to_bytes())
    }

    /// Sign a request and render the full `Authorization` header value.
    pub fn authorization_header(&self, method: &str, path: &str, body: &[u8]) -> String {
        self.sign(method, path, body).header_value(&self.app_id)
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("RequestSigner")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// hex encoding helper (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
