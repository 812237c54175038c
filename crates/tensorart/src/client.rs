//! Signed REST client for TensorArt job submission and status polling.

use animefactory_core::pipeline::JobRequest;
use animefactory_core::signing::RequestSigner;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

/// Path of the job collection on the TensorArt API host.
pub const JOBS_PATH: &str = "/v1/jobs";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TensorArtError {
    #[error("Request to TensorArt timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("TensorArt API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to serialize job payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TensorArtError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TensorArtError::Timeout
        } else {
            TensorArtError::Request(err)
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SubmitJobResponse {
    job: SubmittedJob,
}

#[derive(Debug, Deserialize)]
struct SubmittedJob {
    id: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the TensorArt REST API.
///
/// Holds the request signer alongside the HTTP client so that callers cannot
/// submit an unsigned request by accident.
pub struct TensorArtClient {
    client: reqwest::Client,
    api_url: String,
    signer: RequestSigner,
}

impl TensorArtClient {
    /// Create a new client for the API at `api_url` (scheme and host, no
    /// trailing slash).
    pub fn new(api_url: impl Into<String>, signer: RequestSigner) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, signer)
    }

    /// Create a client that reuses an existing `reqwest::Client`.
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        signer: RequestSigner,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            signer,
        }
    }

    /// Submit a generation job and return the upstream job id.
    ///
    /// The payload is serialized exactly once; the signature covers the same
    /// bytes that go on the wire.
    pub async fn submit_job(&self, request: &JobRequest) -> Result<String, TensorArtError> {
        let body = serde_json::to_vec(request)?;
        let authorization = self.signer.authorization_header("POST", JOBS_PATH, &body);

        let response = self
            .client
            .post(format!("{}{JOBS_PATH}", self.api_url))
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let parsed: SubmitJobResponse = Self::parse_response(response).await?;
        tracing::info!(job_id = %parsed.job.id, "Generation job accepted by TensorArt");
        Ok(parsed.job.id)
    }

    /// Fetch the current state of a previously submitted job.
    ///
    /// The upstream JSON is relayed verbatim; callers decide how much of it
    /// to interpret.
    pub async fn job_status(&self, job_id: &str) -> Result<serde_json::Value, TensorArtError> {
        let path = format!("{JOBS_PATH}/{job_id}");
        let authorization = self.signer.authorization_header("GET", &path, b"");

        let response = self
            .client
            .get(format!("{}{path}", self.api_url))
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Turn a non-2xx response into `TensorArtError::Api`, preserving the
    /// response body for diagnostics.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TensorArtError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unreadable body>"));
        Err(TensorArtError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TensorArtError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
