//! HTTP pipeline for Azure Resource Manager.
//!
//! This module provides [`ArmClient`], the pipeline every higher-level crate
//! sends its requests through. The client handles authentication, the
//! `api-version` query parameter, transient-failure retry, and turning error
//! responses into [`ArmError::RequestFailed`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_core::auth::ArmCredential;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArmClient::builder()
//!     .credential(ArmCredential::bearer_token("eyJ0eXAi..."))
//!     .api_version("2024-03-01")
//!     .build()?;
//!
//! let response = client
//!     .get("/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups")
//!     .await?;
//! println!("status: {}", response.status());
//! # Ok(())
//! # }
//! ```

use crate::auth::ArmCredential;
use crate::error::{ArmError, ArmResult};
use crate::http::{ArmRequest, Method, RawResponse};
use crate::models::ResponseError;
use reqwest::Client as HttpClient;
use url::Url;

use std::time::Duration;

/// Public-cloud Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Environment variable overriding the Resource Manager endpoint.
pub const ENDPOINT_ENV: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";

/// Default API version sent when a collection does not pin its own.
pub const DEFAULT_API_VERSION: &str = "2022-09-01";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 408 Request Timeout
/// - 429 Too Many Requests (throttling)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
    /// Upper bound for a single backoff, including server `Retry-After` hints.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// The delay before retry number `attempt` (zero-based).
    ///
    /// A server hint wins over the computed backoff. Both are capped at
    /// [`max_backoff`](Self::max_backoff).
    pub fn backoff(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        let delay = server_hint.unwrap_or_else(|| {
            // jitter_factor is in range [0.75, 1.25] for ±25% variation
            let base = self
                .initial_backoff
                .saturating_mul(2_u32.saturating_pow(attempt));
            let jitter = 0.75 + fastrand::f64() * 0.5;
            base.mul_f64(jitter)
        });
        delay.min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(800),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// The pipeline for Resource Manager requests.
///
/// The client is cheaply cloneable and can be shared across threads and
/// tasks; every clone shares the same connection pool.
#[derive(Debug, Clone)]
pub struct ArmClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: ArmCredential,
    pub(crate) api_version: String,
    pub(crate) retry_policy: RetryPolicy,
}

/// Builder for constructing an [`ArmClient`].
///
/// Use [`ArmClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct ArmClientBuilder {
    endpoint: Option<String>,
    credential: Option<ArmCredential>,
    api_version: Option<String>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ArmClient {
    /// Create a new builder for configuring an `ArmClient`.
    pub fn builder() -> ArmClientBuilder {
        ArmClientBuilder::default()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the default API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Build a full URL for an API path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined to the endpoint URL.
    pub fn url(&self, path: &str) -> ArmResult<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| ArmError::invalid_endpoint_with_source("failed to construct URL", e))
    }

    /// Build a request for `path` carrying the client's API version.
    pub fn request(&self, method: Method, path: &str) -> ArmResult<ArmRequest> {
        self.request_with_api_version(method, path, &self.api_version)
    }

    /// Build a request for `path` carrying an explicit API version.
    ///
    /// Any `api-version` already present in `path` is replaced.
    pub fn request_with_api_version(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
    ) -> ArmResult<ArmRequest> {
        Ok(ArmRequest::new(method, self.url(path)?).with_query("api-version", api_version))
    }

    /// Send a request through the pipeline.
    ///
    /// Adds the `Authorization` header and retries retriable HTTP errors
    /// (408, 429, 500, 502, 503, 504) with exponential backoff, honouring
    /// the server's `Retry-After` when present. The URL is sent verbatim:
    /// next links and polling locations already carry their own query.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Transport`] when the exchange itself fails and
    /// [`ArmError::RequestFailed`] when the final answer is not a success.
    #[tracing::instrument(
        name = "arm::pipeline::send",
        skip(self, request),
        fields(method = %request.method(), url = %request.url())
    )]
    pub async fn send(&self, request: &ArmRequest) -> ArmResult<RawResponse> {
        let auth = self.credential.resolve()?;

        let mut attempt = 0;
        loop {
            let mut builder = self
                .http
                .request(request.method().clone(), request.url().clone())
                .headers(request.headers().clone());
            if let Some(auth) = &auth {
                builder = builder.header("Authorization", auth);
            }
            if let Some(body) = request.body() {
                builder = builder.body(body.clone());
            }

            let response = RawResponse::from_reqwest(builder.send().await?).await?;
            let status = response.status();

            if response.is_success() {
                tracing::trace!(status, "request succeeded");
                return Ok(response);
            }

            // Non-retriable error or last attempt - return error
            if !is_retriable_status(status) || attempt >= self.retry_policy.max_retries {
                return Err(Self::error_from_response(&response));
            }

            let backoff = self.retry_policy.backoff(attempt, response.retry_after());
            tracing::warn!(
                status,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "retriable status, backing off",
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Send a `GET` for `path` with the default API version.
    pub async fn get(&self, path: &str) -> ArmResult<RawResponse> {
        self.send(&self.request(Method::GET, path)?).await
    }

    /// Send a `PUT` with a JSON body.
    pub async fn put<T: serde::Serialize>(&self, path: &str, body: &T) -> ArmResult<RawResponse> {
        self.send(&self.request(Method::PUT, path)?.with_json(body)?)
            .await
    }

    /// Send a `POST` with a JSON body.
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> ArmResult<RawResponse> {
        self.send(&self.request(Method::POST, path)?.with_json(body)?)
            .await
    }

    /// Send a `DELETE` for `path`.
    pub async fn delete(&self, path: &str) -> ArmResult<RawResponse> {
        self.send(&self.request(Method::DELETE, path)?).await
    }

    /// Maximum length for error messages to prevent sensitive data leaks.
    const MAX_ERROR_MESSAGE_LEN: usize = 1000;

    /// Remove bearer tokens and SAS signatures from a message.
    pub(crate) fn sanitize_error_message(msg: &str) -> String {
        let redacted = redact_after(msg, "Bearer ");
        redact_after(&redacted, "sig=")
    }

    /// Sanitize, then truncate a message if it exceeds the maximum length.
    pub(crate) fn truncate_message(msg: &str) -> String {
        let sanitized = Self::sanitize_error_message(msg);

        if sanitized.len() > Self::MAX_ERROR_MESSAGE_LEN {
            let mut cut = Self::MAX_ERROR_MESSAGE_LEN;
            while !sanitized.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated)", &sanitized[..cut])
        } else {
            sanitized
        }
    }

    /// Turn a non-success response into [`ArmError::RequestFailed`].
    pub fn error_from_response(response: &RawResponse) -> ArmError {
        let status = response.status();
        let body = String::from_utf8_lossy(response.body());

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(error) = ResponseError::from_value(&value) {
                return ArmError::RequestFailed {
                    status,
                    code: error.code,
                    message: Self::truncate_message(error.message.as_deref().unwrap_or(&body)),
                };
            }
        }

        let message = if body.trim().is_empty() {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("no response body")
                .to_string()
        } else {
            Self::truncate_message(&body)
        };
        ArmError::http(status, message)
    }
}

/// Replace the value following every `marker` with `[REDACTED]`.
///
/// A value ends at whitespace, a quote, a comma or `&`.
fn redact_after(msg: &str, marker: &str) -> String {
    let mut out = String::with_capacity(msg.len());
    let mut rest = msg;
    while let Some(pos) = rest.find(marker) {
        let value_start = pos + marker.len();
        out.push_str(&rest[..value_start]);
        let tail = &rest[value_start..];
        let value_end = tail
            .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '&'))
            .unwrap_or(tail.len());
        if value_end > 0 {
            out.push_str("[REDACTED]");
        }
        rest = &tail[value_end..];
    }
    out.push_str(rest);
    out
}

impl ArmClientBuilder {
    /// Set the Resource Manager endpoint URL.
    ///
    /// If not set, the builder checks the `AZURE_RESOURCE_MANAGER_ENDPOINT`
    /// environment variable and falls back to [`DEFAULT_ENDPOINT`].
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// If not set, the builder uses [`ArmCredential::from_env()`].
    pub fn credential(mut self, credential: ArmCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the default API version.
    ///
    /// Defaults to [`DEFAULT_API_VERSION`].
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout configuration
    /// via [`connect_timeout`](Self::connect_timeout) or
    /// [`read_timeout`](Self::read_timeout) is ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout, covering the whole request/response cycle.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 800ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `ArmClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The endpoint URL is invalid
    /// - No credential is provided and `AZURE_ACCESS_TOKEN` is not set
    pub fn build(self) -> ArmResult<ArmClient> {
        let http = match self.http_client {
            Some(http) => http,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
                .build()?,
        };

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var(ENDPOINT_ENV).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| ArmError::invalid_endpoint_with_source("invalid endpoint URL", e))?;
        if endpoint.cannot_be_a_base() {
            return Err(ArmError::invalid_endpoint(format!(
                "endpoint '{endpoint_str}' cannot be used as a base URL"
            )));
        }

        let credential = match self.credential {
            Some(credential) => credential,
            None => ArmCredential::from_env()?,
        };

        tracing::debug!(endpoint = %endpoint, "resource manager client built");

        Ok(ArmClient {
            http,
            endpoint,
            credential,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}
