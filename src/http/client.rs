//! API client: request execution, response decoding and the public verbs.

use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::breaker::CircuitBreaker;
use super::retry::{RetryPolicy, with_retry};
use crate::error::{ApiError, Error};

/// Path segment every API URL lives under.
pub const API_PATH: &str = "/api";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the raw API key.
pub const AUTH_HEADER: &str = "X-Auth-Token";

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const PREVIEW_LENGTH: usize = 100;

/// Strips one trailing slash and appends [`API_PATH`] unless already present.
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.strip_suffix('/').unwrap_or(base_url);
    if trimmed.ends_with(API_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, API_PATH)
    }
}

/// Client for the document-workflow API.
///
/// Owns its own [`CircuitBreaker`], so clients never share failure state.
/// Safe to share across tasks behind an `Arc`.
pub struct Client {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    policy: RetryPolicy,
    breaker: CircuitBreaker,
    cancel: CancellationToken,
}

/// Configures a [`Client`]. Zero durations are ignored.
pub struct ClientBuilder {
    base_url: String,
    api_key: String,
    timeout: Duration,
    insecure_skip_verify: bool,
    policy: RetryPolicy,
    breaker: Option<CircuitBreaker>,
    cancel: Option<CancellationToken>,
}

impl ClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// Maximum retries for rate-limited (HTTP 429) requests.
    pub fn retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        if !delay.is_zero() {
            self.policy.base_delay = delay;
        }
        self
    }

    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    pub fn breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Token that aborts in-flight requests and backoff sleeps.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        let base_url = normalize_base_url(self.base_url.trim());
        url::Url::parse(&base_url).map_err(|e| Error::InvalidBaseUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("docuseal-cli/", env!("DOCUSEAL_VERSION")))
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.insecure_skip_verify)
            .build()
            .map_err(Error::Transport)?;

        Ok(Client {
            base_url,
            api_key: self.api_key,
            http,
            policy: self.policy,
            breaker: self.breaker.unwrap_or_default(),
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<serde_json::Value>,
}

/// Decodes a success body, tolerating a `{"data": ...}` envelope.
///
/// An empty body decodes to `None`.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, Error> {
    if body.is_empty() {
        return Ok(None);
    }

    let direct_err = match serde_json::from_slice::<T>(body) {
        Ok(value) => return Ok(Some(value)),
        Err(e) => e,
    };

    if let Ok(Envelope { data: Some(inner) }) = serde_json::from_slice::<Envelope>(body) {
        if let Ok(value) = serde_json::from_value::<T>(inner) {
            return Ok(Some(value));
        }
    }

    Err(Error::Decode {
        preview: preview(body),
        source: direct_err,
    })
}

fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(PREVIEW_LENGTH) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("policy", &self.policy)
            .field("breaker", &self.breaker)
            .finish()
    }
}

impl Client {
    pub fn builder(base_url: impl Into<String>, api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            insecure_skip_verify: false,
            policy: RetryPolicy::default(),
            breaker: None,
            cancel: None,
        }
    }

    /// Client with default timeout and retry policy.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        Self::builder(base_url, api_key).build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[tracing::instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, Error> {
        self.request(Method::GET, path, None::<&()>).await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, Error> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    /// Sends `method` to `path`. With `body` unset the request carries no body.
    #[tracing::instrument(skip(self, body))]
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(Error::Encode)?;

        // One key per logical write, reused by every retry of it.
        let idempotency_key = (method == Method::POST).then(|| Uuid::new_v4().to_string());

        let operation_name = format!("{} {}", method, path);
        let method = &method;
        let body = body.as_deref();
        let idempotency_key = idempotency_key.as_deref();
        with_retry(
            &operation_name,
            &self.policy,
            &self.breaker,
            &self.cancel,
            move || self.execute_once(method, path, body, idempotency_key),
        )
        .await
    }

    /// Performs exactly one HTTP attempt.
    async fn execute_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&[u8]>,
        idempotency_key: Option<&str>,
    ) -> Result<Option<T>, Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}...", method, url);

        let mut auth_value = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::validation("api_key", "API key contains invalid characters"))?;
        auth_value.set_sensitive(true);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(AUTH_HEADER, auth_value)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            response = request.send() => response.map_err(transport_error)?,
        };

        let status = response.status().as_u16();
        let bytes = self.read_body(response).await?;
        debug!("{} {} -> {} ({} bytes)", method, url, status, bytes.len());

        if status >= 400 {
            return Err(Error::Api(ApiError::new(
                status,
                String::from_utf8_lossy(&bytes).into_owned(),
            )));
        }

        decode_body(&bytes)
    }

    async fn read_body(&self, response: Response) -> Result<Vec<u8>, Error> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            bytes = response.bytes() => bytes.map(|b| b.to_vec()).map_err(transport_error),
        }
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Transport(e)
    }
}
