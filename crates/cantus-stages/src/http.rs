//! Shared HTTP plumbing for the service-backed stages.
//!
//! Every stage gets its own [`ServiceClient`]: a `reqwest` client bound to
//! one URL with its own timeout and retry policy. Calls are JSON-in/JSON-out
//! or text-in/JSON-out. Transport failures, timeouts, and 5xx answers are
//! retried with exponential backoff; 4xx answers are permanent.

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::warn;

use cantus_core::{Result, RetryConfig, SynthError};

/// One service endpoint: a client bound to a URL with its own timeout.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: &'static str,
    url: String,
    client: Client,
    retry: RetryConfig,
}

impl ServiceClient {
    /// A client for a named service.
    pub fn new(
        service: &'static str,
        url: impl Into<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SynthError::config(format!("http client for '{service}': {err}")))?;
        Ok(Self {
            service,
            url: url.into(),
            client,
            retry,
        })
    }

    /// The logical service name.
    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// POST a JSON payload, decode a JSON reply.
    pub async fn invoke_json<In, Out>(&self, input: &In) -> Result<Out>
    where
        In: Serialize + Sync + ?Sized,
        Out: DeserializeOwned,
    {
        self.with_retry(|| self.call_json(input)).await
    }

    /// POST a plain-text body, decode a JSON reply.
    pub async fn invoke_text<Out>(&self, input: &str) -> Result<Out>
    where
        Out: DeserializeOwned,
    {
        self.with_retry(|| self.call_text(input)).await
    }

    async fn with_retry<Out, F, Fut>(&self, call: F) -> Result<Out>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Out>>,
    {
        let mut attempt = 0u32;
        loop {
            match call().await {
                Ok(out) => return Ok(out),
                Err(err) if attempt + 1 < self.retry.max_attempts && retryable(&err) => {
                    let delay = self.retry.delay_ms(attempt, rand::random());
                    warn!(
                        service = self.service,
                        attempt = attempt + 1,
                        delay_ms = delay,
                        error = %err,
                        "retrying service call"
                    );
                    sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn call_json<In, Out>(&self, input: &In) -> Result<Out>
    where
        In: Serialize + Sync + ?Sized,
        Out: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.url)
            .json(input)
            .send()
            .await
            .map_err(|err| SynthError::transport(self.service, err))?;
        self.decode(response).await
    }

    async fn call_text<Out>(&self, input: &str) -> Result<Out>
    where
        Out: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(input.to_owned())
            .send()
            .await
            .map_err(|err| SynthError::transport(self.service, err))?;
        self.decode(response).await
    }

    async fn decode<Out>(&self, response: Response) -> Result<Out>
    where
        Out: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(SynthError::Service {
                service: self.service.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .json::<Out>()
            .await
            .map_err(|err| SynthError::bad_response(self.service, err.to_string()))
    }
}

/// Whether a failed call may be answered differently next time.
fn retryable(err: &SynthError) -> bool {
    match err {
        SynthError::Transport { .. } => true,
        SynthError::Service { status, .. } => *status >= 500,
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
