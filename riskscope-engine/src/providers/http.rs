//! HTTP client for an external model host.
//!
//! Each signal kind is served at `POST {endpoint}/v1/analyze/{kind}` with a
//! `{ "content", "context" }` body; the response body is the raw output for
//! that kind. Recoverable failures are retried with exponential backoff.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::{ProviderContext, ProviderError, ProviderOutput, SignalProvider};
use crate::types::SignalKind;
use riskscope_common::ProvidersConfig;

/// Upper bound for a single backoff delay.
const MAX_BACKOFF_MS: u64 = 10_000;

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    content: &'a str,
    context: &'a ProviderContext,
}

/// Signal provider backed by a remote model host.
pub struct HttpSignalProvider {
    kind: SignalKind,
    name: String,
    client: reqwest::Client,
    url: String,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl HttpSignalProvider {
    pub fn new(
        kind: SignalKind,
        endpoint: &str,
        config: &ProvidersConfig,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("http client: {e}")))?;

        Ok(Self {
            kind,
            name: format!("http-{kind}"),
            client,
            url: format!("{}/v1/analyze/{}", endpoint.trim_end_matches('/'), kind),
            max_retries: config.max_retries,
            base_backoff_ms: config.retry_backoff_ms,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .base_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(MAX_BACKOFF_MS);
        Duration::from_millis(delay_ms)
    }

    async fn call_once(
        &self,
        content: &str,
        context: &ProviderContext,
    ) -> Result<ProviderOutput, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AnalyzeRequest { content, context })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        ProviderOutput::from_json(self.kind, value)
    }
}

#[async_trait]
impl SignalProvider for HttpSignalProvider {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        content: &str,
        context: &ProviderContext,
    ) -> Result<ProviderOutput, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.call_once(content, context).await {
                Ok(output) => {
                    if attempt > 0 {
                        tracing::info!(
                            provider = %self.name,
                            job_id = %context.job_id,
                            attempt = attempt + 1,
                            "Provider recovered after retries"
                        );
                    }
                    return Ok(output);
                }
                Err(e) if e.is_recoverable() && attempt < self.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        provider = %self.name,
                        job_id = %context.job_id,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
