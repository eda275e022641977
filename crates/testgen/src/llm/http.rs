use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use testgen_core::llm::Provider;
use testgen_core::text::truncate;

use super::{DispatchError, ModelBackend, API_KEY_VARIABLE};
use crate::config::LlmConfig;

/// Characters of an error body kept in diagnostics.
const ERROR_BODY_CHARS: usize = 200;

/// A provider reached over HTTP with a single POST per prompt.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    provider: Provider,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DispatchError::UnexpectedBackendError {
                backend: config.provider.name(),
                detail: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            provider: config.provider,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            http,
        })
    }

    fn unreachable(&self, model: &str, err: &reqwest::Error) -> DispatchError {
        let detail = if err.is_timeout() {
            format!("timed out after {:?}", self.timeout)
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };

        DispatchError::BackendUnreachable {
            backend: self.provider.name(),
            model: model.to_string(),
            detail,
        }
    }

    fn unexpected(&self, detail: impl Into<String>) -> DispatchError {
        DispatchError::UnexpectedBackendError {
            backend: self.provider.name(),
            detail: detail.into(),
        }
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, DispatchError> {
        let api_key = self.api_key.as_deref();
        if self.provider.requires_api_key() && api_key.is_none() {
            return Err(DispatchError::MissingCredential {
                backend: self.provider.name(),
                variable: API_KEY_VARIABLE,
            });
        }

        let url = self.provider.endpoint(&self.base_url, model);
        let mut request = self
            .http
            .post(&url)
            .json(&self.provider.request_body(prompt, model));
        for (name, value) in self.provider.auth_headers(api_key) {
            request = request.header(name, value);
        }

        log::info!(
            "Sending prompt to {} with model {} ({} chars)",
            self.provider,
            model,
            prompt.len()
        );

        let response = request
            .send()
            .await
            .map_err(|e| self.unreachable(model, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unexpected(format!(
                "[{}] {}",
                status,
                truncate(&body, ERROR_BODY_CHARS)
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.unreachable(model, &e)
            } else {
                self.unexpected(format!("Failed to parse response: {e}"))
            }
        })?;

        let text = self.provider.response_text(&body);
        log::debug!("Raw response from {}:\n{}", self.provider, text);

        if text.is_empty() {
            log::warn!("{} returned an empty response", self.provider);
            return Err(DispatchError::EmptyResponse {
                backend: self.provider.name(),
                model: model.to_string(),
            });
        }

        Ok(text)
    }
}

impl ModelBackend for HttpBackend {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn send<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> BoxFuture<'a, Result<String, DispatchError>> {
        Box::pin(self.generate(prompt, model))
    }
}
