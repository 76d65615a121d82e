//! Model provider client: a trait so agents never depend on a concrete HTTP
//! stack directly, a deterministic mock for tests and offline operation, and
//! a `reqwest`-backed client with exponential-backoff retry for real
//! providers. Grounded on the teacher's outbound-call patterns in
//! `agents/cost_forecasting/agent.rs` (constructor + `with_defaults`).

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use serde::Serialize;

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String>;
}

/// Deterministic stand-in used when no provider is configured, or in tests.
/// Echoes back a templated artifact derived from the prompt so agent logic
/// downstream of the model call (warranty injection, clause checks) has
/// stable, reproducible text to operate on.
pub struct MockModelClient;

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        Ok(format!("Drafted response based on the following request:\n{user_prompt}"))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint, with up
/// to 3 attempts and a 1s initial backoff.
pub struct HttpModelClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl HttpModelClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_max_elapsed_time(Some(Duration::from_secs(10)))
            .build();

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
        };

        let response = retry(backoff, || async {
            let resp = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(anyhow!(e)))?;

            if resp.status().is_server_error() {
                return Err(backoff::Error::transient(anyhow!("model provider returned {}", resp.status())));
            }
            if !resp.status().is_success() {
                return Err(backoff::Error::permanent(anyhow!("model provider returned {}", resp.status())));
            }

            resp.json::<ChatResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(anyhow!(e)))
        })
        .await
        .context("model provider call failed after retries")?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("model provider returned no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_echoes_prompt() {
        let client = MockModelClient;
        let out = client.complete("system", "negotiate with Acme").await.unwrap();
        assert!(out.contains("negotiate with Acme"));
    }
}
