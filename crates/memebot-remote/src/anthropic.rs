// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Meme descriptions from the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use memebot_config::model::DescriberConfig;
use memebot_core::{Describer, HealthStatus, MemebotError, PluginAdapter};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{build_client, request_error, status_error};

const SERVICE: &str = "anthropic";

const API_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You explain internet memes. Given a meme name, describe in two or \
three short sentences what the image shows, where it comes from, and how people use it. Plain \
text, no markdown.";

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    type_: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct AnthropicDescriber {
    client: reqwest::Client,
    url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl AnthropicDescriber {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, MemebotError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| MemebotError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        Ok(Self {
            client: build_client(SERVICE, timeout, headers)?,
            url: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            model: model.to_string(),
            max_tokens,
            timeout,
        })
    }

    /// Build from `[describer]`, falling back to `ANTHROPIC_API_KEY`.
    ///
    /// A missing key is a configuration error.
    pub fn from_config(config: &DescriberConfig) -> Result<Self, MemebotError> {
        let api_key = resolve_api_key(config, std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| MemebotError::Config("describer.api_key is not set".to_string()))?;
        Self::new(
            &api_key,
            &config.base_url,
            &config.model,
            config.max_tokens,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

fn resolve_api_key(config: &DescriberConfig, env_key: Option<String>) -> Option<String> {
    config
        .api_key
        .clone()
        .or(env_key)
        .filter(|k| !k.trim().is_empty())
}

#[async_trait]
impl PluginAdapter for AnthropicDescriber {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn health_check(&self) -> Result<HealthStatus, MemebotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MemebotError> {
        Ok(())
    }
}

#[async_trait]
impl Describer for AnthropicDescriber {
    async fn describe(&self, name: &str) -> Result<String, MemebotError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![ApiMessage {
                role: "user",
                content: format!("Describe the meme \"{name}\"."),
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, self.timeout, e))?;
        let status = response.status();
        debug!(%status, model = %self.model, "description response received");

        let body = response
            .text()
            .await
            .map_err(|e| request_error(SERVICE, self.timeout, e))?;
        if !status.is_success() {
            let detail = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("{}: {}", api_err.error.type_, api_err.error.message),
                Err(_) => body,
            };
            return Err(status_error(SERVICE, status, detail));
        }

        let parsed: MessageResponse =
            serde_json::from_str(&body).map_err(|e| MemebotError::Remote {
                service: SERVICE.to_string(),
                message: format!("failed to parse API response: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;
        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(MemebotError::remote(SERVICE, "empty description"));
        }
        Ok(text)
    }
}

/// Stand-in when no API key is configured. Every call is
/// [`MemebotError::ResourceUnavailable`].
#[derive(Debug, Default)]
pub struct UnavailableDescriber;

#[async_trait]
impl PluginAdapter for UnavailableDescriber {
    fn name(&self) -> &str {
        "describer-unavailable"
    }

    async fn health_check(&self) -> Result<HealthStatus, MemebotError> {
        Ok(HealthStatus::Degraded("describer.api_key is not set".to_string()))
    }

    async fn shutdown(&self) -> Result<(), MemebotError> {
        Ok(())
    }
}

#[async_trait]
impl Describer for UnavailableDescriber {
    async fn describe(&self, _name: &str) -> Result<String, MemebotError> {
        Err(MemebotError::ResourceUnavailable(
            "meme descriptions are not configured".to_string(),
        ))
    }
}
