// ABOUTME: Generic OpenAI-compatible LLM provider used for both vision and text-agent calls
// ABOUTME: Sends multimodal chat completions with optional timeout and bounded retry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `OpenAI`-Compatible Provider
//!
//! Generic implementation for any `OpenAI`-compatible chat completions endpoint
//! (Groq, Ollama, vLLM, `LocalAI`). Image attachments are sent as `image_url`
//! content parts holding a base64 `data:` URI.
//!
//! Remote calls have no timeout and no retry unless the endpoint configuration
//! sets them. Only transient failures (connection errors, timeouts, 429 and
//! 5xx responses) are retried.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use super::{ChatMessage, ChatRequest, ChatResponse, LlmCapabilities, LlmProvider};
use crate::config::{EndpointConfig, LlmProviderType};
use crate::errors::{AppError, ErrorCode};

// ============================================================================
// API Request/Response Types (OpenAI-compatible format)
// ============================================================================

/// OpenAI-compatible API request structure
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
}

/// Message structure for OpenAI-compatible API
#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: OpenAiContent,
}

/// Plain text for text-only messages, content parts when images are attached
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Debug, Serialize)]
struct OpenAiImageUrl {
    url: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        let content = if msg.images.is_empty() {
            OpenAiContent::Text(msg.content.clone())
        } else {
            let mut parts = Vec::with_capacity(msg.images.len() + 1);
            parts.push(OpenAiContentPart::Text {
                text: msg.content.clone(),
            });
            parts.extend(msg.images.iter().map(|image| OpenAiContentPart::ImageUrl {
                image_url: OpenAiImageUrl {
                    url: image.data_uri(),
                },
            }));
            OpenAiContent::Parts(parts)
        };

        Self {
            role: msg.role.as_str(),
            content,
        }
    }
}

/// OpenAI-compatible API response structure
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

/// Choice in response
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

/// Message in response
#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

/// Usage statistics in response
#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: u32,
}

/// Error response structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for the `OpenAI`-compatible provider
#[derive(Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL for the API (e.g., <https://api.groq.com/openai/v1>)
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Default model to use
    pub default_model: String,
    /// Provider name for logging
    pub provider_name: String,
    /// Provider display name, also used as the service name in errors
    pub display_name: String,
    /// Capabilities of this provider
    pub capabilities: LlmCapabilities,
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    pub retry_backoff: Duration,
}

impl OpenAiCompatibleConfig {
    /// Build a provider configuration from one endpoint of the assistant config
    #[must_use]
    pub fn from_endpoint(endpoint: &EndpointConfig, capabilities: LlmCapabilities) -> Self {
        let (provider_name, display_name) = match endpoint.provider {
            LlmProviderType::Groq => ("groq", "Groq"),
            LlmProviderType::Local => ("local", "Local LLM"),
        };

        Self {
            base_url: endpoint.base_url.clone(),
            api_key: endpoint.api_key.clone(),
            default_model: endpoint.model.clone(),
            provider_name: provider_name.to_owned(),
            display_name: display_name.to_owned(),
            capabilities,
            request_timeout: endpoint.request_timeout,
            max_retries: endpoint.max_retries,
            retry_backoff: endpoint.retry_backoff,
        }
    }
}

impl Debug for OpenAiCompatibleConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiCompatibleConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("default_model", &self.default_model)
            .field("provider_name", &self.provider_name)
            .field("capabilities", &self.capabilities)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Generic `OpenAI`-compatible LLM provider
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        info!(
            "Initializing {} provider: base_url={}, model={}",
            config.display_name, config.base_url, config.default_model
        );

        Ok(Self { client, config })
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// Add authorization header if API key is configured
    fn add_auth_header(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("Bearer {api_key}"))
        } else {
            request
        }
    }

    /// Map a transport failure to an error, marking connect and timeout failures transient
    fn transport_error(&self, e: &reqwest::Error) -> AppError {
        let service = self.config.display_name.as_str();
        if e.is_timeout() {
            AppError::external_unavailable(service, "request timed out")
        } else if e.is_connect() {
            AppError::external_unavailable(
                service,
                format!("Cannot connect to {}", self.config.base_url),
            )
        } else {
            AppError::external_service(service, format!("Failed to connect: {e}"))
        }
    }

    /// Parse error response from API
    fn parse_error_response(service: &str, status: StatusCode, body: &str) -> AppError {
        let (detail, error_type) = serde_json::from_str::<OpenAiErrorResponse>(body).map_or_else(
            |_| (body.chars().take(200).collect::<String>(), None),
            |parsed| (parsed.error.message, parsed.error.error_type),
        );

        match status.as_u16() {
            401 | 403 => AppError::auth_invalid(format!("{service}: authentication failed: {detail}")),
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                format!("{service}: rate limit reached: {detail}"),
            ),
            400 => AppError::invalid_input(format!("{service}: request rejected: {detail}")),
            404 => AppError::not_found(format!("Model or endpoint ({detail})")),
            500..=599 => AppError::external_unavailable(
                service,
                format!("service unavailable ({status}): {detail}"),
            ),
            _ => AppError::external_service(
                service,
                format!(
                    "{} - {detail}",
                    error_type.as_deref().unwrap_or("unknown")
                ),
            ),
        }
    }

    /// Issue a single chat completion request without retrying
    async fn complete_once(&self, body: &OpenAiRequest) -> Result<ChatResponse, AppError> {
        let service = self.config.display_name.as_str();
        let http_request = self
            .client
            .post(self.api_url("chat/completions"))
            .header("Content-Type", "application/json")
            .json(body);

        let response = self
            .add_auth_header(http_request)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request to {}: {}", self.config.provider_name, e);
                self.transport_error(&e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!("Failed to read API response: {}", e);
            self.transport_error(&e)
        })?;

        if !status.is_success() {
            return Err(Self::parse_error_response(service, status, &text));
        }

        let parsed: OpenAiResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse API response: {}", e);
            AppError::external_service(service, format!("Failed to parse response: {e}"))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external_service(service, "API returned no choices"))?;

        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::external_service(service, "API returned an empty message"))?;

        debug!(
            total_tokens = parsed.usage.map(|u| u.total_tokens),
            "Received response from {}: {} chars, finish_reason: {:?}",
            self.config.provider_name,
            content.len(),
            choice.finish_reason
        );

        Ok(ChatResponse { content })
    }

    /// Delay before retry number `attempt` (1-based)
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.config
            .retry_backoff
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    fn display_name(&self) -> &str {
        &self.config.display_name
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.config.capabilities
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(provider = %self.config.provider_name, model = %self.config.default_model))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        if request.has_images() && !self.config.capabilities.supports_vision() {
            return Err(AppError::invalid_input(format!(
                "{} is not configured for image input",
                self.config.display_name
            )));
        }

        let body = OpenAiRequest {
            model: self.config.default_model.clone(),
            messages: request.messages.iter().map(OpenAiMessage::from).collect(),
            stream: false,
        };

        debug!(
            "Sending chat completion request to {} with {} messages",
            self.config.provider_name,
            body.messages.len()
        );

        let mut attempt = 0;
        loop {
            match self.complete_once(&body).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_for(attempt);
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Transient failure from {}: {}; retrying",
                        self.config.provider_name,
                        e.message
                    );
                    sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
