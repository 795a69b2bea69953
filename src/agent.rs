// ABOUTME: Text agent client that sends composed BillEase prompts to the hosted reasoning model
// ABOUTME: Advertises the agent's capability list and folds call failures into an apology string
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use billease_core::constants::messages::AGENT_ERROR_PREFIX;
use tracing::{debug, error, info, instrument};

use crate::config::EndpointConfig;
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::render_agent_system_prompt;
use crate::llm::{
    ChatMessage, ChatRequest, LlmCapabilities, LlmProvider, OpenAiCompatibleConfig,
    OpenAiCompatibleProvider,
};

/// Capabilities advertised to the agent: the image-analysis tool plus the
/// baseline tool set of the hosting agent runtime
pub const AGENT_CAPABILITIES: &[&str] = &[
    "analyze_image: summarize the key details visible in an uploaded image (results arrive inside the query as \"Image analysis\")",
    "web_search: look up current information on the web, e.g. https://billease.ph/faq/",
    "visit_webpage: read the content of a web page",
    "python_interpreter: evaluate small calculations such as installment amounts",
];

/// Client for the hosted reasoning agent
pub struct TextAgentClient {
    provider: Arc<dyn LlmProvider>,
    instruction: String,
}

impl TextAgentClient {
    /// Build a client for the configured agent endpoint
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when the endpoint has no API key and the
    /// provider needs one, or an internal error if the HTTP client cannot be built.
    pub fn from_config(endpoint: &EndpointConfig) -> AppResult<Self> {
        endpoint.validate()?;
        let config = OpenAiCompatibleConfig::from_endpoint(endpoint, LlmCapabilities::text_only());
        let provider = OpenAiCompatibleProvider::new(config)?;
        Ok(Self::with_provider(Arc::new(provider)))
    }

    /// Use an existing provider
    #[must_use]
    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        info!(
            provider = provider.name(),
            model = provider.default_model(),
            capabilities = AGENT_CAPABILITIES.len(),
            "Text agent ready"
        );
        Self {
            provider,
            instruction: render_agent_system_prompt(AGENT_CAPABILITIES.iter().copied()),
        }
    }

    /// System instruction sent with every request
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Send a composed prompt and return the agent's answer
    ///
    /// Failures come back as `"Sorry, I encountered an error: <message>"`.
    /// Transport errors name the provider in their message, so a timeout
    /// reads `"Sorry, I encountered an error: Groq: request timed out"`.
    #[instrument(skip(self, composed_prompt), fields(provider = %self.provider.name(), prompt_len = composed_prompt.len()))]
    pub async fn respond(&self, composed_prompt: &str) -> String {
        match self.try_respond(composed_prompt).await {
            Ok(text) => {
                debug!(response_len = text.len(), "Agent responded");
                text
            }
            Err(e) => {
                error!("Agent call failed: {e}");
                format!("{AGENT_ERROR_PREFIX}{}", e.message)
            }
        }
    }

    async fn try_respond(&self, composed_prompt: &str) -> Result<String, AppError> {
        let request = ChatRequest::new(self.build_messages(composed_prompt));
        let response = self.provider.complete(&request).await?;
        Ok(response.content)
    }

    fn build_messages(&self, composed_prompt: &str) -> Vec<ChatMessage> {
        if self.provider.capabilities().supports_system_messages() {
            vec![
                ChatMessage::system(self.instruction.as_str()),
                ChatMessage::user(composed_prompt),
            ]
        } else {
            vec![ChatMessage::user(format!(
                "{}\n\n{composed_prompt}",
                self.instruction
            ))]
        }
    }
}
