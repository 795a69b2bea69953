// ABOUTME: Image analysis client that sends one staged upload to the hosted vision model
// ABOUTME: Folds every failure into an "Error analyzing image" result instead of returning errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Image Analysis
//!
//! [`ImageAnalysisClient::analyze`] never fails: transport errors, service
//! errors and unreadable temp files all come back as an [`AnalysisResult`]
//! whose text starts with `"Error analyzing image: "`. The caller shows that
//! text to the user like any other analysis.

use std::sync::Arc;

use billease_core::constants::messages::{ANALYSIS_ERROR_PREFIX, UNCLEAR_IMAGE_SENTINEL};
use tracing::{debug, error, instrument, warn};

use crate::config::EndpointConfig;
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::vision_instruction;
use crate::llm::{
    ChatMessage, ChatRequest, LlmCapabilities, LlmProvider, OpenAiCompatibleConfig,
    OpenAiCompatibleProvider,
};
use crate::uploads::PendingImage;

/// Text returned by the vision model for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    text: String,
}

impl AnalysisResult {
    /// Wrap raw analysis text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Result describing a failed analysis
    #[must_use]
    pub fn from_error(error: &AppError) -> Self {
        Self::new(format!("{ANALYSIS_ERROR_PREFIX}{}", error.message))
    }

    /// Raw text as returned
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the model answered with the "clearer image" sentinel
    #[must_use]
    pub fn is_unclear(&self) -> bool {
        self.text == UNCLEAR_IMAGE_SENTINEL
    }
}

/// Client for the hosted vision model
pub struct ImageAnalysisClient {
    backend: Result<Arc<dyn LlmProvider>, String>,
}

impl ImageAnalysisClient {
    /// Build a client for the configured vision endpoint
    ///
    /// A configuration problem does not fail construction: the client is kept
    /// and every analysis reports the problem as its result.
    #[must_use]
    pub fn from_config(endpoint: &EndpointConfig) -> Self {
        let backend = Self::build_provider(endpoint).map_err(|e| {
            warn!("Vision client unavailable: {}", e.message);
            e.message
        });
        Self { backend }
    }

    fn build_provider(endpoint: &EndpointConfig) -> AppResult<Arc<dyn LlmProvider>> {
        endpoint.validate()?;
        let config = OpenAiCompatibleConfig::from_endpoint(endpoint, LlmCapabilities::multimodal());
        Ok(Arc::new(OpenAiCompatibleProvider::new(config)?))
    }

    /// Use an existing provider
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the provider does not accept images.
    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> AppResult<Self> {
        if !provider.capabilities().supports_vision() {
            return Err(AppError::invalid_input(format!(
                "{} does not support image input",
                provider.display_name()
            )));
        }
        Ok(Self {
            backend: Ok(provider),
        })
    }

    /// Analyze one staged image
    #[instrument(skip(self, image), fields(upload_id = %image.image_ref().id))]
    pub async fn analyze(&self, image: &PendingImage) -> AnalysisResult {
        match self.try_analyze(image).await {
            Ok(result) => {
                debug!(unclear = result.is_unclear(), "Image analysis completed");
                result
            }
            Err(e) => {
                error!("Image analysis failed: {e}");
                AnalysisResult::from_error(&e)
            }
        }
    }

    async fn try_analyze(&self, image: &PendingImage) -> AppResult<AnalysisResult> {
        let provider = self
            .backend
            .as_ref()
            .map_err(|reason| AppError::config(reason.clone()))?;
        let message = ChatMessage::user(vision_instruction()).with_image(image.to_attachment()?);
        let response = provider.complete(&ChatRequest::new(vec![message])).await?;
        Ok(AnalysisResult::new(response.content))
    }
}
