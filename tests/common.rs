// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides a scripted LLM provider, image fixtures and an orchestrator builder
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `billease_assistant`

use std::collections::VecDeque;
use std::env;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use billease_assistant::agent::TextAgentClient;
use billease_assistant::analysis::ImageAnalysisClient;
use billease_assistant::errors::AppError;
use billease_assistant::llm::{ChatRequest, ChatResponse, LlmCapabilities, LlmProvider};
use billease_assistant::orchestrator::TurnOrchestrator;
use billease_assistant::uploads::PendingImage;
use tracing::Level;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

// ============================================================================
// Image Fixtures
// ============================================================================

/// PNG signature followed by the start of an IHDR chunk
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

/// JPEG SOI marker followed by a JFIF APP0 header
pub const JPEG_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01,
];

/// Stage a PNG upload
pub fn png_upload(file_name: &str) -> PendingImage {
    PendingImage::from_bytes(file_name, PNG_BYTES).unwrap()
}

/// Stage a JPEG upload
pub fn jpeg_upload(file_name: &str) -> PendingImage {
    PendingImage::from_bytes(file_name, JPEG_BYTES).unwrap()
}

// ============================================================================
// Scripted Provider
// ============================================================================

/// Provider that replays queued replies and records every request
pub struct ScriptedProvider {
    name: String,
    capabilities: LlmCapabilities,
    replies: Mutex<VecDeque<Result<String, AppError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    /// Provider accepting images
    pub fn vision() -> Arc<Self> {
        Arc::new(Self::new("scripted-vision", LlmCapabilities::multimodal()))
    }

    /// Text-only provider
    pub fn text() -> Arc<Self> {
        Arc::new(Self::new("scripted-agent", LlmCapabilities::text_only()))
    }

    pub fn new(name: &str, capabilities: LlmCapabilities) -> Self {
        Self {
            name: name.to_owned(),
            capabilities,
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn reply(&self, text: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_owned()));
        self
    }

    /// Queue a failure
    pub fn fail(&self, error: AppError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    /// Number of completions requested so far
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Copy of every request received
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Content of the last user message of the most recent request
    pub fn last_user_content(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("no request recorded");
        request
            .messages
            .iter()
            .rev()
            .find(|m| m.role.as_str() == "user")
            .map(|m| m.content.clone())
            .expect("no user message")
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.capabilities
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("OK".to_owned()));
        reply.map(|content| ChatResponse { content })
    }
}

/// Orchestrator wired to two scripted providers
pub fn scripted_orchestrator(
    vision: &Arc<ScriptedProvider>,
    agent: &Arc<ScriptedProvider>,
) -> TurnOrchestrator {
    init_test_logging();
    let vision_client = ImageAnalysisClient::with_provider(vision.clone()).unwrap();
    let agent_client = TextAgentClient::with_provider(agent.clone());
    TurnOrchestrator::new(vision_client, agent_client)
}
