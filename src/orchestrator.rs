// ABOUTME: Turn orchestrator deciding which model to call for each upload or chat submission
// ABOUTME: Merges image analyses into agent prompts, appends turns and releases staged uploads
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Turn Orchestration
//!
//! State machine over [`SessionState`]:
//!
//! - **Upload**: `Idle`/`AwaitingTextQuery` → `ImagePendingAnalysis` → analyze
//!   once, record two turns, release the upload → `AwaitingTextQuery`
//! - **Submit**: any state → merge the retained analysis (or analyze the
//!   attached image) into the prompt, ask the agent, record two turns → `Idle`
//!
//! A retained analysis is consumed by the first submission after the upload.
//! Client failures are recorded as turn text; no handler returns an error.

use billease_core::constants::messages::{
    AGENT_UNAVAILABLE, ANALYSIS_PREFIX, IMAGE_CONTEXT_PREFIX, IMAGE_CONTEXT_QUERY, IMAGE_UPLOADED,
};
use tracing::{info, instrument, warn};

use crate::agent::TextAgentClient;
use crate::analysis::{AnalysisResult, ImageAnalysisClient};
use crate::config::AssistantConfig;
use crate::conversation::Turn;
use crate::errors::AppResult;
use crate::llm::prompts::render_persona_prompt;
use crate::session::{SessionContext, SessionEvent, SessionState};
use crate::uploads::PendingImage;

/// The text agent, or why it could not be built
pub enum AgentSlot {
    /// Agent ready to answer
    Ready(TextAgentClient),
    /// Construction failed; every text turn gets the fixed apology
    Unavailable(String),
}

impl From<TextAgentClient> for AgentSlot {
    fn from(agent: TextAgentClient) -> Self {
        Self::Ready(agent)
    }
}

impl From<AppResult<TextAgentClient>> for AgentSlot {
    fn from(result: AppResult<TextAgentClient>) -> Self {
        match result {
            Ok(agent) => Self::Ready(agent),
            Err(e) => Self::Unavailable(e.message),
        }
    }
}

/// Build the query text for an image-backed question
#[must_use]
pub fn compose_context(analysis: &str, user_text: &str) -> String {
    format!("{IMAGE_CONTEXT_PREFIX}{analysis}{IMAGE_CONTEXT_QUERY}{user_text}")
}

/// Text of the assistant turn that presents an analysis
#[must_use]
pub fn analysis_turn_text(analysis: &AnalysisResult) -> String {
    if analysis.is_unclear() {
        analysis.text().to_owned()
    } else {
        format!("{ANALYSIS_PREFIX}{}", analysis.text())
    }
}

/// Drives one chat session
pub struct TurnOrchestrator {
    context: SessionContext,
    vision: ImageAnalysisClient,
    agent: AgentSlot,
}

impl TurnOrchestrator {
    /// Create an orchestrator around two clients
    ///
    /// An unavailable agent becomes the session's startup notice.
    #[must_use]
    pub fn new(vision: ImageAnalysisClient, agent: impl Into<AgentSlot>) -> Self {
        let agent = agent.into();
        let startup_notice = match &agent {
            AgentSlot::Ready(_) => None,
            AgentSlot::Unavailable(reason) => {
                warn!("Text agent unavailable for this session: {reason}");
                Some(format!("Error creating agent: {reason}"))
            }
        };
        Self {
            context: SessionContext::new(startup_notice),
            vision,
            agent,
        }
    }

    /// Build both clients from configuration
    #[must_use]
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(
            ImageAnalysisClient::from_config(&config.vision),
            TextAgentClient::from_config(&config.agent),
        )
    }

    /// Session state and conversation
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Take the one-time startup notice
    pub fn startup_notice(&mut self) -> Option<String> {
        self.context.startup_notice()
    }

    /// Whether text turns reach the agent
    #[must_use]
    pub const fn agent_available(&self) -> bool {
        matches!(self.agent, AgentSlot::Ready(_))
    }

    /// Process one event and return the turns it appended
    pub async fn dispatch(&mut self, event: SessionEvent) -> &[Turn] {
        match event {
            SessionEvent::Upload(image) => self.handle_upload(image).await,
            SessionEvent::Submit { text, image } => self.handle_submit(text, image).await,
        }
    }

    /// Analyze a bare upload and record it
    #[instrument(skip(self, image), fields(upload_id = %image.image_ref().id))]
    pub async fn handle_upload(&mut self, image: PendingImage) -> &[Turn] {
        let start = self.context.store.len();
        self.context.last_analysis = None;
        self.transition(SessionState::ImagePendingAnalysis);

        let analysis = self.vision.analyze(&image).await;
        let image_ref = image.image_ref().clone();
        release_upload(image);

        self.context
            .store
            .append(Turn::user(IMAGE_UPLOADED, Some(image_ref)));
        self.context
            .store
            .append(Turn::assistant(analysis_turn_text(&analysis)));

        info!(unclear = analysis.is_unclear(), "Upload analyzed");
        self.context.last_analysis = Some(analysis);
        self.transition(SessionState::AwaitingTextQuery);

        &self.context.store.all()[start..]
    }

    /// Answer a chat message and record it
    #[instrument(skip(self, text, image), fields(text_len = text.len(), has_image = image.is_some()))]
    pub async fn handle_submit(&mut self, text: String, image: Option<PendingImage>) -> &[Turn] {
        let start = self.context.store.len();
        let retained = self.context.last_analysis.take();
        let image_ref = image.as_ref().map(|pending| pending.image_ref().clone());

        let response = match &self.agent {
            AgentSlot::Unavailable(_) => {
                if let Some(pending) = image {
                    release_upload(pending);
                }
                AGENT_UNAVAILABLE.to_owned()
            }
            AgentSlot::Ready(agent) => {
                let context = match (retained, image) {
                    (Some(analysis), image) => {
                        if let Some(pending) = image {
                            release_upload(pending);
                        }
                        info!("Merging retained image analysis into query");
                        compose_context(analysis.text(), &text)
                    }
                    (None, Some(pending)) => {
                        let analysis = self.vision.analyze(&pending).await;
                        release_upload(pending);
                        info!("Merging attached image analysis into query");
                        compose_context(analysis.text(), &text)
                    }
                    (None, None) => text.clone(),
                };
                agent.respond(&render_persona_prompt(&context)).await
            }
        };

        self.context.store.append(Turn::user(text, image_ref));
        self.context.store.append(Turn::assistant(response));
        self.transition(SessionState::Idle);

        &self.context.store.all()[start..]
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = %self.context.state, to = %next, "Session state transition");
        self.context.state = next;
    }
}

/// Free a staged upload, logging cleanup failures
fn release_upload(image: PendingImage) {
    let upload_id = image.image_ref().id;
    if let Err(e) = image.release() {
        warn!(%upload_id, "Failed to release upload: {}", e.message);
    }
}
