// ABOUTME: Per-session chat state: conversation log, state machine position and retained analysis
// ABOUTME: Defines the Upload/Submit events a presentation layer feeds to the orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::analysis::AnalysisResult;
use crate::conversation::ConversationStore;
use crate::uploads::PendingImage;

/// Position of a session in the upload/query cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No analysis waiting to be used
    #[default]
    Idle,
    /// An upload is being analyzed
    ImagePendingAnalysis,
    /// An analysis is retained for the next text query
    AwaitingTextQuery,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Idle => "idle",
            Self::ImagePendingAnalysis => "image_pending_analysis",
            Self::AwaitingTextQuery => "awaiting_text_query",
        };
        f.write_str(name)
    }
}

/// Input produced by the presentation layer
#[derive(Debug)]
pub enum SessionEvent {
    /// An image was uploaded on its own
    Upload(PendingImage),
    /// A chat message was submitted, optionally with an image
    Submit {
        /// The user's message
        text: String,
        /// Image attached to this exact submission
        image: Option<PendingImage>,
    },
}

impl SessionEvent {
    /// Text submission without an attachment
    #[must_use]
    pub fn submit(text: impl Into<String>) -> Self {
        Self::Submit {
            text: text.into(),
            image: None,
        }
    }

    /// Text submission carrying an image
    #[must_use]
    pub fn submit_with_image(text: impl Into<String>, image: PendingImage) -> Self {
        Self::Submit {
            text: text.into(),
            image: Some(image),
        }
    }
}

/// Everything one chat session owns
///
/// There is exactly one context per session and it is only reachable through
/// `&mut` on the orchestrator, so events are processed one at a time.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub(crate) store: ConversationStore,
    pub(crate) state: SessionState,
    pub(crate) last_analysis: Option<AnalysisResult>,
    pub(crate) startup_notice: Option<String>,
}

impl SessionContext {
    /// Fresh session, optionally carrying a notice to show once
    #[must_use]
    pub fn new(startup_notice: Option<String>) -> Self {
        Self {
            startup_notice,
            ..Self::default()
        }
    }

    /// Conversation so far
    #[must_use]
    pub const fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Analysis waiting to be merged into the next text query
    #[must_use]
    pub const fn last_analysis(&self) -> Option<&AnalysisResult> {
        self.last_analysis.as_ref()
    }

    /// Take the startup notice; later calls return `None`
    pub fn startup_notice(&mut self) -> Option<String> {
        self.startup_notice.take()
    }
}
