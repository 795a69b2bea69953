// ABOUTME: Append-only conversation log of user and assistant turns for one chat session
// ABOUTME: Turns carry an id, timestamp and optional image reference and are never mutated
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::uploads::ImageRef;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The person chatting
    User,
    /// The assistant
    Assistant,
}

impl TurnRole {
    /// Lowercase label used by the presentation layer
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl Display for TurnRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One conversation entry
///
/// Only user turns can reference an image; the constructors make an assistant
/// turn with an attachment unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn identifier
    pub id: Uuid,
    /// Author of the turn
    pub role: TurnRole,
    /// Displayed message content
    pub text: String,
    /// Upload that accompanied this turn, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_image: Option<ImageRef>,
    /// When the turn was recorded
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn
    #[must_use]
    pub fn user(text: impl Into<String>, attached_image: Option<ImageRef>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: TurnRole::User,
            text: text.into(),
            attached_image,
            created_at: Utc::now(),
        }
    }

    /// Create an assistant turn
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: TurnRole::Assistant,
            text: text.into(),
            attached_image: None,
            created_at: Utc::now(),
        }
    }
}

/// Ordered, append-only log of turns
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    /// Create an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn at the end of the log
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns in insertion order
    #[must_use]
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent turn
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_turn_has_no_image() {
        let turn = Turn::assistant("Hello");
        assert_eq!(turn.role, TurnRole::Assistant);
        assert!(turn.attached_image.is_none());
    }

    #[test]
    fn test_turn_serializes_lowercase_role() {
        let json = serde_json::to_value(Turn::user("hi", None)).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("attached_image").is_none());
    }
}
