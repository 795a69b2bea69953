// ABOUTME: Core configuration type definitions for model endpoints
// ABOUTME: Contains the LlmProviderType and EndpointRole enums with their provider presets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// LLM provider selection for both assistant clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// Groq cloud inference over its `OpenAI`-compatible API (default)
    #[default]
    Groq,
    /// Local `OpenAI`-compatible endpoint (Ollama, vLLM, `LocalAI`)
    Local,
}

impl LlmProviderType {
    /// Environment variable name for provider selection
    pub const ENV_VAR: &'static str = "BILLEASE_LLM_PROVIDER";

    /// Parse from string with fallback to default
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" | "vllm" | "localai" => Self::Local,
            _ => Self::Groq,
        }
    }

    /// Base URL used when none is configured
    #[must_use]
    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Local => "http://localhost:11434/v1",
        }
    }

    /// Provider-wide API key variable consulted after the per-role one
    #[must_use]
    pub const fn api_key_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::Local => "LOCAL_LLM_API_KEY",
        }
    }

    /// Whether calls are rejected without an API key
    #[must_use]
    pub const fn requires_api_key(&self) -> bool {
        matches!(self, Self::Groq)
    }

    /// Default model for a given role
    #[must_use]
    pub const fn default_model(&self, role: EndpointRole) -> &'static str {
        match (self, role) {
            (Self::Groq, EndpointRole::Agent) => "llama-3.3-70b-versatile",
            (Self::Groq, EndpointRole::Vision) => "meta-llama/llama-4-scout-17b-16e-instruct",
            (Self::Local, EndpointRole::Agent) => "qwen2.5:14b-instruct",
            (Self::Local, EndpointRole::Vision) => "llama3.2-vision:11b",
        }
    }
}

impl Display for LlmProviderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Groq => write!(f, "groq"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Which assistant client an endpoint serves
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    /// The text agent answering user queries
    Agent,
    /// The vision model describing uploaded images
    Vision,
}

impl EndpointRole {
    /// Prefix of this role's environment variables
    #[must_use]
    pub const fn env_prefix(&self) -> &'static str {
        match self {
            Self::Agent => "BILLEASE_AGENT",
            Self::Vision => "BILLEASE_VISION",
        }
    }
}

impl Display for EndpointRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Agent => write!(f, "agent"),
            Self::Vision => write!(f, "vision"),
        }
    }
}
