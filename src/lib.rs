// ABOUTME: Main library entry point for the BillEase assistant chat core
// ABOUTME: Orchestrates image uploads, vision analysis and text-agent replies for one chat session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # BillEase Assistant
//!
//! Conversation-and-attachment orchestration for a chat assistant that answers
//! questions about BillEase. Uploaded images go to a hosted vision model; its
//! analysis is merged into the next question sent to a hosted text agent, and
//! every exchange is recorded in an append-only conversation log.
//!
//! ## Architecture
//!
//! - **Uploads**: Validated images staged in temp files, released after analysis
//! - **Analysis**: Vision client returning free-form text or the "clearer image" sentinel
//! - **Agent**: Text agent client wrapping prompts in the BillEase persona
//! - **Conversation**: Append-only turn log
//! - **Orchestrator**: The upload/submit state machine tying it together
//! - **LLM**: Provider trait and the `OpenAI`-compatible transport
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use billease_assistant::config::AssistantConfig;
//! use billease_assistant::errors::AppResult;
//! use billease_assistant::orchestrator::TurnOrchestrator;
//! use billease_assistant::session::SessionEvent;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = AssistantConfig::from_env()?;
//!     let mut orchestrator = TurnOrchestrator::from_config(&config);
//!
//!     for turn in orchestrator.dispatch(SessionEvent::submit("How do I pay my bills?")).await {
//!         println!("{}> {}", turn.role, turn.text);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub use billease_core::{constants, errors};

/// Text agent client
pub mod agent;

/// Vision model client
pub mod analysis;

/// Environment-based configuration
pub mod config;

/// Conversation log
pub mod conversation;

/// LLM provider abstraction and prompts
pub mod llm;

/// Structured logging setup
pub mod logging;

/// Upload/submit state machine
pub mod orchestrator;

/// Per-session state and events
pub mod session;

/// Upload validation and temp-file staging
pub mod uploads;
