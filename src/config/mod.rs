// ABOUTME: Configuration management module for the assistant's model endpoints
// ABOUTME: Re-exports provider selection types and the environment-loaded AssistantConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Configuration module for the BillEase assistant
//!
//! - **Types**: Provider family and endpoint role enums with their presets
//! - **Environment**: `AssistantConfig` loaded from environment variables

/// Environment-based configuration
pub mod environment;
/// Provider and role enums
pub mod types;

pub use environment::{
    AssistantConfig, EndpointConfig, MAX_RETRIES_ENV, REQUEST_TIMEOUT_ENV, RETRY_BACKOFF_ENV,
};
pub use types::{EndpointRole, LlmProviderType};
