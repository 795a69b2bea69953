// ABOUTME: Environment-based configuration for the assistant's model endpoints
// ABOUTME: Resolves base URLs, credentials, models, timeouts and retry bounds per client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment configuration
//!
//! Configuration is read from environment variables only. Every variable is
//! optional; a missing API key is not a load error but makes the affected
//! client fail at construction time.

use std::env;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, info};

use super::types::{EndpointRole, LlmProviderType};
use crate::errors::{AppError, AppResult};
use crate::logging::LoggingConfig;

/// Per-request timeout in seconds, shared by both endpoints (unset: no timeout)
pub const REQUEST_TIMEOUT_ENV: &str = "BILLEASE_REQUEST_TIMEOUT_SECS";

/// Extra attempts after a transient failure (default 0)
pub const MAX_RETRIES_ENV: &str = "BILLEASE_MAX_RETRIES";

/// Delay before the first retry in milliseconds
pub const RETRY_BACKOFF_ENV: &str = "BILLEASE_RETRY_BACKOFF_MS";

/// Default delay before the first retry when retries are enabled
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Connection settings for one hosted model
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Which client this endpoint serves
    pub role: EndpointRole,
    /// Provider family, selects defaults
    pub provider: LlmProviderType,
    /// Base URL of the `OpenAI`-compatible API
    pub base_url: String,
    /// API key, if one was configured
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    /// Delay before the first retry
    pub retry_backoff: Duration,
}

impl EndpointConfig {
    /// Defaults for a provider and role with no credentials, timeout or retries
    #[must_use]
    pub fn defaults(provider: LlmProviderType, role: EndpointRole) -> Self {
        Self {
            role,
            provider,
            base_url: provider.default_base_url().to_owned(),
            api_key: None,
            model: provider.default_model(role).to_owned(),
            request_timeout: None,
            max_retries: 0,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Check that this endpoint can be used to build a client
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when the provider needs an API key and none is set.
    pub fn validate(&self) -> AppResult<()> {
        if self.provider.requires_api_key() && self.api_key.is_none() {
            return Err(AppError::config_missing(format!(
                "No API key for the {} endpoint: set {}_API_KEY or {}",
                self.role,
                self.role.env_prefix(),
                self.provider.api_key_env()
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(AppError::config(format!(
                "Empty base URL for the {} endpoint",
                self.role
            )));
        }
        Ok(())
    }
}

impl Debug for EndpointConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("EndpointConfig")
            .field("role", &self.role)
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

/// Complete assistant configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Text agent endpoint
    pub agent: EndpointConfig,
    /// Vision model endpoint
    pub vision: EndpointConfig,
    /// Logging setup
    pub logging: LoggingConfig,
}

impl AssistantConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        info!("Loading assistant configuration from environment variables");
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        debug!(agent = ?config.agent, vision = ?config.vision, "Assistant configuration loaded");
        Ok(config)
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let provider = non_empty(LlmProviderType::ENV_VAR)
            .map(|value| LlmProviderType::from_str_or_default(&value))
            .unwrap_or_default();

        let request_timeout =
            parse_var::<u64>(&non_empty, REQUEST_TIMEOUT_ENV)?.map(Duration::from_secs);
        let max_retries = parse_var::<u32>(&non_empty, MAX_RETRIES_ENV)?.unwrap_or(0);
        let retry_backoff = Duration::from_millis(
            parse_var::<u64>(&non_empty, RETRY_BACKOFF_ENV)?.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
        );

        let endpoint = |role: EndpointRole| {
            let prefix = role.env_prefix();
            EndpointConfig {
                role,
                provider,
                base_url: non_empty(&format!("{prefix}_BASE_URL"))
                    .unwrap_or_else(|| provider.default_base_url().to_owned()),
                api_key: non_empty(&format!("{prefix}_API_KEY"))
                    .or_else(|| non_empty(provider.api_key_env())),
                model: non_empty(&format!("{prefix}_MODEL"))
                    .unwrap_or_else(|| provider.default_model(role).to_owned()),
                request_timeout,
                max_retries,
                retry_backoff,
            }
        };

        Ok(Self {
            agent: endpoint(EndpointRole::Agent),
            vision: endpoint(EndpointRole::Vision),
            logging: LoggingConfig::from_lookup(&non_empty),
        })
    }
}

/// Parse an optional numeric variable
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                AppError::config(format!("Invalid value for {key}: '{raw}' ({e})"))
            })
        })
        .transpose()
}
