// ABOUTME: User-visible strings and service identifiers for the BillEase assistant
// ABOUTME: Pure data constants shared by the orchestrator, clients and terminal adapter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! The chat-facing strings in [`messages`] are part of the observable contract:
//! tests and the presentation layer compare against them verbatim.

/// Service names used in structured logging
pub mod service_names {
    /// Service name reported at startup
    pub const BILLEASE_ASSISTANT: &str = "billease-assistant";
}

/// Fixed chat texts
pub mod messages {
    /// The vision model's answer for an image it cannot read
    pub const UNCLEAR_IMAGE_SENTINEL: &str = "Please upload a clearer image";

    /// Prefix of the assistant turn that presents an image analysis
    pub const ANALYSIS_PREFIX: &str = "I've analyzed the uploaded image:\n\n";

    /// Text of the user turn recorded for a bare upload
    pub const IMAGE_UPLOADED: &str = "Image uploaded";

    /// Prefix for a failed vision call
    pub const ANALYSIS_ERROR_PREFIX: &str = "Error analyzing image: ";

    /// Prefix for a failed agent call
    pub const AGENT_ERROR_PREFIX: &str = "Sorry, I encountered an error: ";

    /// Reply used for every text turn when the agent could not be built
    pub const AGENT_UNAVAILABLE: &str =
        "Sorry, I'm having trouble initializing. Please try again later.";

    /// Lead-in of a composed prompt that carries image context
    pub const IMAGE_CONTEXT_PREFIX: &str = "The user has uploaded an image. Image analysis: ";

    /// Separator between the analysis and the user's question
    pub const IMAGE_CONTEXT_QUERY: &str = ". User query: ";
}

/// Accepted upload formats
pub mod uploads {
    /// File extensions the uploader accepts
    pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
    /// Prefix given to the temp file holding an upload
    pub const TEMP_FILE_PREFIX: &str = "billease-upload-";
}
