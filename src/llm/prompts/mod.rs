// ABOUTME: Prompts for the vision model and the BillEase text agent, loaded at compile time
// ABOUTME: Renders the persona template around a composed query and the agent's system instruction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Prompts
//!
//! Prompts are loaded at compile time from markdown files for easy maintenance.
//! Placeholders use `{name}` and are filled with plain string replacement.

/// Instruction sent with every image to the vision model
pub const VISION_INSTRUCTION: &str = include_str!("vision_instruction.md");

/// Persona/context template wrapped around every composed query
pub const BILLEASE_PERSONA_TEMPLATE: &str = include_str!("billease_persona.md");

/// System instruction for the text agent
pub const AGENT_SYSTEM_TEMPLATE: &str = include_str!("agent_system.md");

/// Get the fixed instruction for image analysis
#[must_use]
pub const fn vision_instruction() -> &'static str {
    VISION_INSTRUCTION
}

/// Wrap a composed query (user text, possibly with image context) in the persona template
#[must_use]
pub fn render_persona_prompt(context: &str) -> String {
    BILLEASE_PERSONA_TEMPLATE.replace("{context}", context)
}

/// Render the agent system instruction with its capability list
#[must_use]
pub fn render_agent_system_prompt<'a>(capabilities: impl IntoIterator<Item = &'a str>) -> String {
    let listing = capabilities
        .into_iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    AGENT_SYSTEM_TEMPLATE.replace("{capabilities}", &listing)
}
