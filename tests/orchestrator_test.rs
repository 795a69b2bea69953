// ABOUTME: Integration tests for the upload/submit turn orchestration state machine
// ABOUTME: Covers analysis presentation, context merging, release of uploads and failure folding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashMap;

use billease_assistant::agent::TextAgentClient;
use billease_assistant::analysis::ImageAnalysisClient;
use billease_assistant::config::AssistantConfig;
use billease_assistant::conversation::TurnRole;
use billease_assistant::errors::{AppError, ErrorCode};
use billease_assistant::orchestrator::{AgentSlot, TurnOrchestrator};
use billease_assistant::session::{SessionEvent, SessionState};

use common::{init_test_logging, jpeg_upload, png_upload, scripted_orchestrator, ScriptedProvider};

const PERSONA_LEAD: &str =
    "You are a helpful assistant who answers queries about BillEase, a fintech company in the Philippines.";

// ============================================================================
// Upload Handling
// ============================================================================

#[tokio::test]
async fn test_upload_presents_prefixed_analysis() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("- red car\n- license plate ABC123");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    let turns = orchestrator.dispatch(SessionEvent::Upload(png_upload("car.png"))).await;

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, TurnRole::User);
    assert_eq!(turns[0].text, "Image uploaded");
    let image = turns[0].attached_image.as_ref().expect("upload reference");
    assert_eq!(image.file_name, "car.png");
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(turns[1].role, TurnRole::Assistant);
    assert_eq!(
        turns[1].text,
        "I've analyzed the uploaded image:\n\n- red car\n- license plate ABC123"
    );
    assert!(turns[1].attached_image.is_none());

    assert_eq!(orchestrator.context().state(), SessionState::AwaitingTextQuery);
    assert_eq!(
        orchestrator.context().last_analysis().unwrap().text(),
        "- red car\n- license plate ABC123"
    );
}

#[tokio::test]
async fn test_blurry_upload_shows_sentinel_verbatim() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("Please upload a clearer image");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    let turns = orchestrator.dispatch(SessionEvent::Upload(jpeg_upload("blurry.jpg"))).await;

    assert_eq!(turns[1].text, "Please upload a clearer image");
}

#[tokio::test]
async fn test_upload_sends_instruction_and_image_once() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("- due date: March 15");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    orchestrator.handle_upload(jpeg_upload("bill.jpeg")).await;

    assert_eq!(vision.calls(), 1);
    let request = &vision.requests()[0];
    assert_eq!(request.messages.len(), 1);
    let message = &request.messages[0];
    assert!(message.content.contains("CRITICAL INSTRUCTION"));
    assert_eq!(message.images.len(), 1);
    assert_eq!(message.images[0].mime_type, "image/jpeg");
}

#[tokio::test]
async fn test_upload_never_calls_agent() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    orchestrator.handle_upload(png_upload("a.png")).await;
    orchestrator.handle_upload(png_upload("b.png")).await;

    assert_eq!(vision.calls(), 2);
    assert_eq!(agent.calls(), 0);
}

#[tokio::test]
async fn test_upload_is_released_after_analysis() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("- total: 2,500 PHP");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    let image = png_upload("receipt.png");
    let path = image.path().to_path_buf();
    assert!(path.exists());

    orchestrator.handle_upload(image).await;

    assert!(!path.exists());
}

#[tokio::test]
async fn test_upload_is_released_when_analysis_fails() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.fail(AppError::external_unavailable("Vision", "connection refused"));
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    let image = png_upload("receipt.png");
    let path = image.path().to_path_buf();
    let turns = orchestrator.handle_upload(image).await;

    assert_eq!(
        turns[1].text,
        "I've analyzed the uploaded image:\n\nError analyzing image: Vision: connection refused"
    );
    assert!(!path.exists());
}

// ============================================================================
// Text Submission
// ============================================================================

#[tokio::test]
async fn test_submit_without_image_sends_text_unchanged() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    agent.reply("You can pay bills in the app under Bills.");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    let turns = orchestrator
        .dispatch(SessionEvent::submit("How do I pay my bills?"))
        .await;

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "How do I pay my bills?");
    assert!(turns[0].attached_image.is_none());
    assert_eq!(turns[1].text, "You can pay bills in the app under Bills.");

    assert_eq!(vision.calls(), 0);
    let prompt = agent.last_user_content();
    assert!(prompt.starts_with(PERSONA_LEAD));
    assert!(prompt.trim_end().ends_with("User query: How do I pay my bills?"));
    assert!(!prompt.contains("Image analysis"));
    assert_eq!(orchestrator.context().state(), SessionState::Idle);
}

#[tokio::test]
async fn test_agent_request_carries_capability_instruction() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    orchestrator.handle_submit("Hi".to_owned(), None).await;

    let request = &agent.requests()[0];
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role.as_str(), "system");
    assert!(request.messages[0].content.contains("- analyze_image:"));
    assert_eq!(request.messages[1].role.as_str(), "user");
}

#[tokio::test]
async fn test_retained_analysis_is_used_exactly_once() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("- red car\n- license plate ABC123");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    orchestrator.handle_upload(png_upload("car.png")).await;
    orchestrator
        .handle_submit("What is the plate number?".to_owned(), None)
        .await;

    let first = agent.last_user_content();
    assert!(first.contains(
        "User query: The user has uploaded an image. Image analysis: - red car\n- license plate ABC123. User query: What is the plate number?"
    ));
    assert_eq!(first.matches("license plate ABC123").count(), 1);
    assert!(orchestrator.context().last_analysis().is_none());
    assert_eq!(orchestrator.context().state(), SessionState::Idle);

    orchestrator
        .handle_submit("And the color?".to_owned(), None)
        .await;

    let second = agent.last_user_content();
    assert!(!second.contains("Image analysis"));
    assert!(!second.contains("ABC123"));
    assert!(second.trim_end().ends_with("User query: And the color?"));
    assert_eq!(vision.calls(), 1);
}

#[tokio::test]
async fn test_new_upload_replaces_retained_analysis() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("- first image").reply("- second image");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    orchestrator.handle_upload(png_upload("one.png")).await;
    orchestrator.handle_upload(png_upload("two.png")).await;
    orchestrator.handle_submit("Which one?".to_owned(), None).await;

    let prompt = agent.last_user_content();
    assert!(prompt.contains("Image analysis: - second image."));
    assert!(!prompt.contains("first image"));
}

#[tokio::test]
async fn test_submit_with_attached_image_analyzes_and_releases_it() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("- amount due: 1,250 PHP");
    agent.reply("Your amount due is 1,250 PHP.");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    let image = jpeg_upload("statement.jpg");
    let path = image.path().to_path_buf();
    let turns = orchestrator
        .dispatch(SessionEvent::submit_with_image("How much do I owe?", image))
        .await;

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "How much do I owe?");
    assert_eq!(
        turns[0].attached_image.as_ref().unwrap().file_name,
        "statement.jpg"
    );
    assert_eq!(turns[1].text, "Your amount due is 1,250 PHP.");
    assert!(!path.exists());

    assert_eq!(vision.calls(), 1);
    assert!(agent.last_user_content().contains(
        "The user has uploaded an image. Image analysis: - amount due: 1,250 PHP. User query: How much do I owe?"
    ));
}

#[tokio::test]
async fn test_attached_image_is_not_reanalyzed_when_analysis_is_retained() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("- retained");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    orchestrator.handle_upload(png_upload("first.png")).await;
    let image = png_upload("second.png");
    let path = image.path().to_path_buf();
    orchestrator
        .handle_submit("Tell me more".to_owned(), Some(image))
        .await;

    assert_eq!(vision.calls(), 1);
    assert!(agent.last_user_content().contains("Image analysis: - retained."));
    assert!(!path.exists());
}

// ============================================================================
// Failure Folding
// ============================================================================

#[tokio::test]
async fn test_agent_failure_becomes_apology_turn() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    agent.fail(AppError::new(ErrorCode::ExternalServiceUnavailable, "timeout"));
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    let turns = orchestrator.handle_submit("Hello".to_owned(), None).await;

    assert_eq!(turns[1].role, TurnRole::Assistant);
    assert_eq!(turns[1].text, "Sorry, I encountered an error: timeout");

    // Session keeps going after the failure
    agent.reply("Hello again");
    let turns = orchestrator.handle_submit("Hello?".to_owned(), None).await;
    assert_eq!(turns[1].text, "Hello again");
}

#[tokio::test]
async fn test_provider_name_is_part_of_the_apology() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    agent.fail(AppError::external_unavailable("Groq", "request timed out"));
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    let turns = orchestrator.handle_submit("Hello".to_owned(), None).await;

    assert_eq!(
        turns[1].text,
        "Sorry, I encountered an error: Groq: request timed out"
    );
}

#[tokio::test]
async fn test_unavailable_agent_short_circuits_without_calls() {
    init_test_logging();
    let vision = ScriptedProvider::vision();
    let vision_client = ImageAnalysisClient::with_provider(vision.clone()).unwrap();
    let mut orchestrator = TurnOrchestrator::new(
        vision_client,
        Err::<TextAgentClient, _>(AppError::config_missing("No API key for the agent endpoint")),
    );

    assert!(!orchestrator.agent_available());
    assert_eq!(
        orchestrator.startup_notice().as_deref(),
        Some("Error creating agent: No API key for the agent endpoint")
    );
    assert!(orchestrator.startup_notice().is_none());

    let image = png_upload("bill.png");
    let path = image.path().to_path_buf();
    let turns = orchestrator
        .handle_submit("What is BillEase?".to_owned(), Some(image))
        .await;

    assert_eq!(
        turns[1].text,
        "Sorry, I'm having trouble initializing. Please try again later."
    );
    assert_eq!(vision.calls(), 0);
    assert!(!path.exists());

    let turns = orchestrator.handle_submit("Still there?".to_owned(), None).await;
    assert_eq!(
        turns[1].text,
        "Sorry, I'm having trouble initializing. Please try again later."
    );
}

#[tokio::test]
async fn test_missing_credentials_from_config_disable_text_path() {
    init_test_logging();
    let vars: HashMap<&str, &str> = HashMap::new();
    let config = AssistantConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned())).unwrap();
    let mut orchestrator = TurnOrchestrator::from_config(&config);

    assert!(!orchestrator.agent_available());
    assert!(orchestrator.startup_notice().unwrap().contains("GROQ_API_KEY"));

    let turns = orchestrator.handle_upload(png_upload("bill.png")).await;
    assert!(turns[1]
        .text
        .starts_with("I've analyzed the uploaded image:\n\nError analyzing image: No API key"));

    let turns = orchestrator.handle_submit("Hi".to_owned(), None).await;
    assert_eq!(
        turns[1].text,
        "Sorry, I'm having trouble initializing. Please try again later."
    );
}

#[test]
fn test_agent_slot_from_result() {
    let slot = AgentSlot::from(Err::<TextAgentClient, _>(AppError::config("bad url")));
    assert!(matches!(slot, AgentSlot::Unavailable(ref reason) if reason == "bad url"));

    let slot = AgentSlot::from(Ok::<_, AppError>(TextAgentClient::with_provider(
        ScriptedProvider::text(),
    )));
    assert!(matches!(slot, AgentSlot::Ready(_)));
}

// ============================================================================
// Conversation Ordering
// ============================================================================

#[tokio::test]
async fn test_store_holds_every_turn_in_order() {
    let vision = ScriptedProvider::vision();
    let agent = ScriptedProvider::text();
    vision.reply("- bill");
    agent.reply("first answer").reply("second answer");
    let mut orchestrator = scripted_orchestrator(&vision, &agent);

    orchestrator.handle_upload(png_upload("bill.png")).await;
    orchestrator.handle_submit("q1".to_owned(), None).await;
    orchestrator.handle_submit("q2".to_owned(), None).await;

    let texts: Vec<(TurnRole, &str)> = orchestrator
        .context()
        .store()
        .all()
        .iter()
        .map(|turn| (turn.role, turn.text.as_str()))
        .collect();
    assert_eq!(
        texts,
        vec![
            (TurnRole::User, "Image uploaded"),
            (TurnRole::Assistant, "I've analyzed the uploaded image:\n\n- bill"),
            (TurnRole::User, "q1"),
            (TurnRole::Assistant, "first answer"),
            (TurnRole::User, "q2"),
            (TurnRole::Assistant, "second answer"),
        ]
    );

    let all = orchestrator.context().store().all();
    assert!(all.windows(2).all(|pair| pair[0].created_at <= pair[1].created_at));
}
