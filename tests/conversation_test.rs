// ABOUTME: Integration tests for the append-only conversation store
// ABOUTME: Verifies insertion order, read helpers and image references on user turns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use billease_assistant::conversation::{ConversationStore, Turn, TurnRole};

use common::png_upload;

#[test]
fn test_empty_store() {
    let store = ConversationStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
    assert!(store.last().is_none());
    assert!(store.all().is_empty());
}

#[test]
fn test_all_returns_turns_in_insertion_order() {
    let mut store = ConversationStore::new();
    let texts = ["one", "two", "three", "four", "five"];
    for (i, text) in texts.iter().enumerate() {
        if i % 2 == 0 {
            store.append(Turn::user(*text, None));
        } else {
            store.append(Turn::assistant(*text));
        }
    }

    assert_eq!(store.len(), texts.len());
    let stored: Vec<&str> = store.all().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(stored, texts);
    assert_eq!(store.last().unwrap().text, "five");
    assert_eq!(store.all()[1].role, TurnRole::Assistant);
}

#[test]
fn test_user_turn_keeps_image_reference_after_release() {
    let pending = png_upload("bill.png");
    let image_ref = pending.image_ref().clone();
    pending.release().unwrap();

    let mut store = ConversationStore::new();
    store.append(Turn::user("Image uploaded", Some(image_ref.clone())));

    let turn = store.last().unwrap();
    assert_eq!(turn.attached_image.as_ref(), Some(&image_ref));
    assert_eq!(turn.attached_image.as_ref().unwrap().file_name, "bill.png");
}

#[test]
fn test_turn_ids_are_unique() {
    let a = Turn::user("same", None);
    let b = Turn::user("same", None);
    assert_ne!(a.id, b.id);
}
