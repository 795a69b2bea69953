// ABOUTME: Terminal chat front end for the BillEase assistant
// ABOUTME: Turns stdin lines into upload/submit events and prints each new turn as "role> text"
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # BillEase Assistant Binary
//!
//! Reads one command or message per line:
//!
//! - `/upload <path>`: upload an image for analysis
//! - `/attach <path> <question>`: ask a question about an image
//! - `/about`: describe the assistant
//! - `/history`: print the whole conversation
//! - `/quit`: exit
//!
//! Any other line is sent to the assistant as a question.

use std::path::{Path, PathBuf};

use anyhow::Result;
use billease_assistant::{
    config::AssistantConfig,
    conversation::Turn,
    logging::{LogFormat, LoggingConfig},
    orchestrator::TurnOrchestrator,
    session::SessionEvent,
    uploads::PendingImage,
};
use clap::Parser;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const ABOUT_TEXT: &str = "This assistant can answer queries about BillEase, a fintech company in the Philippines.

You can also upload images for analysis using the configured vision model.";

#[derive(Parser)]
#[command(name = "billease-assistant")]
#[command(about = "BillEase Assistant - ask about BillEase or discuss an uploaded image")]
struct Args {
    /// Image to upload before the first question
    #[arg(long)]
    image: Option<PathBuf>,

    /// Log output format (json, pretty, compact)
    #[arg(long)]
    log_format: Option<String>,
}

/// One parsed input line
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Upload(PathBuf),
    Attach(PathBuf, String),
    About,
    History,
    Quit,
    Submit(String),
    Empty,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Submit(line.to_owned()));
    };

    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    match name {
        "upload" if !args.is_empty() => Ok(Command::Upload(PathBuf::from(args))),
        "upload" => Err("usage: /upload <path>".to_owned()),
        "attach" => match args.split_once(char::is_whitespace) {
            Some((path, question)) if !question.trim().is_empty() => Ok(Command::Attach(
                PathBuf::from(path),
                question.trim().to_owned(),
            )),
            _ => Err("usage: /attach <path> <question>".to_owned()),
        },
        "about" => Ok(Command::About),
        "history" => Ok(Command::History),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command /{other}")),
    }
}

/// Logging settings from the environment, with `--log-format` taking precedence
fn logging_config(log_format: Option<&str>) -> LoggingConfig {
    let logging = LoggingConfig::from_env();
    match log_format {
        Some(format) => logging.with_format(LogFormat::from_str_or_default(format)),
        None => logging,
    }
}

fn render_turn(turn: &Turn) -> String {
    match &turn.attached_image {
        Some(image) => format!(
            "{}> {} [{}, {}, {} bytes]",
            turn.role, turn.text, image.file_name, image.mime_type, image.byte_len
        ),
        None => format!("{}> {}", turn.role, turn.text),
    }
}

fn print_turns(turns: &[Turn]) {
    for turn in turns {
        println!("{}", render_turn(turn));
    }
}

fn load_image(path: &Path) -> Option<PendingImage> {
    match PendingImage::from_path(path) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Rejected upload {}: {}", path.display(), e.message);
            println!("error> {}", e.message);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = logging_config(args.log_format.as_deref());
    logging.init()?;

    let config = AssistantConfig::from_env()?;

    let mut orchestrator = TurnOrchestrator::from_config(&config);
    info!(
        agent_available = orchestrator.agent_available(),
        "BillEase assistant ready"
    );

    println!("BillEase Assistant");
    if let Some(notice) = orchestrator.startup_notice() {
        println!("error> {notice}");
    }

    if let Some(path) = args.image.as_deref() {
        if let Some(image) = load_image(path) {
            print_turns(orchestrator.dispatch(SessionEvent::Upload(image)).await);
        }
    }

    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Empty) => {}
            Ok(Command::Quit) => break,
            Ok(Command::About) => println!("{ABOUT_TEXT}"),
            Ok(Command::History) => print_turns(orchestrator.context().store().all()),
            Ok(Command::Upload(path)) => {
                if let Some(image) = load_image(&path) {
                    print_turns(orchestrator.dispatch(SessionEvent::Upload(image)).await);
                }
            }
            Ok(Command::Attach(path, question)) => {
                if let Some(image) = load_image(&path) {
                    let event = SessionEvent::submit_with_image(question, image);
                    print_turns(orchestrator.dispatch(event).await);
                }
            }
            Ok(Command::Submit(text)) => {
                print_turns(orchestrator.dispatch(SessionEvent::submit(text)).await);
            }
            Err(usage) => println!("error> {usage}"),
        }
    }

    info!("BillEase assistant shutting down");
    Ok(())
}
