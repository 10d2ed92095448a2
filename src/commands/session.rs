//! Conversation commands: feed messages through the persona pipeline

use colored::*;
use eyre::{Context, Result};
use std::io::{self, BufRead, Write};

use crate::chat;
use crate::config::Config;
use crate::persona::engine::{MessageOutcome, PersonaEngine};

/// Read messages from stdin until EOF, printing any reply
pub fn run(user: &str, config: &Config) -> Result<()> {
    let mut engine = PersonaEngine::from_config(config);
    log::info!("Session started for {}", user);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        if let Some(reply) = chat::handle_line(&mut engine, user, &line) {
            writeln!(stdout, "{}", reply)?;
            stdout.flush()?;
        }
    }

    log::info!("Session ended for {}", user);
    Ok(())
}

/// Run one message and report what the pipeline did with it
pub fn send(user: &str, message: &str, config: &Config) -> Result<()> {
    let mut engine = PersonaEngine::from_config(config);

    if let Some(command) = chat::ChatCommand::parse(message) {
        println!("{}", command.execute(&mut engine, user));
        return Ok(());
    }

    match engine.handle_message(user, message) {
        MessageOutcome::QuickReply(reply) => println!("{}", reply),
        MessageOutcome::TooShort => {
            println!("{} Message too short to analyze", "–".dimmed());
        }
        MessageOutcome::NoTraits => {
            println!("{} No traits found", "–".dimmed());
        }
        MessageOutcome::Analyzed(traits) => {
            println!("{} Updated persona for {}:", "✓".green(), user.bold());
            for (tag, weight) in &traits {
                println!("  {} {}", tag.to_string().cyan(), weight);
            }
        }
    }

    Ok(())
}
