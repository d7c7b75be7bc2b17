//! Interactive chat loop.

use anyhow::{Context, Result};
use deck_core::{run_turn, Document, Oracle, OutlineFormatter, SessionState, Slide, TurnConfig, TurnOutcome};
use deck_pptx::{DeckWriter, DEFAULT_FILENAME};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// A request for the oracle.
    Message(String),
    /// Print the outline of the current presentation.
    Show,
    /// Render the current presentation.
    Render(PathBuf),
    /// Start a request with the edit prefix for slide N.
    Edit(usize),
    Quit,
    Empty,
    /// A slash command that was not understood.
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let mut words = command.split_whitespace();
        match (words.next(), words.next()) {
            (Some("quit" | "exit"), None) => Self::Quit,
            (Some("show"), None) => Self::Show,
            (Some("render"), path) => {
                Self::Render(PathBuf::from(path.unwrap_or(DEFAULT_FILENAME)))
            }
            (Some("edit"), Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Self::Edit(n),
                _ => Self::Unknown(line.to_string()),
            },
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Run the chat loop on stdin/stdout until `/quit` or end of input.
pub async fn run(oracle: &dyn Oracle, mut session: SessionState, config: &TurnConfig) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let formatter = OutlineFormatter::new();
    let writer = DeckWriter::new();

    println!("Describe the presentation you want. Commands: /show, /render [PATH], /edit N, /quit");

    loop {
        prompt("> ")?;
        let Some(line) = lines.next() else { break };
        let line = line.context("Failed to read input")?;

        let request = match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Unknown(text) => {
                println!("Unknown command: {}", text);
                continue;
            }
            ReplCommand::Show => {
                match &session.document {
                    Some(document) => print!("{}", formatter.format_with_newline(document)),
                    None => println!("No presentation yet."),
                }
                continue;
            }
            ReplCommand::Render(path) => {
                match render_current(&writer, session.document.as_ref(), &path) {
                    Ok(message) => println!("{}", message),
                    // The session is unchanged; the user can pick another path.
                    Err(message) => eprintln!("{}", message),
                }
                continue;
            }
            ReplCommand::Edit(number) => {
                let slide_count = session.document.as_ref().map_or(0, |d| d.slide_count());
                if number > slide_count {
                    println!("There is no slide {} (the presentation has {}).", number, slide_count);
                    continue;
                }
                let prefix = Slide::edit_prompt(number);
                prompt(&format!("> {}", prefix))?;
                let Some(rest) = lines.next() else { break };
                format!("{}{}", prefix, rest.context("Failed to read input")?.trim())
            }
            ReplCommand::Message(text) => text,
        };

        match run_turn(oracle, &session, &request, config).await {
            Ok(turn) => {
                if let TurnOutcome::Rejected(reason) = &turn.outcome {
                    log::warn!("Oracle returned an invalid presentation: {}", reason);
                }
                println!("{}", turn.reply);
                session = turn.state;
            }
            // The session is unchanged; the user can retry.
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

/// Render the current presentation for `/render`, describing the result.
fn render_current(
    writer: &DeckWriter,
    document: Option<&Document>,
    path: &Path,
) -> std::result::Result<String, String> {
    let Some(document) = document else {
        return Ok("No presentation to render yet.".to_string());
    };
    match crate::render_to_file(writer, document, path) {
        Ok(()) => Ok(format!("Written to: {}", path.display())),
        Err(e) => Err(format!("Error: {:#}", e)),
    }
}

fn prompt(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
