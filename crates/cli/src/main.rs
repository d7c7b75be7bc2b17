//! Conversational slide-deck outline editor.

mod repl;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use deck_core::{extract_document, run_turn, Document, OutlineFormatter, SessionState, TurnConfig};
use deck_oracle::{GeminiClient, OracleConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use deck_pptx::{DeckReader, DeckWriter, DEFAULT_FILENAME};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Build and edit slide-deck outlines by chatting with a language model.
#[derive(Parser, Debug)]
#[command(name = "deck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session (/show, /render [PATH], /edit N, /quit)
    Chat {
        #[command(flatten)]
        oracle: OracleArgs,

        /// Start from the presentation in this JSON file
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Number of prior chat messages sent along with each request
        #[arg(long, default_value = "0")]
        history: usize,
    },

    /// Run a single turn against a JSON state file, updating it in place
    Ask {
        #[command(flatten)]
        oracle: OracleArgs,

        /// Presentation JSON file (created on the first successful turn)
        #[arg(short, long)]
        state: PathBuf,

        /// Request text
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Render a presentation (JSON or text containing it) to .pptx
    Render {
        /// Input file, or "-" for stdin
        input: PathBuf,

        /// Output file (default: input name with .pptx extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the deck as base64 instead of writing a file
        #[arg(long)]
        base64: bool,
    },

    /// Print a plain-text outline of a presentation
    Show {
        /// Input file, or "-" for stdin
        input: PathBuf,
    },

    /// List the sections of a rendered .pptx file
    Inspect {
        /// PPTX file
        input: PathBuf,
    },
}

/// Oracle connection and turn settings.
#[derive(Args, Debug)]
struct OracleArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model id or alias (flash, pro)
    #[arg(long, env = "DECK_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Oracle endpoint
    #[arg(long, env = "DECK_ORACLE_URL", default_value = DEFAULT_BASE_URL)]
    oracle_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Upper bound on reply length, in tokens
    #[arg(long)]
    max_output_tokens: Option<u32>,

    /// Accept updates that change slides the request did not target
    #[arg(long)]
    allow_contract_breaks: bool,
}

impl OracleArgs {
    fn client(&self) -> Result<GeminiClient> {
        let api_key = self
            .api_key
            .clone()
            .context("No API key: pass --api-key or set GEMINI_API_KEY")?;
        let config = OracleConfig::new(api_key)
            .with_model(&self.model)
            .with_base_url(self.oracle_url.as_str())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens);
        GeminiClient::new(config).context("Failed to build oracle client")
    }

    /// Turn settings; `history` only matters where a transcript is kept.
    fn turn_config(&self, history: usize) -> TurnConfig {
        TurnConfig {
            history_limit: history,
            enforce_contract: !self.allow_contract_breaks,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Command::Chat {
            oracle,
            state,
            history,
        } => {
            let client = oracle.client()?;
            let session = match &state {
                Some(path) => load_session(path)?,
                None => SessionState::default(),
            };
            repl::run(&client, session, &oracle.turn_config(history)).await
        }
        Command::Ask {
            oracle,
            state,
            message,
        } => {
            let client = oracle.client()?;
            let session = load_session(&state)?;
            let request = message.join(" ");

            // The state file holds no transcript, so there is no history to send.
            let turn = run_turn(&client, &session, &request, &oracle.turn_config(0))
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            if let (true, Some(document)) = (turn.document_changed(), &turn.state.document) {
                save_document(&state, document)?;
                log::debug!("Saved presentation to {}", state.display());
            }
            println!("{}", turn.reply);
            Ok(())
        }
        Command::Render {
            input,
            output,
            base64,
        } => {
            let document = read_document(&input)?;
            let writer = DeckWriter::new();

            if base64 {
                let encoded = writer
                    .render_base64(&document)
                    .map_err(|e| anyhow::anyhow!("{}", e))?;
                println!("{}", encoded);
            } else {
                let output_path = get_output_path(&input, output.as_ref());
                render_to_file(&writer, &document, &output_path)?;
                if cli.verbose {
                    eprintln!("Written to: {}", output_path.display());
                }
            }
            Ok(())
        }
        Command::Show { input } => {
            let document = read_document(&input)?;
            print!("{}", OutlineFormatter::new().format_with_newline(&document));
            Ok(())
        }
        Command::Inspect { input } => {
            print!("{}", inspect_file(&input)?);
            Ok(())
        }
    }
}

/// Read a file, or stdin for "-".
fn read_input(path: &Path) -> Result<String> {
    let mut text = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    Ok(text)
}

/// Read a presentation from a JSON file or any text that contains one.
fn read_document(path: &Path) -> Result<Document> {
    let text = read_input(path)?;
    extract_document(&text).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
}

/// Session state from a presentation file; a missing file starts a new session.
fn load_session(path: &Path) -> Result<SessionState> {
    if !path.exists() {
        log::debug!("{} does not exist, starting without a presentation", path.display());
        return Ok(SessionState::default());
    }
    Ok(SessionState::with_document(read_document(path)?))
}

/// Write a presentation as pretty-printed JSON.
fn save_document(path: &Path, document: &Document) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(document.to_pretty_json().as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

/// Determine the output path for a rendered deck.
fn get_output_path(input_path: &Path, output: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = output {
        return path.clone();
    }
    if input_path.as_os_str() == "-" {
        return PathBuf::from(DEFAULT_FILENAME);
    }
    input_path.with_extension("pptx")
}

/// Render a presentation into a .pptx file.
fn render_to_file(writer: &DeckWriter, document: &Document, path: &Path) -> Result<()> {
    let bytes = writer
        .render(document)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(&bytes)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

/// Describe every section of a rendered deck.
fn inspect_file(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let sections = DeckReader::new()
        .read(BufReader::new(file))
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let mut out = String::new();
    for section in &sections {
        out.push_str(&format!(
            "Section {} (background {}, {} bullets)\n",
            section.number,
            section.background.as_deref().unwrap_or("none"),
            section.bullet_count()
        ));
        for shape in &section.shapes {
            for paragraph in &shape.paragraphs {
                let marker = if paragraph.bullet { "  • " } else { "  " };
                out.push_str(marker);
                out.push_str(&paragraph.text);
                out.push('\n');
            }
        }
    }
    Ok(out)
}
