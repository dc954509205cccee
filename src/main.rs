//! kowctl - a terminal client for the kowalski puzzle-solving server.
//!
//! Dispatches word-puzzle and image commands to the backend over HTTP,
//! renders the structured results, and keeps a capped history across
//! sessions. The puzzle engines themselves live in the server; this client
//! is the thin end of the wire.

mod client;
mod config;
mod dispatch;
mod error;
mod history;
mod printer;
mod protocol;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::ApiClient;
use error::CommandError;
use history::HistoryStore;
use printer::Printer;
use protocol::{Command, InputKind};
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kowctl")]
#[command(author, version, about = "A terminal client for the kowalski puzzle-solving server")]
#[command(
    long_about = "Dispatches puzzle commands to a kowalski backend and renders the results.\n\nRun without arguments for the interactive view; `kowctl commands` lists what the backend understands."
)]
struct Cli {
    /// Command to run (e.g. anagram, shift, hidden)
    #[arg(value_name = "COMMAND")]
    command: Option<String>,

    /// Input text; read from stdin when omitted and piped
    // Hyphens must pass through raw: morse input is dots and dashes.
    #[arg(value_name = "INPUT", trailing_var_arg = true, allow_hyphen_values = true)]
    input: Vec<String>,

    /// Chunk sizes for the chunk command (e.g. "3" or "2 3 4")
    #[arg(long, value_name = "SIZES")]
    chunk_sizes: Option<String>,

    /// Image file for colours/hidden/rgb
    #[arg(short = 'i', long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Override the configured server base URL
    #[arg(short = 's', long, value_name = "URL")]
    server: Option<String>,

    /// Plain output without colours
    #[arg(long)]
    plain: bool,

    /// Skip reading and writing persistent history
    #[arg(long)]
    no_history: bool,

    #[command(subcommand)]
    action: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive view (default when no command is given)
    Tui,
    /// Show or clear stored history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// List the commands the backend understands
    Commands,
    /// Open configuration file in $EDITOR
    Config,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print stored history, most recent first
    Show,
    /// Clear stored history
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("kowctl=info".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::Config::load().context("Failed to load configuration")?;
    if let Some(server) = &cli.server {
        config.server.url = server.clone();
    }

    match cli.action.take() {
        Some(Commands::Config) => handle_config(),
        Some(Commands::Commands) => handle_commands(),
        Some(Commands::History { action }) => handle_history(&config, &cli, action),
        Some(Commands::Tui) => run_interactive(&config, cli.no_history).await,
        None => match cli.command.clone() {
            Some(command) => run_one_shot(&config, &cli, command).await,
            None => run_interactive(&config, cli.no_history).await,
        },
    }
}

fn load_history(config: &config::Config, no_history: bool) -> Result<HistoryStore> {
    if no_history {
        return Ok(HistoryStore::in_memory());
    }
    match config.history_path()? {
        Some(path) => Ok(HistoryStore::load(path)),
        None => Ok(HistoryStore::in_memory()),
    }
}

fn use_color(config: &config::Config, plain: bool) -> bool {
    !plain && config.output.color && atty::is(atty::Stream::Stdout)
}

/// Run a single command and print its rendered entry.
/// Exit codes: 2 for validation failures (nothing sent), 1 when the
/// recorded entry carries an error, 0 otherwise.
async fn run_one_shot(config: &config::Config, cli: &Cli, command: String) -> Result<()> {
    let client = ApiClient::new(&config.server)?;
    let mut history = load_history(config, cli.no_history)?;
    let printer = Printer::new(use_color(config, cli.plain));

    let wants_image = Command::from_str(&command)
        .map(|c| c.kind() == InputKind::Image)
        .unwrap_or(false);

    let outcome = if let Some(path) = &cli.image {
        dispatch::dispatch_image(&client, &mut history, &command, path).await
    } else if wants_image {
        Err(CommandError::InvalidInput(
            "Please select an image file (--image <FILE>)".to_string(),
        ))
    } else {
        let input = gather_input(&cli.input)?;
        dispatch::dispatch_text(
            &client,
            &mut history,
            &command,
            &input,
            cli.chunk_sizes.as_deref(),
        )
        .await
    };

    if let Err(e) = outcome {
        // The alert() analog: immediate, nothing recorded.
        eprintln!("{}", e);
        std::process::exit(2);
    }

    let entry = history
        .entries()
        .first()
        .context("History entry missing after dispatch")?;
    let failed = entry.error.is_some();
    printer.print_entry(&render::render_entry(entry));

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Input comes from the command line when given, otherwise from a pipe.
/// Multi-line commands (transpose, wordsearch) need the pipe form.
fn gather_input(args: &[String]) -> Result<String> {
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    if !atty::is(atty::Stream::Stdin) {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    // Empty: the dispatcher rejects it with the proper message.
    Ok(String::new())
}

async fn run_interactive(config: &config::Config, no_history: bool) -> Result<()> {
    let client = ApiClient::new(&config.server)?;
    let mut history = load_history(config, no_history)?;
    client::run_tui(&client, &mut history).await
}

fn handle_history(config: &config::Config, cli: &Cli, action: HistoryAction) -> Result<()> {
    let mut history = load_history(config, cli.no_history)?;

    match action {
        HistoryAction::Show => {
            let printer = Printer::new(use_color(config, cli.plain));
            printer.print_history(&history);
        }
        HistoryAction::Clear { yes } => {
            if yes || confirm("Are you sure you want to clear the history?")? {
                history.clear();
                println!("History cleared");
            } else {
                println!("Aborted");
            }
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read confirmation")?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

/// List every command with its input mode and a usage hint.
fn handle_commands() -> Result<()> {
    println!("Available Commands");
    println!("==================\n");

    for command in Command::ALL {
        let mode = match command.kind() {
            InputKind::Text => "text ",
            InputKind::Image => "image",
        };
        let fst = if command.is_fst() { " (needs FST model)" } else { "" };
        println!(
            "  {:<14} {}  {}{}",
            command.as_str(),
            mode,
            command.summary(),
            fst
        );
    }

    println!("\nUsage:");
    println!("  kowctl anagram listen");
    println!("  kowctl chunk --chunk-sizes \"2 3\" abcde");
    println!("  kowctl rgb --image photo.png");
    println!("  cat grid.txt | kowctl wordsearch");

    Ok(())
}

/// Handle the config command.
fn handle_config() -> Result<()> {
    let config_path = config::Config::config_path()?;

    // Ensure config directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Create default config if it doesn't exist
    if !config_path.exists() {
        let default_config = config::Config::default();
        default_config.save()?;
        println!("Created default config at {}", config_path.display());
    }

    // Open in editor
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}
