//! # parley
//!
//! Command-line interview driver. Wires settings, telemetry and collaborators
//! together and runs an interview over stdin/stdout.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use parley_core::SessionId;
use parley_runtime::{Collaborators, InterviewRuntime, InterviewSummary};
use parley_session::SessionSignalBus;
use parley_settings::{ParleySettings, load_settings, load_settings_from_path};
use parley_telemetry::{TelemetryConfig, init_telemetry};

/// Typed on its own line to end the interview early.
const QUIT_COMMAND: &str = "/quit";

#[derive(Parser, Debug)]
#[command(name = "parley", about = "Mock interview session engine", version)]
struct Cli {
    /// Settings file (defaults to `~/.parley/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an interactive interview.
    Run(RunArgs),
    /// Print the effective settings as JSON.
    Settings,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Candidate resume, plain text.
    #[arg(long)]
    resume: PathBuf,

    /// Job description, plain text.
    #[arg(long)]
    jd: PathBuf,

    /// Number of questions to ask.
    #[arg(long, default_value_t = 5)]
    questions: u32,

    /// Reuse a session id instead of generating one.
    #[arg(long)]
    session_id: Option<String>,

    /// Use in-memory stores and an echoing LLM instead of the configured services.
    #[arg(long)]
    offline: bool,

    /// Print the interview summary as JSON when done.
    #[arg(long)]
    print_summary: bool,
}

fn load(path: Option<&Path>) -> Result<ParleySettings> {
    match path {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => load_settings().context("failed to load settings"),
    }
}

fn read_document(path: &Path, what: &str) -> Result<String> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {what} from {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("{what} file {} is empty", path.display());
    }
    Ok(text)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(cli.settings.as_deref())?;

    let telemetry = TelemetryConfig::from_level_name(&settings.logging.level, settings.logging.json)
        .with_module_level("hyper", tracing::Level::WARN)
        .with_module_level("reqwest", tracing::Level::WARN);
    let _ = init_telemetry(&telemetry);

    match cli.command {
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Command::Run(args) => run(&settings, args).await,
    }
}

async fn run(settings: &ParleySettings, args: RunArgs) -> Result<()> {
    let resume = read_document(&args.resume, "resume")?;
    let jd = read_document(&args.jd, "job description")?;

    let collaborators = if args.offline {
        Collaborators::offline()
    } else {
        Collaborators::http(&settings.backend).context("failed to configure collaborators")?
    };

    let session_id = args.session_id.map_or_else(SessionId::new, SessionId::from_raw);
    let mut runtime = InterviewRuntime::new(settings, collaborators, SessionSignalBus::new());
    runtime.start(session_id.clone(), resume, jd, args.questions)?;
    info!(session_id = %session_id, questions = args.questions, offline = args.offline, "interview started");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(format!("Session {session_id}. Answer each question on one line, {QUIT_COMMAND} to stop.\n").as_bytes())
        .await?;

    'questions: for sequence in 0..args.questions {
        let question = runtime
            .next_question(sequence)
            .await
            .with_context(|| format!("failed to prepare question {}", sequence + 1))?;
        stdout
            .write_all(format!("\n[{}/{}] {}\n> ", sequence + 1, args.questions, question.text).as_bytes())
            .await?;
        stdout.flush().await?;

        let answer = loop {
            let Some(line) = lines.next_line().await? else {
                warn!(sequence, "input closed before the interview ended");
                break 'questions;
            };
            let line = line.trim();
            if line == QUIT_COMMAND {
                break 'questions;
            }
            if !line.is_empty() {
                break line.to_string();
            }
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
        };

        if let Err(e) = runtime.submit_answer(sequence, &answer).await {
            if !e.is_recoverable() {
                return Err(e).context("failed to record answer");
            }
            warn!(sequence, category = e.category(), error = %e, "answer not saved, retrying once");
            runtime.submit_answer(sequence, &answer).await.context("failed to record answer")?;
        }
    }

    let summary = runtime.finish().await?;
    report(&summary, args.print_summary)?;
    Ok(())
}

fn report(summary: &InterviewSummary, as_json: bool) -> Result<()> {
    let answered = summary.turns.iter().filter(|t| t.user_answer.is_some()).count();
    if as_json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("\nInterview {} finished: {answered}/{} questions answered.", summary.session_id, summary.turns.len());
    }
    Ok(())
}
