//! Console driver: runs one conversation of a playthrough on stdin.
//!
//! ```text
//! colloquy [--place ID] [--purpose TEXT] <playthrough> <human-id> <participant-id>...
//! ```
//!
//! An empty line lets the characters talk among themselves, `/ambient` and
//! `/beat` ask for narration, and the termination keyword ends the
//! conversation.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use colloquy::adapters::ai::{OpenAIConfig, OpenAIProvider};
use colloquy::adapters::storage::{FileCharacterStore, FileDiagnosticsSink, FileSessionStore};
use colloquy::application::{
    CompletionGateway, ConversationSession, DialogueError, DialogueServices, RetryPolicy,
    TurnEvent, TurnOutcome,
};
use colloquy::config::{AppConfig, LoggingConfig};
use colloquy::domain::conversation::SessionContext;
use colloquy::domain::foundation::{ParticipantId, PlaythroughName, ValidationError};
use colloquy::ports::AIError;

#[derive(Debug, Error)]
enum CliError {
    #[error("Invalid argument: {0}")]
    Argument(#[from] ValidationError),

    #[error("Completion backend unavailable: {0}")]
    Provider(#[from] AIError),

    #[error(transparent)]
    Dialogue(#[from] DialogueError),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "colloquy", about = "Run one conversation of a playthrough on stdin")]
struct Cli {
    /// Identifier of the place where the conversation happens.
    #[arg(long)]
    place: Option<String>,

    /// What the conversation is meant to achieve.
    #[arg(long)]
    purpose: Option<String>,

    /// Playthrough whose characters and memories are used.
    playthrough: String,

    /// Participant identifier of the human.
    human: String,

    /// Characters taking part besides the human.
    #[arg(required = true)]
    roster: Vec<String>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_services(config: &AppConfig) -> Result<DialogueServices, CliError> {
    let api_key = config.ai.api_key.clone().unwrap_or_default();
    let provider = OpenAIProvider::new(
        OpenAIConfig::new(api_key)
            .with_model(config.ai.model.clone())
            .with_base_url(config.ai.base_url.clone())
            .with_timeout(config.ai.timeout()),
    )?;

    let data_dir = &config.storage.data_dir;
    let gateway = CompletionGateway::new(
        Arc::new(provider),
        Arc::new(FileDiagnosticsSink::new(data_dir)),
    )
    .with_policy(RetryPolicy::new(config.ai.max_retries))
    .with_timeout(config.ai.timeout());
    let characters = Arc::new(FileCharacterStore::new(data_dir));

    Ok(DialogueServices {
        gateway: Arc::new(gateway),
        sessions: Arc::new(FileSessionStore::new(data_dir)),
        characters: characters.clone(),
        memories: characters.clone(),
        places: characters,
    })
}

fn print_event(event: &TurnEvent) {
    match event {
        TurnEvent::HumanSpoke { .. } => {}
        TurnEvent::CharacterSpoke {
            name,
            narration,
            speech,
            ..
        } => println!("{}: *{}* {}", name, narration, speech),
        TurnEvent::Narration { text } => println!("{}", text),
        TurnEvent::ParticipantJoined { name, .. } => println!("({} joins the conversation)", name),
        TurnEvent::ParticipantLeft { name, .. } => println!("({} leaves the conversation)", name),
        TurnEvent::Ended { summary } => match summary {
            Some(summary) => println!("(The conversation ends. {})", summary),
            None => println!("(The conversation ends.)"),
        },
    }
}

async fn run(args: Cli, config: AppConfig) -> Result<(), CliError> {
    let human = ParticipantId::new(args.human)?;
    let roster = args
        .roster
        .into_iter()
        .map(ParticipantId::new)
        .collect::<Result<Vec<_>, _>>()?;
    let mut roster_with_human = vec![human.clone()];
    roster_with_human.extend(roster.into_iter().filter(|id| id != &human));

    let mut context = SessionContext::new(PlaythroughName::new(args.playthrough)?, human);
    if let Some(place) = args.place {
        context = context.with_place(place);
    }

    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let mut session = ConversationSession::open(
        context,
        build_services(&config)?,
        config.dialogue_settings(),
        &roster_with_human,
        args.purpose,
    )
    .await?
    .with_observer(tx);

    for line in session.transcript().lines() {
        println!("{}", line);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "/ambient" => {
                session.narrate_ambient().await?;
            }
            "/beat" => {
                session.advance_narrative().await?;
            }
            _ => {
                let input = (!input.is_empty()).then_some(input);
                if let TurnOutcome::Ended { .. } = session.take_turn(input).await? {
                    break;
                }
            }
        }
    }

    // Dropping the session closes the channel so the printer drains and exits.
    drop(session);
    let _ = printer.await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging);

    if let Err(err) = config.validate() {
        error!(error = %err, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    match run(args, config).await {
        Ok(()) => {
            info!("Session closed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "Conversation failed");
            ExitCode::FAILURE
        }
    }
}
