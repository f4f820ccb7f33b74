//! CLI entrypoint for rosti-chat
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use rosti_application::{
    ChatContext, ManageConversationsUseCase, MessageActionsUseCase, NoTranscript,
    SendMessageUseCase, SendOutcome, SendProgressNotifier, TranscriptLogger,
};
use rosti_domain::{ChatStore, Draft, SearchOptions};
use rosti_infrastructure::{ConfigLoader, FileConfig, HttpChatApi, JsonlTranscriptLogger};
use rosti_presentation::{
    ChatRepl, Cli, Command, ConsoleFormatter, QuietReporter, StreamReporter, read_attachment,
};
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };
    config.validate().context("Invalid configuration")?;

    let _log_guard = init_logging(cli.verbose, &config)?;
    info!("Starting rosti-chat");

    // === Dependency Injection ===
    let api = Arc::new(HttpChatApi::from_config(&config.api)?);

    let mut store = ChatStore::new();
    store.set_show_think_process(cli.think || config.chat.show_think_process);
    let ctx = ChatContext::with_store(store);

    let mut chat_config = config.chat_config();
    chat_config.search = apply_search_flags(&cli, chat_config.search);

    let transcript: Arc<dyn TranscriptLogger> = match config
        .logging
        .transcript
        .as_deref()
        .and_then(JsonlTranscriptLogger::open)
    {
        Some(logger) => Arc::new(logger),
        None => Arc::new(NoTranscript),
    };

    let conversations = ManageConversationsUseCase::new(api.clone(), ctx.clone());
    let actions = MessageActionsUseCase::new(api.clone(), ctx.clone());
    let sender = SendMessageUseCase::new(api, ctx.clone(), chat_config, transcript);

    // Conversation management
    if let Some(command) = cli.command.clone() {
        match command {
            Command::List => {
                conversations.refresh().await?;
                let store = ctx.store().await;
                if store.conversations().is_empty() {
                    println!("No conversations yet.");
                } else {
                    println!(
                        "{}",
                        ConsoleFormatter::format_conversations(store.conversations(), None)
                    );
                }
            }
            Command::Rename { id, title } => {
                conversations.rename(&id, &title).await?;
                println!("Renamed {}", id);
            }
            Command::Delete { id } => {
                conversations.delete(&id).await?;
                println!("Deleted {}", id);
            }
        }
        return Ok(());
    }

    if let Some(id) = &cli.conversation {
        let count = conversations
            .select(id)
            .await
            .with_context(|| format!("Failed to open conversation {}", id))?;
        info!("Opened conversation {} with {} messages", id, count);
    }

    // Chat mode
    if cli.chat {
        let mut repl = ChatRepl::new(sender, conversations, actions, ctx).with_quiet(cli.quiet);
        repl.run().await?;
        return Ok(());
    }

    // Single message mode - message is required
    let Some(message) = cli.message.clone() else {
        bail!("Message is required. Use --chat for interactive mode.");
    };

    let mut draft = Draft::new(message);
    let existing = ctx.store().await.attachments();
    for path in &cli.file {
        let file = read_attachment(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        draft.attach(file, &sender.config().attachments, &existing)?;
    }

    let show_thinking = ctx.store().await.show_think_process();
    let progress: Box<dyn SendProgressNotifier> = if cli.quiet {
        Box::new(QuietReporter)
    } else {
        Box::new(StreamReporter::new(show_thinking))
    };

    match sender.send(&mut draft, progress.as_ref()).await? {
        SendOutcome::Completed {
            conversation_id,
            message_id,
        } => {
            let store = ctx.store().await;
            if let Some(reply) = store.message(&message_id) {
                if cli.quiet {
                    println!("{}", ConsoleFormatter::format_message(reply, show_thinking));
                } else if !reply.source_documents().is_empty() {
                    println!("{}", ConsoleFormatter::format_sources(reply.source_documents()));
                }
            }
            info!("Conversation: {}", conversation_id);
        }
        SendOutcome::Failed { error, .. } => bail!(error),
        SendOutcome::Skipped => warn!("Nothing to send"),
    }

    Ok(())
}

/// Initialize logging based on verbosity level; logs go to the configured
/// file when one is set.
fn init_logging(verbose: u8, config: &FileConfig) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let Some(path) = &config.logging.file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn apply_search_flags(cli: &Cli, mut options: SearchOptions) -> SearchOptions {
    if cli.no_search_ai {
        options.search_ai_active = false;
    }
    if cli.search_rosti {
        options.search_rosti_active = true;
    }
    if cli.search_online {
        options.search_online_active = true;
    }
    options
}
