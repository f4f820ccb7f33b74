//! REPL (Read-Eval-Print Loop) for interactive chat

use super::files::read_attachment;
use crate::ConsoleFormatter;
use crate::progress::reporter::{QuietReporter, StreamReporter};
use colored::Colorize;
use rosti_application::{
    ChatApi, ChatContext, ManageConversationsUseCase, MessageActionsUseCase, SendError,
    SendMessageUseCase, SendOutcome, SendProgressNotifier,
};
use rosti_domain::{Draft, Feedback};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::Path;
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  /help, /h, /?        - Show this help
  /new                 - Start a new conversation
  /list                - List conversations
  /open <id|n>         - Open a conversation by id or list number
  /rename <title>      - Rename the open conversation
  /delete [id]         - Delete a conversation (default: the open one)
  /history             - Show the open conversation
  /attach <path>       - Attach a file to the next message
  /files               - Show attached files
  /detach              - Drop all attached files
  /think               - Toggle the thinking trace
  /search <ai|rosti|online> - Toggle a search source
  /retry               - Resend the last failed message
  /partial             - Keep the text received before the failure
  /dismiss             - Dismiss the last error
  /like, /dislike      - Rate the latest reply (again to clear)
  /regenerate          - Edit and resend the last message
  /status              - Show send and retry status
  /quit, /exit, /q     - Exit chat";

/// Interactive chat REPL
pub struct ChatRepl<A: ChatApi + 'static> {
    sender: SendMessageUseCase<A>,
    conversations: ManageConversationsUseCase<A>,
    actions: MessageActionsUseCase<A>,
    ctx: ChatContext,
    draft: Draft,
    /// Text to pre-fill on the next prompt.
    prefill: Option<String>,
    quiet: bool,
}

impl<A: ChatApi + 'static> ChatRepl<A> {
    pub fn new(
        sender: SendMessageUseCase<A>,
        conversations: ManageConversationsUseCase<A>,
        actions: MessageActionsUseCase<A>,
        ctx: ChatContext,
    ) -> Self {
        Self {
            sender,
            conversations,
            actions,
            ctx,
            draft: Draft::default(),
            prefill: None,
            quiet: false,
        }
    }

    /// Disable live streaming output
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        let history_path = dirs::data_dir().map(|p| p.join("rosti-chat").join("history.txt"));
        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = rl.load_history(path) {
                debug!("No REPL history loaded from {}: {}", path.display(), e);
            }
        }

        self.print_welcome().await;

        loop {
            let prompt = self.prompt();
            let readline = match self.prefill.take() {
                Some(initial) => rl.readline_with_initial(&prompt, (initial.as_str(), "")),
                None => rl.readline(&prompt),
            };

            match readline {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if line.starts_with('/') {
                        if self.handle_command(line).await {
                            break;
                        }
                        continue;
                    }

                    let _ = rl.add_history_entry(line);
                    self.process_message(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history_path {
            if let Err(e) = rl.save_history(path) {
                warn!("Failed to save REPL history to {}: {}", path.display(), e);
            }
        }

        Ok(())
    }

    fn prompt(&self) -> String {
        if self.draft.files.is_empty() {
            ">>> ".to_string()
        } else {
            format!("[{} file(s)] >>> ", self.draft.files.len())
        }
    }

    async fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│              Rosti - Chat Mode              │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        let store = self.ctx.store().await;
        match store.current() {
            Some(conversation) => println!("Conversation: {}", conversation.title.bold()),
            None => println!("A new conversation starts with your first message."),
        }
        println!("Type /help for commands.");
        println!();
    }

    fn reporter(&self, show_thinking: bool) -> Box<dyn SendProgressNotifier> {
        if self.quiet {
            Box::new(QuietReporter)
        } else {
            Box::new(StreamReporter::new(show_thinking))
        }
    }

    async fn process_message(&mut self, text: &str) {
        println!();
        self.draft.text = text.to_string();
        let show_thinking = self.ctx.store().await.show_think_process();
        let progress = self.reporter(show_thinking);

        let result = self.sender.send(&mut self.draft, progress.as_ref()).await;
        self.report_outcome(result, show_thinking).await;
        self.draft.text.clear();
        println!();
    }

    async fn report_outcome(&self, result: Result<SendOutcome, SendError>, show_thinking: bool) {
        match result {
            Ok(SendOutcome::Completed { message_id, .. }) => {
                let store = self.ctx.store().await;
                if let Some(message) = store.message(&message_id) {
                    if self.quiet {
                        println!("{}", ConsoleFormatter::format_message(message, show_thinking));
                    } else if !message.source_documents().is_empty() {
                        println!(
                            "{}",
                            ConsoleFormatter::format_sources(message.source_documents())
                        );
                    }
                }
            }
            Ok(SendOutcome::Failed { retryable, .. }) => {
                if retryable {
                    println!(
                        "{}",
                        "Use /retry to resend or /partial to keep the partial reply.".dimmed()
                    );
                }
            }
            Ok(SendOutcome::Skipped) => {}
            Err(e) if e.is_busy() => println!("{}", "A message is already being sent.".yellow()),
            Err(e) => {
                warn!("Send rejected: {}", e);
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
        }
    }

    /// Handle slash commands. Returns true if should exit.
    async fn handle_command(&mut self, line: &str) -> bool {
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };

        debug!("REPL command {} {:?}", cmd, arg);
        match cmd {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                return true;
            }
            "/help" | "/h" | "/?" => {
                println!();
                println!("{}", HELP);
                println!();
            }
            "/new" => {
                self.conversations.new_conversation().await;
                println!("Started a new conversation.");
            }
            "/list" => self.list_conversations().await,
            "/open" => self.open_conversation(arg).await,
            "/rename" => self.rename_conversation(arg).await,
            "/delete" => self.delete_conversation(arg).await,
            "/history" => {
                let store = self.ctx.store().await;
                println!(
                    "{}",
                    ConsoleFormatter::format_history(store.messages(), store.show_think_process())
                );
            }
            "/attach" => self.attach(arg).await,
            "/files" => {
                if self.draft.files.is_empty() {
                    println!("No files attached.");
                }
                for file in &self.draft.files {
                    println!("  {} ({} bytes)", file.filename, file.size());
                }
            }
            "/detach" => {
                self.draft.files.clear();
                println!("Attachments cleared.");
            }
            "/think" => {
                let mut store = self.ctx.store().await;
                let show = !store.show_think_process();
                store.set_show_think_process(show);
                println!("Thinking trace {}.", if show { "on" } else { "off" });
            }
            "/search" => self.toggle_search(arg).await,
            "/retry" => {
                println!();
                let show_thinking = self.ctx.store().await.show_think_process();
                let progress = self.reporter(show_thinking);
                let result = self.sender.retry_last(progress.as_ref()).await;
                self.report_outcome(result, show_thinking).await;
                println!();
            }
            "/partial" => match self.sender.use_partial_response().await {
                Ok(()) => println!("Kept the partial reply."),
                Err(e) => println!("{}", e),
            },
            "/dismiss" => {
                self.sender.dismiss_error().await;
                println!("Error dismissed.");
            }
            "/like" => self.rate(Feedback::Like).await,
            "/dislike" => self.rate(Feedback::Dislike).await,
            "/regenerate" => match self.actions.regenerate().await {
                Some(text) => self.prefill = Some(text),
                None => println!("No message to regenerate."),
            },
            "/status" => {
                let state = self.sender.retry_state().await;
                let max_retries = self.sender.config().retry.max_retries;
                let store = self.ctx.store().await;
                println!(
                    "Words in conversation: {}/{}",
                    store.word_count(),
                    self.sender.config().max_word_count
                );
                println!("{}", ConsoleFormatter::format_retry_state(&state, max_retries));
            }
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
            }
        }
        false
    }

    async fn list_conversations(&self) {
        if let Err(e) = self.conversations.refresh().await {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return;
        }
        let store = self.ctx.store().await;
        if store.conversations().is_empty() {
            println!("No conversations yet.");
            return;
        }
        println!(
            "{}",
            ConsoleFormatter::format_conversations(store.conversations(), store.current_id())
        );
    }

    /// Accepts an id or a 1-based position in the last listing.
    async fn resolve_conversation(&self, arg: &str) -> Option<String> {
        if arg.is_empty() {
            return None;
        }
        if let Ok(n) = arg.parse::<usize>() {
            let store = self.ctx.store().await;
            if let Some(conversation) = n.checked_sub(1).and_then(|i| store.conversations().get(i))
            {
                return Some(conversation.id.clone());
            }
        }
        Some(arg.to_string())
    }

    async fn open_conversation(&mut self, arg: &str) {
        let Some(id) = self.resolve_conversation(arg).await else {
            println!("Usage: /open <id|n>");
            return;
        };
        match self.conversations.select(&id).await {
            Ok(_) => {
                self.draft.files.clear();
                let store = self.ctx.store().await;
                println!(
                    "{}",
                    ConsoleFormatter::format_history(store.messages(), store.show_think_process())
                );
            }
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    async fn rename_conversation(&self, title: &str) {
        let current = self.ctx.store().await.current_id().map(str::to_string);
        let Some(id) = current else {
            println!("No conversation is open.");
            return;
        };
        match self.conversations.rename(&id, title).await {
            Ok(_) => println!("Renamed."),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    async fn delete_conversation(&self, arg: &str) {
        let target = match self.resolve_conversation(arg).await {
            Some(id) => Some(id),
            None => self.ctx.store().await.current_id().map(str::to_string),
        };
        let Some(id) = target else {
            println!("Usage: /delete [id]");
            return;
        };
        match self.conversations.delete(&id).await {
            Ok(()) => println!("Deleted {}.", id),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    async fn attach(&mut self, arg: &str) {
        if arg.is_empty() {
            println!("Usage: /attach <path>");
            return;
        }
        let file = match read_attachment(Path::new(arg)).await {
            Ok(file) => file,
            Err(e) => {
                eprintln!("{} {}: {}", "Error:".red().bold(), arg, e);
                return;
            }
        };
        let filename = file.filename.clone();
        let existing = self.ctx.store().await.attachments();
        match self
            .draft
            .attach(file, &self.sender.config().attachments, &existing)
        {
            Ok(()) => println!("Attached {}.", filename),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    async fn toggle_search(&self, arg: &str) {
        let mut options = self.sender.search_options().await;
        let (name, enabled) = match arg {
            "ai" => {
                options.search_ai_active = !options.search_ai_active;
                ("Knowledge-base search", options.search_ai_active)
            }
            "rosti" => {
                options.search_rosti_active = !options.search_rosti_active;
                ("Rosti search", options.search_rosti_active)
            }
            "online" => {
                options.search_online_active = !options.search_online_active;
                ("Online search", options.search_online_active)
            }
            _ => {
                println!("Usage: /search <ai|rosti|online>");
                return;
            }
        };
        self.sender.set_search_options(options).await;
        println!("{} {}.", name, if enabled { "on" } else { "off" });
    }

    async fn rate(&self, feedback: Feedback) {
        let Some(id) = self.actions.latest_reply_id().await else {
            println!("No saved reply to rate.");
            return;
        };
        match self.actions.toggle_feedback(&id, feedback).await {
            Ok(Some(rating)) => println!("Rated: {}", rating.as_str()),
            Ok(None) => println!("Rating cleared."),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }
}
