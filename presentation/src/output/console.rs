//! Console output formatter for conversations and messages

use colored::Colorize;
use rosti_domain::{Conversation, Message, RetryState, SourceDocument};

/// Formats chat state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format one message, optionally with its thinking trace
    pub fn format_message(message: &Message, show_thinking: bool) -> String {
        let mut output = String::new();

        if message.is_user() {
            output.push_str(&format!("{} {}\n", "You:".green().bold(), message.content));
            for attachment in &message.attachments {
                output.push_str(&format!("  {} {}\n", "+".dimmed(), attachment.filename));
            }
            return output;
        }

        if show_thinking && !message.thinking.is_empty() {
            output.push_str(&format!("{}\n", "Thinking:".dimmed()));
            output.push_str(&format!("{}\n", Self::indent(&message.thinking, "  ").dimmed()));
        }

        output.push_str(&format!("{} ", "Rosti:".cyan().bold()));
        if message.content.starts_with("Error: ") {
            output.push_str(&format!("{}\n", message.content.red()));
        } else {
            output.push_str(&format!("{}\n", message.content));
        }

        let sources = message.source_documents();
        if !sources.is_empty() {
            output.push_str(&Self::format_sources(sources));
        }
        output
    }

    /// Format the full message history of a conversation
    pub fn format_history(messages: &[Message], show_thinking: bool) -> String {
        messages
            .iter()
            .map(|m| Self::format_message(m, show_thinking))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format retrieved documents as a numbered list
    pub fn format_sources(sources: &[SourceDocument]) -> String {
        let mut output = format!("\n{}\n", "Sources:".yellow().bold());
        for (i, doc) in sources.iter().enumerate() {
            output.push_str(&format!("  [{}] {}\n", i + 1, doc.display_name()));
        }
        output
    }

    /// Format the conversation list, marking the current one
    pub fn format_conversations(conversations: &[Conversation], current: Option<&str>) -> String {
        if conversations.is_empty() {
            return format!("{}\n", "No conversations yet.".dimmed());
        }

        let mut output = String::new();
        for (i, conversation) in conversations.iter().enumerate() {
            let marker = if Some(conversation.id.as_str()) == current {
                "*".green().bold().to_string()
            } else {
                " ".to_string()
            };
            let title = if conversation.title.is_empty() {
                "(untitled)".dimmed().to_string()
            } else {
                conversation.title.clone()
            };
            output.push_str(&format!(
                "{} {:>3}. {}  {}\n",
                marker,
                i + 1,
                title,
                conversation.id.dimmed()
            ));
        }
        output
    }

    /// Format the retry state of the last send
    pub fn format_retry_state(state: &RetryState, max_retries: u32) -> String {
        match &state.last_error {
            None if state.is_retrying => format!(
                "{} retrying ({}/{})",
                "~".yellow(),
                state.retry_count,
                max_retries
            ),
            None => format!("{} no errors", "v".green()),
            Some(error) => {
                let mut output = format!("{} {}", "x".red(), error);
                if !state.partial_response.is_empty() {
                    output.push_str(&format!(
                        "\n  {} chars of partial response available (/partial)",
                        state.partial_response.chars().count()
                    ));
                }
                output
            }
        }
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosti_domain::SearchResults;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_user_message() {
        plain();
        let output = ConsoleFormatter::format_message(&Message::user("hi", vec![]), false);
        assert_eq!(output, "You: hi\n");
    }

    #[test]
    fn test_format_bot_message_with_sources_and_thinking() {
        plain();
        let mut message = Message::placeholder("temp-1");
        message.content = "Answer".to_string();
        message.thinking = "step one\nstep two".to_string();
        message.search_results = Some(SearchResults {
            source_documents: vec![SourceDocument {
                rag_item_name: Some("Handbook".to_string()),
                ..SourceDocument::default()
            }],
            ..SearchResults::default()
        });

        let hidden = ConsoleFormatter::format_message(&message, false);
        assert!(!hidden.contains("step one"));
        assert!(hidden.contains("Rosti: Answer"));
        assert!(hidden.contains("[1] Handbook"));

        let shown = ConsoleFormatter::format_message(&message, true);
        assert!(shown.contains("  step one\n  step two"));
    }

    #[test]
    fn test_format_conversations_marks_current() {
        plain();
        let conversations = vec![Conversation::new("a", "First"), Conversation::new("b", "")];
        let output = ConsoleFormatter::format_conversations(&conversations, Some("b"));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "    1. First  a");
        assert_eq!(lines[1], "*   2. (untitled)  b");
    }

    #[test]
    fn test_format_retry_state() {
        plain();
        let mut state = RetryState::new();
        assert!(ConsoleFormatter::format_retry_state(&state, 3).contains("no errors"));

        state.record_failure("Network error: reset");
        state.partial_response = "abc".to_string();
        let output = ConsoleFormatter::format_retry_state(&state, 3);
        assert!(output.contains("Network error: reset"));
        assert!(output.contains("3 chars"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
