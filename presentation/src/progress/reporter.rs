//! Progress reporting while a reply streams in

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rosti_application::SendProgressNotifier;
use rosti_domain::ChatEvent;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
struct StreamState {
    /// Printing the thinking trace; a header was emitted.
    in_thought: bool,
    /// Answer text has been printed for this attempt.
    answered: bool,
}

/// Prints the reply as it streams, with a spinner during retry backoff
pub struct StreamReporter {
    show_thinking: bool,
    spinner: Mutex<Option<ProgressBar>>,
    state: Mutex<StreamState>,
}

impl StreamReporter {
    pub fn new(show_thinking: bool) -> Self {
        Self {
            show_thinking,
            spinner: Mutex::new(None),
            state: Mutex::new(StreamState::default()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn clear_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock()
            && let Some(pb) = spinner.take()
        {
            pb.finish_and_clear();
        }
    }

    fn write(text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{}", text);
        let _ = stdout.flush();
    }
}

impl SendProgressNotifier for StreamReporter {
    fn on_attempt_start(&self, attempt: u32) {
        self.clear_spinner();
        if let Ok(mut state) = self.state.lock() {
            // A retried attempt restarts the reply from scratch.
            if attempt > 1 && (state.answered || state.in_thought) {
                Self::write(&format!("\n{}\n", "-- connection lost, restarting reply --".dimmed()));
            }
            *state = StreamState::default();
        }
    }

    fn on_event(&self, event: &ChatEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match event {
            ChatEvent::Thought(chunk) if self.show_thinking => {
                if !state.in_thought {
                    Self::write(&format!("{}\n", "Thinking:".dimmed()));
                    state.in_thought = true;
                }
                Self::write(&chunk.dimmed().to_string());
            }
            ChatEvent::Text(chunk) => {
                if !state.answered {
                    if state.in_thought {
                        Self::write("\n\n");
                    }
                    Self::write(&format!("{} ", "Rosti:".cyan().bold()));
                    state.answered = true;
                }
                Self::write(chunk);
            }
            ChatEvent::Error(error) => {
                Self::write(&format!("\n\n{}", format!("Error: {}", error).red()));
            }
            _ => {}
        }
    }

    fn on_conversation_limit(&self, word_count: usize) {
        println!(
            "{} conversation reached {} words; starting a new one",
            "!".yellow().bold(),
            word_count
        );
    }

    fn on_retry(&self, retry: u32, max_retries: u32, error: &str, delay: Duration) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_message(format!(
            "retrying ({}/{}) in {:.1}s: {}",
            retry,
            max_retries,
            delay.as_secs_f64(),
            error
        ));
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut spinner) = self.spinner.lock() {
            *spinner = Some(pb);
        }
    }

    fn on_complete(&self) {
        self.clear_spinner();
        Self::write("\n");
    }

    fn on_failed(&self, error: &str) {
        self.clear_spinner();
        eprintln!("\n{} {}", "Error:".red().bold(), error);
    }
}

/// Minimal reporter: no live output, only retries and failures
pub struct QuietReporter;

impl SendProgressNotifier for QuietReporter {
    fn on_retry(&self, retry: u32, max_retries: u32, error: &str, delay: Duration) {
        eprintln!(
            "retry {}/{} in {:.1}s: {}",
            retry,
            max_retries,
            delay.as_secs_f64(),
            error
        );
    }

    fn on_complete(&self) {}

    fn on_failed(&self, error: &str) {
        eprintln!("Error: {}", error);
    }
}
