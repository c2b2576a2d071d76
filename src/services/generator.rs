use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::io::Console;
use crate::services::llm::{LlmClient, LlmConfig};

const SPINNER_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of one generation call. A failure is never mistaken for story text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Story(String),
    Failed(GenerationFailure),
}

impl Generation {
    pub fn story(&self) -> Option<&str> {
        match self {
            Generation::Story(text) => Some(text),
            Generation::Failed(_) => None,
        }
    }

    pub fn is_story(&self) -> bool {
        matches!(self, Generation::Story(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailure {
    pub attempts: usize,
    pub last_error: String,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error communicating with AI after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

/// Console spinner that lives exactly as long as this guard.
/// Dropping it stops the ticker thread and clears the line.
pub struct LoadingIndicator {
    bar: ProgressBar,
    running: Arc<AtomicBool>,
}

impl LoadingIndicator {
    pub fn start(visible: bool, running: Arc<AtomicBool>) -> Self {
        let bar = if visible {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{msg} {spinner:.yellow}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["|", "/", "-", "\\", " "]);
            pb.set_style(style);
            pb.set_message("Loading...");
            pb.enable_steady_tick(SPINNER_INTERVAL);
            pb
        } else {
            ProgressBar::hidden()
        };

        running.store(true, Ordering::SeqCst);
        Self { bar, running }
    }
}

impl Drop for LoadingIndicator {
    fn drop(&mut self) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Sends prompts to the backend with bounded retries.
pub struct StoryGenerator {
    llm: Box<dyn LlmClient>,
    system_prompt: String,
    max_attempts: usize,
    retry_delay: Duration,
    show_spinner: bool,
    indicator_running: Arc<AtomicBool>,
}

impl StoryGenerator {
    pub fn new(llm: Box<dyn LlmClient>, config: &LlmConfig, show_spinner: bool) -> Self {
        Self {
            llm,
            system_prompt: config.system_prompt.clone(),
            max_attempts: config.retry_count,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            show_spinner,
            indicator_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    pub fn indicator_running(&self) -> bool {
        self.indicator_running.load(Ordering::SeqCst)
    }

    /// Every failure is retried the same way, whatever its cause.
    /// Attempt diagnostics go to `console` once that attempt's spinner is gone.
    pub async fn generate(&self, console: &mut dyn Console, prompt: &str) -> Generation {
        let max_attempts = self.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let outcome = {
                let _indicator =
                    LoadingIndicator::start(self.show_spinner, self.indicator_running.clone());
                self.llm.chat(&self.system_prompt, prompt).await
            };

            match outcome {
                Ok(text) => return Generation::Story(text),
                Err(e) => {
                    last_error = format!("{:#}", e);
                    log::warn!("Generation attempt {}/{} failed: {}", attempt, max_attempts, last_error);
                    console.write_line(&format!(
                        "Attempt {}/{} failed: {}",
                        attempt, max_attempts, last_error
                    ));

                    if attempt < max_attempts {
                        console.write_line("Retrying...");
                        if !self.retry_delay.is_zero() {
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }
        }

        Generation::Failed(GenerationFailure {
            attempts: max_attempts,
            last_error,
        })
    }
}
