//! Spinner utilities using indicatif for terminal output
//!
//! The analyze command drives an [`AnalysisProgress`] from the orchestrator's
//! event channel so the user sees per-persona progress while evaluations run.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cli::display::format_elapsed;
use crate::services::AnalysisEvent;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Create a spinner for indeterminate operations
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS);
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Extension trait for ProgressBar to add common finishing methods
pub trait ProgressBarExt {
    /// Finish with a success message (green checkmark)
    fn finish_success(&self, message: impl Into<String>);

    /// Finish with an error message (red X)
    fn finish_error(&self, message: impl Into<String>);

    /// Finish with a warning message (yellow !)
    fn finish_warning(&self, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✓ {}", message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✗ {}", message.into()));
    }

    fn finish_warning(&self, message: impl Into<String>) {
        self.finish_with_message(format!("! {}", message.into()));
    }
}

/// Renders orchestrator events on a spinner line.
pub struct AnalysisProgress {
    bar: ProgressBar,
    total: usize,
    /// persona id -> whether its last evaluation succeeded
    settled: HashMap<String, bool>,
    current: Option<String>,
    overall_score: u8,
}

impl AnalysisProgress {
    /// A visible spinner, or a hidden one for JSON mode.
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            create_spinner()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_draw_target(ProgressDrawTarget::hidden());
            bar
        };
        Self {
            bar,
            total: 0,
            settled: HashMap::new(),
            current: None,
            overall_score: 0,
        }
    }

    fn completed(&self) -> usize {
        self.settled.values().filter(|ok| **ok).count()
    }

    fn failed(&self) -> usize {
        self.settled.values().filter(|ok| !**ok).count()
    }

    /// Current status line.
    pub fn message(&self) -> String {
        let mut message = format!(
            "{}/{} personas done, score {}",
            self.completed() + self.failed(),
            self.total,
            self.overall_score
        );
        if self.failed() > 0 {
            message.push_str(&format!(", {} failed", self.failed()));
        }
        if let Some(current) = &self.current {
            message.push_str(&format!(" | {current}"));
        }
        message
    }

    pub fn apply(&mut self, event: &AnalysisEvent) {
        match event {
            AnalysisEvent::Started { url, persona_count, .. } => {
                self.total = *persona_count;
                self.bar.set_message(format!("Fetching {url}"));
                return;
            }
            AnalysisEvent::ContentFetched { title, .. } => {
                self.current = Some(format!("fetched \"{title}\""));
            }
            AnalysisEvent::CompetitorFetchFailed { url, .. } => {
                self.current = Some(format!("competitor {url} unavailable"));
            }
            AnalysisEvent::PersonaStarted { persona_name, .. } => {
                self.current = Some(format!("{persona_name} analyzing"));
            }
            AnalysisEvent::PersonaCompleted { persona_id, overall_score, .. } => {
                self.settled.insert(persona_id.clone(), true);
                self.overall_score = *overall_score;
            }
            AnalysisEvent::PersonaFailed { persona_id, .. } => {
                self.settled.insert(persona_id.clone(), false);
            }
            AnalysisEvent::CompetitorScanned { url, overall_score } => {
                self.current = Some(format!("competitor {url} scored {overall_score}"));
            }
            AnalysisEvent::CompetitorScanFailed { url, .. } => {
                self.current = Some(format!("competitor {url} skipped"));
            }
            AnalysisEvent::Completed { overall_score, elapsed_ms, .. } => {
                self.overall_score = *overall_score;
                self.current = None;
                self.bar.finish_success(format!(
                    "Analysis completed: score {overall_score} in {}",
                    format_elapsed(*elapsed_ms)
                ));
                return;
            }
            AnalysisEvent::Failed { error, .. } => {
                self.bar.finish_error(format!("Analysis failed: {error}"));
                return;
            }
            AnalysisEvent::Cancelled { .. } => {
                self.bar.finish_warning("Analysis cancelled");
                return;
            }
        }
        self.bar.set_message(self.message());
    }

    /// Consume events until the sender side is dropped.
    pub fn spawn(mut self, mut events: mpsc::Receiver<AnalysisEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.apply(&event);
            }
            if !self.bar.is_finished() {
                self.bar.finish_and_clear();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_create_spinner() {
        let spinner = create_spinner();
        spinner.set_message("Testing");
        spinner.finish_success("done");
    }

    #[test]
    fn test_progress_counts_retried_persona_once() {
        let mut progress = AnalysisProgress::new(false);
        progress.apply(&AnalysisEvent::Started {
            analysis_id: Uuid::new_v4(),
            url: "https://example.com".to_string(),
            persona_count: 2,
        });
        progress.apply(&AnalysisEvent::PersonaFailed {
            persona_id: "seo".to_string(),
            error: "timeout".to_string(),
        });
        progress.apply(&AnalysisEvent::PersonaCompleted {
            persona_id: "ux".to_string(),
            score: 70,
            overall_score: 70,
        });
        assert_eq!(progress.message(), "2/2 personas done, score 70, 1 failed");

        progress.apply(&AnalysisEvent::PersonaCompleted {
            persona_id: "seo".to_string(),
            score: 90,
            overall_score: 80,
        });
        assert_eq!(progress.message(), "2/2 personas done, score 80");
    }

    #[tokio::test]
    async fn test_spawn_finishes_when_channel_closes() {
        let (tx, rx) = mpsc::channel(8);
        let handle = AnalysisProgress::new(false).spawn(rx);
        tx.send(AnalysisEvent::Cancelled { analysis_id: Uuid::new_v4() })
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
