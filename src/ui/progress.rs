//! Progress indicators with CI fallback

use super::context::UiContext;
use super::output::{step_error, step_ok};
use crate::error::BuildError;
use crate::hashsum::Signature;
use crate::pipeline::BuildObserver;
use crate::stage::{StageName, StageOutcome};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<ProgressBar>,
    ctx: UiContext,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            ctx: ctx.clone(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.ctx.use_fancy_output() {
            let spinner = ProgressBar::new_spinner();
            if let Ok(spinner_style) = ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}  {elapsed:.dim}")
            {
                spinner.set_style(spinner_style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            spinner.set_message(message.to_string());
            spinner.enable_steady_tick(Duration::from_millis(120));
            self.spinner = Some(spinner);
        } else {
            eprintln!("  {} {}", style("...").dim(), message);
        }
    }

    pub fn is_running(&self) -> bool {
        self.spinner.is_some()
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        self.clear();
        step_ok(&self.ctx, message);
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        self.clear();
        step_error(&self.ctx, message);
    }

    /// Clear the spinner without any message
    pub fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Renders pipeline progress: a spinner for stages that do real work, a
/// single line for the rest.
pub struct StageProgress {
    ctx: UiContext,
    spinner: TaskSpinner,
}

impl StageProgress {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            ctx: ctx.clone(),
            spinner: TaskSpinner::new(ctx),
        }
    }
}

fn outcome_label(outcome: StageOutcome) -> &'static str {
    match outcome {
        StageOutcome::Cached => "cached",
        StageOutcome::Built => "built",
    }
}

impl BuildObserver for StageProgress {
    fn stage_started(&mut self, name: StageName, signature: &Signature, detailed: bool) {
        if detailed {
            self.spinner
                .start(&format!("Building {} stage ({})", name, signature.short()));
        }
    }

    fn stage_finished(&mut self, name: StageName, outcome: StageOutcome) {
        let message = format!("{} stage {}", name, outcome_label(outcome));
        if self.spinner.is_running() {
            self.spinner.stop(&message);
        } else {
            step_ok(&self.ctx, &message);
        }
    }

    fn stage_failed(&mut self, name: StageName, error: &BuildError) {
        let message = format!("{} stage failed: {}", name, error);
        if self.spinner.is_running() {
            self.spinner.stop_error(&message);
        } else {
            step_error(&self.ctx, &message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashsum::{hashsum, Dependency};

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Testing...");
        assert!(!spinner.is_running());
        spinner.stop("Done");
    }

    #[test]
    fn stage_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut progress = StageProgress::new(&ctx);
        let signature = hashsum(&[Dependency::from("x")]);

        progress.stage_started(StageName::From, &signature, false);
        progress.stage_finished(StageName::From, StageOutcome::Cached);
        progress.stage_started(StageName::Shell, &signature, true);
        progress.stage_failed(StageName::Shell, &BuildError::ParentNotBuilt);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(outcome_label(StageOutcome::Cached), "cached");
        assert_eq!(outcome_label(StageOutcome::Built), "built");
    }
}
