// src/progress.rs

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;

/// Receives progress events for one unit of work.
///
/// `complete` marks the unit finished whether it succeeded or not and is
/// called exactly once per job.
pub trait ProgressSink: Send + Sync {
    fn increment(&self);
    fn set_total(&self, total: u64);
    fn complete(&self);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn increment(&self) {}
    fn set_total(&self, _total: u64) {}
    fn complete(&self) {}
}

impl ProgressSink for ProgressBar {
    fn increment(&self) {
        self.inc(1);
    }

    fn set_total(&self, total: u64) {
        self.set_length(total);
    }

    fn complete(&self) {
        self.finish_and_clear();
    }
}

/// Calls `complete` on the sink when dropped, including during a panic.
pub struct CompleteOnDrop(pub Arc<dyn ProgressSink>);

impl Drop for CompleteOnDrop {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Advances the bar by one when dropped, including during a panic.
pub struct TickOnDrop(pub ProgressBar);

impl Drop for TickOnDrop {
    fn drop(&mut self) {
        self.0.inc(1);
    }
}

/// Owns the terminal bars of one run.
#[derive(Debug, Clone)]
pub struct Progress {
    multi: MultiProgress,
}

impl Progress {
    /// Bars are drawn on stderr when `enabled`, hidden otherwise.
    pub fn new(enabled: bool) -> Self {
        let multi = if enabled {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        Self { multi }
    }

    /// Bar advanced once per raw URL during classification.
    pub fn parsing_bar(&self, total: u64) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(style("{prefix} {bar:100} {pos} / {len} {percent:>3}%"));
        bar.set_prefix("Parsing URLs:");
        bar
    }

    /// Bar advanced once per finished job during downloading.
    pub fn overall_bar(&self, total: u64) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(style("{prefix} {msg} {bar:100} {pos} / {len} {percent:>3}%"));
        bar.set_prefix("Medias:");
        bar.set_message("Downloading...");
        bar
    }

    /// Transient bar for a single job, removed when the job completes.
    ///
    /// Direct transfers count as one unit; segmented ones get their total
    /// from the segment count.
    pub fn job_bar(&self, file_name: &str, segmented: bool) -> ProgressBar {
        let total = if segmented { 0 } else { 1 };
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(style("\t{prefix} {bar:65} {pos} / {len} {percent:>3}%"));
        bar.set_prefix(format!("{file_name}:"));
        bar
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}
