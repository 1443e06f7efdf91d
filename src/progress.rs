//! Progress spinners for the fetch phases.
//!
//! In log-only mode spinners are hidden and phases are reported through
//! `tracing` instead, for tail-friendly output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Set once from `--log-only`; read by every spinner
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// `1.5s` under a minute, `2.3m` above.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Spinner for a network phase of unknown length.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        tracing::info!(phase = msg, "started");
    } else {
        // Template is a literal; fall back to the default style rather than fail
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Finish a spinner with a summary line.
pub fn finish(pb: &ProgressBar, msg: String) {
    if is_log_only() {
        tracing::info!(elapsed = %format_duration(pb.elapsed()), "{}", msg);
    }
    pb.finish_with_message(msg);
}

/// Update a spinner's message for batch/page progress.
pub fn step(pb: &ProgressBar, msg: String) {
    if is_log_only() {
        tracing::debug!("{}", msg);
    }
    pb.set_message(msg);
}
