//! Progress spinner for long-running component actions.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a spinner for a component action. The compile step can run for
/// many minutes, so the steady tick keeps the terminal visibly alive.
pub fn action_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
