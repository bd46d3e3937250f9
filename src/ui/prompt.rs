//! The confirmation gate.

use crate::error::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// Ask the user to confirm before anything on the host is mutated.
///
/// Defaults to No: pressing enter aborts the run.
pub fn confirm_proceed(mutation_count: usize) -> Result<bool> {
    let question = format!(
        "{} component(s) will be installed or reinstalled. Proceed?",
        mutation_count
    );
    let confirmed = Confirm::with_theme(&prompt_theme())
        .with_prompt(question)
        .default(false)
        .interact()
        .map_err(anyhow::Error::from)?;
    Ok(confirmed)
}
