//! Terminal output, prompts, and spinners.

pub mod output;
pub mod prompt;
pub mod spinner;

pub use output::{OutputMode, Reporter};
pub use prompt::confirm_proceed;
pub use spinner::action_spinner;
