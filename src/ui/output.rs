//! Leveled, timestamped terminal output.

use chrono::Local;
use console::style;

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Show everything, including per-decision detail.
    Verbose,
    /// Show status lines.
    #[default]
    Normal,
    /// Show only warnings, errors, and the final report.
    Quiet,
}

impl OutputMode {
    /// Whether info-level lines are shown.
    pub fn shows_info(&self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Whether detail-level lines are shown.
    pub fn shows_detail(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Whether spinners are shown.
    pub fn shows_spinners(&self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

/// Writer for leveled, timestamped status lines.
#[derive(Debug)]
pub struct Reporter {
    mode: OutputMode,
}

impl Reporter {
    /// Create a reporter.
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// The active output mode.
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    fn stamp() -> String {
        Local::now().format("%H:%M:%S").to_string()
    }

    /// An info line.
    pub fn info(&self, msg: &str) {
        if self.mode.shows_info() {
            println!("{} {}", style(Self::stamp()).dim(), msg);
        }
    }

    /// A detail line. Shown only in verbose mode.
    pub fn detail(&self, msg: &str) {
        if self.mode.shows_detail() {
            println!("{} {}", style(Self::stamp()).dim(), style(msg).dim());
        }
    }

    /// A success line.
    pub fn success(&self, msg: &str) {
        if self.mode.shows_info() {
            println!(
                "{} {} {}",
                style(Self::stamp()).dim(),
                style("✓").green(),
                msg
            );
        }
    }

    /// A warning line. Shown in every mode.
    pub fn warning(&self, msg: &str) {
        eprintln!(
            "{} {} {}",
            style(Self::stamp()).dim(),
            style("!").yellow().bold(),
            msg
        );
    }

    /// An error line. Shown in every mode.
    pub fn error(&self, msg: &str) {
        eprintln!(
            "{} {} {}",
            style(Self::stamp()).dim(),
            style("✗").red().bold(),
            msg
        );
    }
}
