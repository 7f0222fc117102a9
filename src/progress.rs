//! Progress indicators

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner with a message; hidden when `quiet`
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Finish a spinner with a success mark
pub fn finish_success(spinner: &ProgressBar, message: &str, quiet: bool) {
    spinner.finish_and_clear();
    if !quiet {
        println!("{} {}", "✓".green(), message);
    }
}

/// Finish a spinner with an error mark
pub fn finish_error(spinner: &ProgressBar, message: &str) {
    spinner.finish_and_clear();
    eprintln!("{} {}", "✗".red(), message);
}
