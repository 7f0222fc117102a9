//! Terminal output for runs and verification

use crate::ui;
use colored::Colorize;
use declarative::{Action, KindSummary, Observer, Outcome, RunSummary, VerifyReport};

/// Prints each stage and outcome as the pipeline runs
pub struct TerminalObserver {
    stage: usize,
    stages: usize,
    quiet: bool,
}

impl TerminalObserver {
    pub fn new(stages: usize, quiet: bool) -> Self {
        Self {
            stage: 0,
            stages,
            quiet,
        }
    }
}

impl Observer for TerminalObserver {
    fn on_stage_start(&mut self, stage: &str, count: usize) {
        self.stage += 1;
        if self.quiet {
            return;
        }
        println!();
        ui::step(self.stage, self.stages, &format!("{} ({})", stage, count));
    }

    fn on_resource_start(&mut self, description: &str) {
        log::debug!("Reconciling {}", description);
    }

    fn on_outcome(&mut self, outcome: &Outcome) {
        // Failures are always shown
        if self.quiet && outcome.is_success() {
            return;
        }
        println!("  {}", outcome_line(outcome));
        for missing in &outcome.unresolved {
            println!(
                "      {} {} unresolved, sent as null",
                "⚠".yellow(),
                missing
            );
        }
    }

    fn on_stage_complete(&mut self, stage: &str, summary: &KindSummary) {
        log::info!(
            "Stage '{}' done: {} created, {} updated, {} failed",
            stage,
            summary.created,
            summary.updated,
            summary.failed
        );
    }
}

fn outcome_line(outcome: &Outcome) -> String {
    let symbol = match &outcome.action {
        Action::Created => "+".green(),
        Action::Updated => "~".yellow(),
        Action::Existing => "○".dimmed(),
        Action::WouldCreate => "+".cyan(),
        Action::WouldUpdate => "~".cyan(),
        Action::Failed { .. } => "✗".red(),
    };

    let id = outcome
        .id
        .map(|id| format!(" #{}", id))
        .unwrap_or_default();

    let mut line = format!(
        "{} {} {:<24} {}{}",
        symbol,
        outcome.kind.dimmed(),
        outcome.key,
        outcome.action.verb(),
        id.dimmed()
    );
    if let Action::Failed { error } = &outcome.action {
        line.push_str(&format!(": {}", error.red()));
    }
    line
}

/// Print per-kind counts for a run
///
/// Quiet runs print nothing here: failures were already shown as they
/// happened.
pub fn print_summary(summary: &RunSummary, dry_run: bool, quiet: bool) {
    if quiet {
        return;
    }
    ui::header("Summary");
    for (kind, counts) in summary.by_kind() {
        let mut parts = Vec::new();
        if dry_run {
            parts.push(format!("{} planned", counts.planned));
        } else {
            parts.push(format!("{} created", counts.created));
            parts.push(format!("{} updated", counts.updated));
            if counts.existing > 0 {
                parts.push(format!("{} existing", counts.existing));
            }
        }
        if counts.failed > 0 {
            parts.push(format!("{} failed", counts.failed).red().to_string());
        }
        if counts.unresolved > 0 {
            parts.push(
                format!("{} unresolved", counts.unresolved)
                    .yellow()
                    .to_string(),
            );
        }
        ui::kv(&kind, &parts.join(", "));
    }

    let totals = summary.totals();
    println!();
    if totals.failed == 0 && totals.unresolved == 0 {
        if dry_run {
            ui::info(&format!(
                "Dry run: {} resource(s) checked, nothing written",
                totals.total()
            ));
        } else {
            ui::success(&format!("{} resource(s) reconciled", totals.total()));
        }
    } else {
        if totals.unresolved > 0 {
            ui::warn(&format!(
                "{} resource(s) written with unresolved references",
                totals.unresolved
            ));
        }
        if totals.failed > 0 {
            ui::error(&format!("{} resource(s) failed", totals.failed));
            for failure in summary.failures() {
                ui::dim(&format!("{} '{}'", failure.kind, failure.key));
            }
        }
    }
}

/// One line per failed listing or missing key
pub fn shortfall_notes(report: &VerifyReport) -> Vec<String> {
    let mut notes = Vec::new();
    for kind in &report.kinds {
        if let Some(error) = &kind.error {
            notes.push(format!("{}: listing failed: {}", kind.kind, error));
        }
        for missing in &kind.missing {
            notes.push(format!("{}: missing {}", kind.kind, missing));
        }
    }
    notes
}

/// Print found/expected counts per kind
///
/// Quiet runs only print the shortfall.
pub fn print_verify(report: &VerifyReport, quiet: bool) {
    if quiet {
        for note in shortfall_notes(report) {
            ui::error(&note);
        }
        return;
    }

    ui::header("Verification");
    for kind in &report.kinds {
        ui::kv(&kind.kind, &ui::ratio(kind.found.len(), kind.expected()));
        if let Some(error) = &kind.error {
            ui::dim(&format!("listing failed: {}", error));
        }
        for missing in &kind.missing {
            ui::dim(&format!("missing: {}", missing));
        }
    }

    let (found, expected) = report.totals();
    println!();
    if report.is_complete() {
        ui::success(&format!("All {} declared resource(s) found", expected));
    } else {
        ui::error(&format!(
            "Verification shortfall: {} of {} declared resource(s) found",
            found, expected
        ));
    }
}
