//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Publish summaries with one line per publication
//! - Promotion diffs grouped by component
//! - Cleanup and purge reports

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use aptpub_engine::{
    ChangeKind, CleanupReport, ComponentReport, PromoteOutcome, PublishSummary, PurgeReport,
    ReconcileOutcome,
};

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

fn outcome_line(name: &str, outcome: ReconcileOutcome) -> String {
    let icon = match outcome {
        ReconcileOutcome::UpToDate => style("·").dim(),
        ReconcileOutcome::StaleUnresolved => style("⚠").yellow(),
        _ => style("✓").green(),
    };
    format!("  {} {} {}", icon, style(name).cyan(), style(outcome).dim())
}

/// One line per publication, failures last
pub fn print_publish_summary(summary: &PublishSummary) {
    if summary.results.is_empty() {
        println!("{}", style("Nothing to publish").dim());
        return;
    }

    for (name, result) in &summary.results {
        if let Ok(outcome) = result {
            println!("{}", outcome_line(name, *outcome));
        }
    }
    for (name, error) in summary.failures() {
        println!("  {} {}: {}", style("✗").red(), style(name).cyan(), error);
    }
}

pub fn print_promote_outcome(source: &str, target: &str, outcome: PromoteOutcome) {
    match outcome {
        PromoteOutcome::UpToDate => println!(
            "{} {} is up to date with {}",
            style("·").dim(),
            style(target).cyan(),
            style(source).cyan()
        ),
        PromoteOutcome::Promoted(outcome) => println!(
            "{} Promoted {} → {} ({})",
            style("✓").green().bold(),
            style(source).cyan(),
            style(target).cyan(),
            outcome
        ),
    }
}

/// Promotion preview of one source/target pair
pub fn print_diff_report(source: &str, target: &str, reports: &[ComponentReport]) {
    println!(
        "{} {} → {}",
        style("Promotion").bold(),
        style(source).cyan(),
        style(target).cyan()
    );

    if reports.is_empty() {
        println!("  {}", style("nothing to promote").dim());
        return;
    }

    for report in reports {
        println!(
            "  {} {} ({} → {})",
            style("→").blue(),
            style(&report.component).yellow(),
            report.target_snapshot.as_deref().unwrap_or("none"),
            report.source_snapshot.as_deref().unwrap_or("none"),
        );
        if report.packages.is_empty() {
            for snapshot in &report.snapshots {
                println!("    {} {}", style("+").green(), snapshot);
            }
            continue;
        }

        for change in &report.packages {
            let (icon, versions) = match change.kind() {
                ChangeKind::Added => (
                    style("+").green(),
                    change.new.clone().unwrap_or_default(),
                ),
                ChangeKind::Removed => (style("-").red(), change.old.clone().unwrap_or_default()),
                kind => {
                    let icon = match kind {
                        ChangeKind::Upgraded => style("↑").green(),
                        ChangeKind::Downgraded => style("↓").yellow(),
                        _ => style("~").dim(),
                    };
                    (
                        icon,
                        format!(
                            "{} → {}",
                            change.old.as_deref().unwrap_or_default(),
                            change.new.as_deref().unwrap_or_default()
                        ),
                    )
                }
            };
            println!(
                "    {} {} [{}] {}",
                icon,
                change.name,
                style(&change.arch).dim(),
                versions
            );
        }
    }
}

pub fn print_cleanup_report(report: &CleanupReport, dry_run: bool) {
    let verb = if dry_run { "Would delete" } else { "Deleted" };
    for name in &report.deleted {
        println!("  {} {}", style("-").red(), name);
    }
    for name in &report.in_use {
        println!("  {} {} {}", style("⚠").yellow(), name, style("(in use)").dim());
    }
    println!(
        "{} {}, kept {}",
        verb,
        pluralize(report.deleted.len(), "snapshot", "snapshots"),
        report.kept
    );
}

pub fn print_purge_report(publication: &str, report: &PurgeReport) {
    println!("{}", style(publication).cyan().bold());
    for component in &report.components {
        if component.changed() {
            println!(
                "  {} {}: {} → {}",
                style("✓").green(),
                style(&component.component).yellow(),
                pluralize(component.removed.len(), "old package", "old packages"),
                component.snapshot
            );
        } else {
            println!(
                "  {} {}: {}",
                style("·").dim(),
                style(&component.component).yellow(),
                style("already minimal").dim()
            );
        }
    }
    for (repo, deleted) in &report.deleted {
        println!(
            "  {} {} deleted from repository {}",
            style("-").red(),
            pluralize(deleted.len(), "package", "packages"),
            repo
        );
    }
}

/// Progress bar over a known number of items, hidden when stderr is not a terminal
pub fn progress_bar(len: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_message(message.to_string());
    bar
}

/// Spinner for a single long request
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
