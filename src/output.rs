//! CLI output formatting.
//!
//! Logging (via `tracing`) is for operators; these lines are for the person at
//! the terminal. Formatters return lines instead of printing so tests can check
//! them, and a thin `print_*` wrapper writes them to stdout.
//!
//! # Output Format
//!
//! ## Intake
//!
//! ```text
//! photo.PNG
//!     Uploaded: https://img.example.com/5f0c….jpg
//!     Uploaded: https://img.example.com/5f0c…_qr.jpg
//! old.jpg
//!     Skipped: already uploaded
//! broken.png
//!     Failed: Failed to process /watch/broken.png: …
//! ```
//!
//! ## Ledger
//!
//! ```text
//! 001 5f0c6a8e-8d7b-4c1e-9f3a-2b6d1e0c4a97.jpg
//! 002 5f0c6a8e-8d7b-4c1e-9f3a-2b6d1e0c4a97_qr.jpg
//! 003 source/photo.PNG
//! 3 entries in uploaded.json
//! ```

use crate::intake::IntakeOutcome;
use std::path::Path;

fn format_index(pos: usize) -> String {
    format!("{:03}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Lines describing the outcome of one intake.
pub fn format_outcome(path: &Path, outcome: &IntakeOutcome) -> Vec<String> {
    let mut lines = vec![display_name(path)];
    match outcome {
        IntakeOutcome::Ignored => {
            lines.push(format!("{}Ignored: not a .jpg/.jpeg/.png file", indent(1)));
        }
        IntakeOutcome::Skipped => {
            lines.push(format!("{}Skipped: already uploaded", indent(1)));
        }
        IntakeOutcome::Completed(results) => {
            for result in results {
                lines.push(format!("{}Uploaded: {}", indent(1), result.url));
            }
        }
        IntakeOutcome::Failed(message) => {
            lines.push(format!("{}Failed: {}", indent(1), message));
        }
    }
    lines
}

pub fn print_outcome(path: &Path, outcome: &IntakeOutcome) {
    for line in format_outcome(path, outcome) {
        println!("{}", line);
    }
}

/// Numbered ledger entries followed by a summary line.
pub fn format_ledger(ids: &[String], ledger_path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| format!("{} {}", format_index(i + 1), id))
        .collect();
    let noun = if ids.len() == 1 { "entry" } else { "entries" };
    lines.push(format!("{} {} in {}", ids.len(), noun, ledger_path.display()));
    lines
}

pub fn print_ledger(ids: &[String], ledger_path: &Path) {
    for line in format_ledger(ids, ledger_path) {
        println!("{}", line);
    }
}
