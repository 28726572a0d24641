use std::error::Error;

use colored::Colorize;
use snafu::CleanedErrorText;

use crate::filesystem::{Analysis, FileEntry};
use crate::shell::Action;

const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];
const UNIT_STEP: f64 = 1024.0;

/// Human readable size: plain bytes below 1 KB, one decimal above.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / UNIT_STEP;
    let mut unit = 0;
    while value >= UNIT_STEP && unit + 1 < UNITS.len() {
        value /= UNIT_STEP;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Directories with a trailing separator, files followed by their size.
pub fn listing<'a>(entries: impl IntoIterator<Item = &'a FileEntry>) -> String {
    let entries: Vec<_> = entries.into_iter().collect();
    let width = entries
        .iter()
        .map(|entry| entry.name().chars().count() + usize::from(entry.is_directory()))
        .max()
        .unwrap_or(0);

    entries
        .into_iter()
        .map(|entry| {
            if entry.is_directory() {
                format!("{}/", entry.name().blue().bold())
            } else {
                let padding = width.saturating_sub(entry.name().chars().count());
                format!(
                    "{}{}  {}",
                    entry.name(),
                    " ".repeat(padding),
                    format_size(entry.size()).dimmed()
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One absolute path per match.
pub fn matches<'a>(entries: impl IntoIterator<Item = &'a FileEntry>) -> String {
    entries
        .into_iter()
        .map(|entry| {
            let path = entry.absolute_path().display();
            if entry.is_directory() {
                format!("{path}/").blue().to_string()
            } else {
                path.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn analysis(analysis: &Analysis, top: usize) -> String {
    let mut lines = vec![
        format!("{} {}", "Total size:".bold(), format_size(analysis.total_size)),
        format!("{} {}", "Files:".bold(), analysis.file_count),
        format!("{} {}", "Directories:".bold(), analysis.dir_count),
    ];

    let extensions = analysis.top_extensions(top);
    if !extensions.is_empty() {
        lines.push("Top extensions:".bold().to_string());
        lines.extend(
            extensions
                .into_iter()
                .map(|(extension, count)| format!("  .{extension}  {count}")),
        );
    }
    lines.join("\n")
}

pub fn help() -> String {
    let width = Action::ALL
        .iter()
        .map(|action| action.usage().len())
        .max()
        .unwrap_or(0);

    Action::ALL
        .iter()
        .map(|action| {
            format!(
                "  {}{}  {}",
                action.usage().green(),
                " ".repeat(width - action.usage().len()),
                action.summary()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single line rendering of an error and its sources.
pub fn error_message(error: &(dyn Error + 'static)) -> String {
    CleanedErrorText::new(error)
        .map(|(_, text, _)| text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(": ")
}
