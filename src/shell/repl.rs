use std::path::{Path, PathBuf};

use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::shell::{Outcome, Shell, format};

/// Reads commands until `exit` or end of input.
///
/// History is loaded from and saved to `history_path` when one is given.
pub fn run(shell: &mut Shell, history_path: Option<&Path>) -> Result<(), ReplError> {
    let mut editor: Editor<(), DefaultHistory> = Editor::new().context(EditorSnafu)?;
    if let Some(path) = history_path {
        load_history(&mut editor, path);
    }

    println!(
        "{}",
        format!(
            "Initializing system at: {}",
            shell.session().root_path().display()
        )
        .green()
    );

    loop {
        match editor.readline(&shell.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = editor.add_history_entry(line.as_str()) {
                        warn!("Failed to add history entry: {err}");
                    }
                }

                match shell.execute(&line) {
                    Ok(Outcome::Output(text)) if !text.is_empty() => println!("{text}"),
                    Ok(Outcome::Output(_) | Outcome::Silent) => {}
                    Ok(Outcome::Exit) => break,
                    Err(err) => eprintln!("{}", format::error_message(&err).red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context(ReadLineSnafu),
        }
    }

    if let Some(path) = history_path {
        save_history(&mut editor, path);
    }
    Ok(())
}

fn load_history(editor: &mut Editor<(), DefaultHistory>, path: &Path) {
    match editor.load_history(path) {
        Ok(()) => debug!("Loaded history from {}", path.display()),
        Err(ReadlineError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("Failed to load history: {err}"),
    }
}

fn save_history(editor: &mut Editor<(), DefaultHistory>, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            warn!("Failed to create history directory: {err}");
        }
    }
    if let Err(err) = editor.save_history(path) {
        warn!("Failed to save history: {err}");
    }
}

/// Default history location inside the home directory.
pub fn default_history_path(home: &Path) -> PathBuf {
    home.join(".canopy_history")
}

#[derive(Debug, Snafu)]
pub enum ReplError {
    #[snafu(display("Failed to initialize the line editor"))]
    EditorError { source: ReadlineError },
    #[snafu(display("Failed to read input"))]
    ReadLineError { source: ReadlineError },
}
