use std::fs;
use std::io;
use std::path::PathBuf;

use snafu::prelude::*;
use tracing::debug;

use crate::filesystem::{EntryKind, OperationError, ResolveError};
use crate::shell::{Action, Command, Session, format};

const DEFAULT_TOP_EXTENSIONS: usize = 5;

/// What the REPL should do with a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Output(String),
    Silent,
    Exit,
}

/// Parses input lines and runs them against a [`Session`].
#[derive(Debug)]
pub struct Shell {
    session: Session,
}

impl Shell {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn prompt(&self) -> String {
        format!("{} > ", self.session.prompt_name())
    }

    pub fn execute(&mut self, line: &str) -> Result<Outcome, CommandError> {
        let Some(command) = Command::parse(line)? else {
            return Ok(Outcome::Silent);
        };
        debug!("Executing {command:?}");

        let outcome = self.dispatch(&command);
        // Mutations may have discarded the current node, even when they failed halfway
        self.session.revalidate();
        outcome
    }

    fn dispatch(&mut self, command: &Command) -> Result<Outcome, CommandError> {
        match command.action {
            Action::Cd => {
                self.session
                    .change_directory(command.arg(0))
                    .context(ResolveSnafu)?;
                Ok(Outcome::Silent)
            }
            Action::Ls => self.list(command.arg(0).unwrap_or_default()),
            Action::Pwd => Ok(Outcome::Output(
                self.session.current_path().display().to_string(),
            )),
            Action::Find => self.find(command),
            Action::Analyze => self.analyze(command),
            Action::Print => self.print(command.required(0)?),
            Action::Mkdir => self.for_each_path(command, |session, path| {
                session.operations().make_directory(path)
            }),
            Action::Rm => self.for_each_path(command, |session, path| {
                session.operations().remove(path)
            }),
            Action::Rename => {
                let renamed = self
                    .session
                    .operations()
                    .rename(command.required(0)?, command.required(1)?)
                    .context(OperationSnafu)?;
                Ok(done("Renamed to", renamed))
            }
            Action::Mv => {
                let moved = self
                    .session
                    .operations()
                    .move_entry(command.required(0)?, command.required(1)?)
                    .context(OperationSnafu)?;
                Ok(done("Moved to", moved))
            }
            Action::Cp => {
                let copied = self
                    .session
                    .operations()
                    .copy(command.required(0)?, command.required(1)?)
                    .context(OperationSnafu)?;
                Ok(done("Copied to", copied))
            }
            Action::Refresh => {
                let refreshed = self
                    .session
                    .operations()
                    .refresh(command.arg(0).unwrap_or_default())
                    .context(OperationSnafu)?;
                Ok(done("Refreshed", refreshed))
            }
            Action::Help => Ok(Outcome::Output(format::help())),
            Action::Exit => Ok(Outcome::Exit),
        }
    }

    fn list(&mut self, path: &str) -> Result<Outcome, CommandError> {
        let id = self.session.resolve(path).context(ResolveSnafu)?;
        let builder = self.session.builder_mut();
        builder.fetch_children(id);

        let tree = builder.tree().context(NotLoadedSnafu)?;
        let entry = tree.value(id).context(NotLoadedSnafu)?;
        let rendered = if entry.is_directory() {
            format::listing(tree.children(id).iter().filter_map(|&child| tree.value(child)))
        } else {
            format::listing([entry])
        };
        Ok(Outcome::Output(rendered))
    }

    fn find(&mut self, command: &Command) -> Result<Outcome, CommandError> {
        let pattern = command.required(0)?;
        let kind = match command.flag("type") {
            None => EntryKind::Any,
            Some("dir" | "d" | "directory") => EntryKind::Directory,
            Some("file" | "f") => EntryKind::File,
            Some(other) => {
                return InvalidFlagSnafu {
                    flag: "type",
                    value: other,
                    expected: "dir or file",
                }
                .fail();
            }
        };

        let start = self
            .session
            .resolve(command.arg(1).unwrap_or_default())
            .context(ResolveSnafu)?;
        let builder = self.session.builder_mut();
        let found = builder.find(start, pattern, kind);
        if found.is_empty() {
            return Ok(Outcome::Output(format!("No entries matching '{pattern}'")));
        }

        let tree = builder.tree().context(NotLoadedSnafu)?;
        Ok(Outcome::Output(format::matches(
            found.iter().filter_map(|&id| tree.value(id)),
        )))
    }

    fn analyze(&mut self, command: &Command) -> Result<Outcome, CommandError> {
        let top = match command.flag("top") {
            None => DEFAULT_TOP_EXTENSIONS,
            Some(value) => value.parse().ok().context(InvalidFlagSnafu {
                flag: "top",
                value,
                expected: "a number",
            })?,
        };
        let start = self
            .session
            .resolve(command.arg(0).unwrap_or_default())
            .context(ResolveSnafu)?;

        let analysis = self.session.builder_mut().analyze(start);
        Ok(Outcome::Output(format::analysis(&analysis, top)))
    }

    fn print(&mut self, path: &str) -> Result<Outcome, CommandError> {
        let id = self.session.resolve(path).context(ResolveSnafu)?;
        let entry = self.session.builder().entry(id).context(NotLoadedSnafu)?;
        let file_path = entry.absolute_path().to_path_buf();
        ensure!(!entry.is_directory(), NotAFileSnafu { path: &file_path });

        let bytes = fs::read(&file_path).context(ReadSnafu { path: &file_path })?;
        Ok(Outcome::Output(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Runs a single-path mutation for every argument, stopping at the first
    /// failure.
    fn for_each_path<F>(&mut self, command: &Command, mut operation: F) -> Result<Outcome, CommandError>
    where
        F: FnMut(&mut Session, &str) -> Result<PathBuf, OperationError>,
    {
        command.required(0)?;
        let mut lines = Vec::with_capacity(command.args.len());
        for path in &command.args {
            let affected = operation(&mut self.session, path).context(OperationSnafu)?;
            self.session.revalidate();
            lines.push(affected.display().to_string());
        }
        Ok(Outcome::Output(lines.join("\n")))
    }
}

fn done(verb: &str, path: PathBuf) -> Outcome {
    Outcome::Output(format!("{verb} {}", path.display()))
}

#[derive(Debug, Snafu)]
pub enum CommandError {
    #[snafu(display("Unknown command '{action}', try 'help'"))]
    UnknownAction { action: String },
    #[snafu(display("Usage: {usage}"))]
    MissingArgument { usage: &'static str },
    #[snafu(display("Invalid value '{value}' for --{flag}, expected {expected}"))]
    InvalidFlag {
        flag: &'static str,
        value: String,
        expected: &'static str,
    },
    #[snafu(display("{source}"))]
    Resolve { source: ResolveError },
    #[snafu(display("{source}"))]
    Operation { source: OperationError },
    #[snafu(display("{} is a directory", path.display()))]
    NotAFile { path: PathBuf },
    #[snafu(display("Failed to read {}", path.display()))]
    Read { path: PathBuf, source: io::Error },
    #[snafu(display("No tree is loaded"))]
    NotLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::HiddenEntries;
    use rstest::*;
    use tempfile::TempDir;

    /// root/
    ///   docs/
    ///     a.txt (10 bytes)
    ///   notes.md
    #[fixture]
    fn shell() -> (TempDir, Shell) {
        colored::control::set_override(false);
        let temp = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp.path().join("docs")).unwrap();
        fs::write(temp.path().join("docs/a.txt"), "0123456789").unwrap();
        fs::write(temp.path().join("notes.md"), "# notes\n").unwrap();

        let session = Session::open(temp.path(), HiddenEntries::Skip, false).unwrap();
        (temp, Shell::new(session))
    }

    fn output(shell: &mut Shell, line: &str) -> String {
        match shell.execute(line) {
            Ok(Outcome::Output(text)) => text,
            other => panic!("'{line}' produced {other:?}"),
        }
    }

    #[rstest]
    fn blank_lines_do_nothing(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;
        assert_eq!(shell.execute("   ").unwrap(), Outcome::Silent);
    }

    #[rstest]
    #[case("exit")]
    #[case("quit")]
    fn exit_stops_the_loop(shell: (TempDir, Shell), #[case] line: &str) {
        let (_temp, mut shell) = shell;
        assert_eq!(shell.execute(line).unwrap(), Outcome::Exit);
    }

    #[rstest]
    fn ls_lists_directories_first(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;
        assert_eq!(output(&mut shell, "ls"), "docs/\nnotes.md  8 B");
        assert_eq!(output(&mut shell, "ls docs"), "a.txt  10 B");
    }

    #[rstest]
    fn cd_changes_the_prompt(shell: (TempDir, Shell)) {
        let (temp, mut shell) = shell;
        let root_name = temp
            .path()
            .canonicalize()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();

        assert_eq!(shell.execute("cd docs").unwrap(), Outcome::Silent);
        assert_eq!(shell.prompt(), "docs > ");
        assert!(output(&mut shell, "pwd").ends_with("docs"));

        shell.execute("cd").unwrap();
        assert_eq!(shell.prompt(), format!("{root_name} > "));
    }

    #[rstest]
    fn cd_into_missing_directory_reports_the_segment(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;
        let error = shell.execute("cd nowhere").unwrap_err();
        assert!(error.to_string().contains("'nowhere'"));
    }

    #[rstest]
    fn mkdir_then_cd_into_it(shell: (TempDir, Shell)) {
        let (temp, mut shell) = shell;

        shell.execute("mkdir 'new dir' other").unwrap();
        shell.execute("cd 'new dir'").unwrap();

        assert!(temp.path().join("new dir").is_dir());
        assert!(temp.path().join("other").is_dir());
        assert_eq!(shell.prompt(), "new dir > ");
        assert_eq!(output(&mut shell, "ls"), "");
    }

    #[rstest]
    fn removing_the_current_directory_moves_up(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;
        shell.execute("cd docs").unwrap();

        shell.execute("rm /docs").unwrap();

        assert_ne!(shell.prompt(), "docs > ");
        assert_eq!(shell.session().current(), shell.session().root());
    }

    #[rstest]
    fn mv_and_rename_are_visible_in_listings(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;

        shell.execute("mv notes.md docs").unwrap();
        shell.execute("rename docs/a.txt b.txt").unwrap();

        assert_eq!(output(&mut shell, "ls"), "docs/");
        assert_eq!(output(&mut shell, "ls docs"), "b.txt     10 B\nnotes.md  8 B");
    }

    #[rstest]
    fn cp_keeps_the_source(shell: (TempDir, Shell)) {
        let (temp, mut shell) = shell;
        shell.execute("cp docs backup").unwrap();

        assert!(temp.path().join("docs/a.txt").is_file());
        assert_eq!(output(&mut shell, "ls backup"), "a.txt  10 B");
    }

    #[rstest]
    fn print_shows_file_contents(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;
        assert_eq!(output(&mut shell, "print notes.md"), "# notes\n");
        assert!(matches!(
            shell.execute("print docs"),
            Err(CommandError::NotAFile { .. })
        ));
    }

    #[rstest]
    fn find_reports_absolute_paths(shell: (TempDir, Shell)) {
        let (temp, mut shell) = shell;
        let expected = temp.path().canonicalize().unwrap().join("docs/a.txt");

        assert_eq!(output(&mut shell, "find a.txt"), expected.display().to_string());
        assert_eq!(
            output(&mut shell, "find zzz"),
            "No entries matching 'zzz'"
        );
    }

    #[rstest]
    fn find_rejects_unknown_types(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;
        assert!(matches!(
            shell.execute("find a --type socket"),
            Err(CommandError::InvalidFlag { flag: "type", .. })
        ));
    }

    #[rstest]
    fn analyze_summarizes_the_tree(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;
        let rendered = output(&mut shell, "analyze --top 1");

        assert!(rendered.contains("Total size: 18 B"));
        assert!(rendered.contains("Files: 2"));
        assert!(rendered.contains("Directories: 1"));
    }

    #[rstest]
    fn missing_arguments_report_usage(shell: (TempDir, Shell)) {
        let (_temp, mut shell) = shell;
        let error = shell.execute("rename docs").unwrap_err();
        assert_eq!(error.to_string(), "Usage: rename <path> <new-name>");
    }

    #[rstest]
    fn external_changes_need_refresh(shell: (TempDir, Shell)) {
        let (temp, mut shell) = shell;
        fs::write(temp.path().join("late.txt"), "late").unwrap();

        assert!(!output(&mut shell, "ls").contains("late.txt"));
        shell.execute("refresh").unwrap();
        assert!(output(&mut shell, "ls").contains("late.txt"));
    }
}
