use std::collections::HashMap;
use std::str::FromStr;

use crate::shell::CommandError;

const FLAG_PREFIX: &str = "--";
const FLAG_PRESENT: &str = "true";

/// Everything the shell understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Action {
    #[display("cd")]
    Cd,
    #[display("ls")]
    Ls,
    #[display("pwd")]
    Pwd,
    #[display("find")]
    Find,
    #[display("analyze")]
    Analyze,
    #[display("print")]
    Print,
    #[display("mkdir")]
    Mkdir,
    #[display("rm")]
    Rm,
    #[display("rename")]
    Rename,
    #[display("mv")]
    Mv,
    #[display("cp")]
    Cp,
    #[display("refresh")]
    Refresh,
    #[display("help")]
    Help,
    #[display("exit")]
    Exit,
}

impl Action {
    pub const ALL: [Action; 14] = [
        Action::Cd,
        Action::Ls,
        Action::Pwd,
        Action::Find,
        Action::Analyze,
        Action::Print,
        Action::Mkdir,
        Action::Rm,
        Action::Rename,
        Action::Mv,
        Action::Cp,
        Action::Refresh,
        Action::Help,
        Action::Exit,
    ];

    pub fn usage(self) -> &'static str {
        match self {
            Action::Cd => "cd [path]",
            Action::Ls => "ls [path]",
            Action::Pwd => "pwd",
            Action::Find => "find <pattern> [path] [--type dir|file]",
            Action::Analyze => "analyze [path] [--top N]",
            Action::Print => "print <file>",
            Action::Mkdir => "mkdir <path>...",
            Action::Rm => "rm <path>...",
            Action::Rename => "rename <path> <new-name>",
            Action::Mv => "mv <source> <destination>",
            Action::Cp => "cp <source> <destination>",
            Action::Refresh => "refresh [path]",
            Action::Help => "help",
            Action::Exit => "exit",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Action::Cd => "Change the current directory, or go back to the root",
            Action::Ls => "List a directory",
            Action::Pwd => "Show the current directory",
            Action::Find => "Search names below a directory",
            Action::Analyze => "Summarize sizes and file types below a directory",
            Action::Print => "Print the contents of a file",
            Action::Mkdir => "Create directories",
            Action::Rm => "Remove files or directory trees",
            Action::Rename => "Rename an entry in place",
            Action::Mv => "Move an entry, into a directory or to a new path",
            Action::Cp => "Copy a file or a directory tree",
            Action::Refresh => "Re-read a directory from disk",
            Action::Help => "Show this help",
            Action::Exit => "Leave the shell",
        }
    }
}

impl FromStr for Action {
    type Err = CommandError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let action = match name {
            "cd" => Action::Cd,
            "ls" | "dir" => Action::Ls,
            "pwd" => Action::Pwd,
            "find" => Action::Find,
            "analyze" => Action::Analyze,
            "print" | "cat" => Action::Print,
            "mkdir" => Action::Mkdir,
            "rm" => Action::Rm,
            "rename" => Action::Rename,
            "mv" => Action::Mv,
            "cp" => Action::Cp,
            "refresh" => Action::Refresh,
            "help" => Action::Help,
            "exit" | "quit" => Action::Exit,
            _ => {
                return Err(CommandError::UnknownAction {
                    action: name.to_string(),
                });
            }
        };
        Ok(action)
    }
}

/// A tokenized input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub args: Vec<String>,
    pub flags: HashMap<String, String>,
}

impl Command {
    /// Parses one line of input; blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut tokens = tokenize(line).into_iter();
        let Some(action) = tokens.next() else {
            return Ok(None);
        };
        let action = action.to_lowercase().parse()?;

        let mut args = Vec::new();
        let mut flags = HashMap::new();
        let mut tokens = tokens.peekable();
        while let Some(token) = tokens.next() {
            let Some(flag) = token.strip_prefix(FLAG_PREFIX) else {
                args.push(token);
                continue;
            };
            let value = tokens
                .next_if(|next| !next.starts_with(FLAG_PREFIX))
                .unwrap_or_else(|| FLAG_PRESENT.to_string());
            flags.insert(flag.to_string(), value);
        }

        Ok(Some(Self { action, args, flags }))
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// The argument at `index`, or a usage error.
    pub fn required(&self, index: usize) -> Result<&str, CommandError> {
        self.arg(index).ok_or(CommandError::MissingArgument {
            usage: self.action.usage(),
        })
    }

    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }
}

/// Splits on whitespace, keeping `"..."` and `'...'` groups together.
///
/// Quotes are removed; an unterminated quote runs to the end of the line.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                let quoted: String = chars.by_ref().take_while(|&next| next != c).collect();
                tokens.push(quoted);
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
