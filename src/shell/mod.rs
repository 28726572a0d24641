//! Interactive front end over the cached tree.
//!
//! [`Session`] owns the tree and the working directory, [`Shell`] turns input
//! lines into calls on it, and [`repl`] drives a line editor.

mod command;
pub mod format;
pub mod repl;
mod session;
mod shell;

pub use command::{Action, Command};
pub use session::{Session, SessionError};
pub use shell::{CommandError, Outcome, Shell};
