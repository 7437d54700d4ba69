//! Process execution boundary
//!
//! Every container and image operation goes through a [`CommandRunner`].
//! The production runner executes commands through `sh -c`; tests swap in
//! a scripted fake image store.

mod native;
mod runner;

#[cfg(test)]
pub(crate) mod fake;

pub use native::ShellRunner;
pub use runner::{CommandOutput, CommandRunner};

/// Quote a value for safe inclusion in a single-quoted shell word
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
