//! Detection of interactive terminals

use std::io::IsTerminal;

/// Environment variables set by common CI systems
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Decides between spinner output and plain progress lines
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment.
    ///
    /// Progress is drawn on stderr, so that is the stream that must be a
    /// terminal; stdout may be piped (`stagecache stages --format json | jq`).
    pub fn detect() -> Self {
        let interactive = std::io::stderr().is_terminal()
            && std::env::var("TERM").map_or(true, |term| term != "dumb")
            && !CI_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self { interactive }
    }

    /// Plain output regardless of the terminal
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Whether to draw spinners
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
