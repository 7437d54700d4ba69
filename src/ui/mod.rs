//! Terminal output for the CLI
//!
//! Styled with `console`; stage progress uses an `indicatif` spinner in an
//! interactive terminal and plain lines otherwise (CI, pipes).

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, section, step_error, step_info, step_ok, step_warn};
pub use progress::{StageProgress, TaskSpinner};
