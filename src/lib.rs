//! stagecache - staged container image builds with signature caching
//!
//! An image is built as a chain of stages. Each stage has a signature
//! derived from its inputs and the previous stage; a stage image already
//! tagged with that signature is reused instead of rebuilt.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod hashsum;
pub mod image;
pub mod introspect;
pub mod pipeline;
pub mod shell;
pub mod stage;
pub mod ui;

pub use context::BuildContext;
pub use error::{BuildError, BuildResult, Warning};
pub use pipeline::{BuildReport, Pipeline};
