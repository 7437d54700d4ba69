//! Error types for stagecache
//!
//! All modules use `BuildResult<T>` as their return type.

use crate::introspect::IntrospectImage;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stagecache operations
pub type BuildResult<T> = Result<T, BuildError>;

/// All errors that can occur while preparing stages and images
#[derive(Error, Debug)]
pub enum BuildError {
    // Build errors (user-facing, abort the affected stage)
    #[error("Base image not found: {name}")]
    BaseImageNotFound { name: String },

    #[error("Image does not exist: {name}")]
    ImageNotFound { name: String },

    #[error("Parent image has no built id")]
    ParentNotBuilt,

    #[error("Image already untagged: {name}")]
    ImageAlreadyUntagged { name: String },

    // Process errors
    #[error("Command failed with exit code {}: {command}", display_code(.code))]
    Shellout {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to execute command: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Debug-mode control signal, not a failure of its own
    #[error("{0}")]
    Introspect(IntrospectImage),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

impl BuildError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Stable code of a user-facing build error
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::BaseImageNotFound { .. } => Some("base_image_not_found"),
            Self::ImageNotFound { .. } => Some("image_not_exist"),
            Self::ParentNotBuilt => Some("built_id_not_defined"),
            Self::ImageAlreadyUntagged { .. } => Some("image_already_untagged"),
            _ => None,
        }
    }

    /// Whether this is a raw process failure from the shellout boundary
    pub fn is_shellout(&self) -> bool {
        matches!(self, Self::Shellout { .. })
    }

    /// Take the introspection signal out of the error, if it is one
    pub fn into_introspection(self) -> Result<IntrospectImage, Self> {
        match self {
            Self::Introspect(signal) => Ok(signal),
            other => Err(other),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::BaseImageNotFound { .. } => {
                Some("Check the [docker] from reference and registry access")
            }
            Self::ParentNotBuilt => Some("Build the previous stage before running this one"),
            Self::Shellout { .. } => {
                Some("Re-run with --introspect-error to inspect the failed container")
            }
            Self::ConfigNotFound(_) => Some("Create stagecache.toml or pass --config"),
            _ => None,
        }
    }
}

/// Non-fatal conditions reported during image operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The tag was bound to another image and has been overwritten
    AnotherImageAlreadyTagged {
        name: String,
        existing_id: String,
        built_id: String,
    },
}

impl Warning {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AnotherImageAlreadyTagged { .. } => "another_image_already_tagged",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnotherImageAlreadyTagged {
                name,
                existing_id,
                built_id,
            } => write!(
                f,
                "Another image is already tagged as {}: replacing {} with {}",
                name, existing_id, built_id
            ),
        }
    }
}
