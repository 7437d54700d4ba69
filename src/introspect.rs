//! Interactive inspection of failed builds
//!
//! When a build command fails and introspection is enabled, the image
//! layer raises [`IntrospectImage`] instead of the raw command failure.
//! The caller opens a shell in the preserved image and, if the image was
//! created only for inspection, removes it afterwards.

use crate::error::BuildResult;
use crate::shell::CommandRunner;
use std::fmt;
use tracing::{info, warn};

/// Which image to preserve when a build command fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntrospectPolicy {
    /// Commit the failed container and inspect it
    pub on_error: bool,
    /// Inspect the parent image the failing commands ran on
    pub before_error: bool,
}

impl IntrospectPolicy {
    pub fn is_enabled(&self) -> bool {
        self.on_error || self.before_error
    }
}

/// Signal carrying the image to inspect after a failed build command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectImage {
    /// Image to open a shell in
    pub built_id: String,
    /// `docker run` options of the failed container
    pub options: String,
    /// The image was committed only for inspection and should be removed
    pub should_remove: bool,
}

impl fmt::Display for IntrospectImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Build command failed, introspection image {}", self.built_id)
    }
}

impl IntrospectImage {
    /// Command that opens an interactive shell in the preserved image
    pub fn session_command(&self) -> String {
        format!("docker run -ti --rm {} {}", self.options, self.built_id)
    }
}

/// Open an interactive shell in the preserved image, then clean it up.
///
/// Returns the exit code of the shell session.
pub async fn run_session(runner: &dyn CommandRunner, signal: &IntrospectImage) -> BuildResult<i32> {
    info!("Starting introspection session in {}", signal.built_id);
    let code = runner.interactive(&signal.session_command()).await?;

    if signal.should_remove {
        let command = format!("docker rmi {}", signal.built_id);
        match runner.shellout(&command).await {
            Ok(output) if output.success() => {}
            Ok(output) => warn!(
                "Failed to remove introspection image {}: {}",
                signal.built_id,
                output.stderr.trim()
            ),
            Err(e) => warn!("Failed to remove introspection image {}: {}", signal.built_id, e),
        }
    }

    Ok(code)
}
