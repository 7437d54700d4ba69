//! Build stages
//!
//! A stage is one cacheable step of an image build. Its signature is a
//! digest of everything its output depends on; the stage image is tagged
//! `<project>-stage:<signature>`, so an existing tag means the work can be
//! skipped.
//!
//! | Stage | Parent | Dependencies |
//! |-------|--------|--------------|
//! | [`FromStage`] | base image or scratch | base reference, from-cache version, cache version |
//! | [`ShellStage`] | previous stage image | previous signature, commands, env, shell cache version, cache version |

mod from;
mod shell;

pub use from::FromStage;
pub use shell::ShellStage;

use crate::error::BuildResult;
use crate::hashsum::{hashsum, Dependency, Signature};
use crate::image::{BuildableImage, ParentImage};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Label keys written into every stage image
pub mod labels {
    /// Stage that produced the image (from, shell)
    pub const STAGE: &str = "io.stagecache.stage";
    /// Signature the image was built for
    pub const SIGNATURE: &str = "io.stagecache.signature";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    From,
    Shell,
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::From => write!(f, "from"),
            Self::Shell => write!(f, "shell"),
        }
    }
}

/// What `prepare` did for a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    /// An image with the stage signature already existed
    Cached,
    /// The stage image was built and tagged
    Built,
}

#[async_trait]
pub trait Stage: Send {
    fn name(&self) -> StageName;

    /// Inputs the stage output depends on, always ending with the cache version
    fn dependencies(&self) -> Vec<Dependency>;

    fn signature(&self) -> Signature {
        hashsum(&self.dependencies())
    }

    /// Image holding this stage's output
    fn image(&self) -> &BuildableImage;

    fn image_mut(&mut self) -> &mut BuildableImage;

    /// Reuse or build the stage image on top of `parent`
    async fn prepare(&mut self, parent: Option<&mut BuildableImage>) -> BuildResult<StageOutcome>;

    /// Whether progress output for this stage can be kept to one line
    async fn should_not_be_detailed(&mut self) -> BuildResult<bool> {
        Ok(false)
    }
}

/// Image name a stage signature is cached under
pub fn stage_image_name(project: &str, signature: &Signature) -> String {
    format!("{}-stage:{}", project, signature)
}

/// Shared cache bookkeeping: reuse the tagged stage image, or build and tag it
pub async fn prepare_stage_image(
    image: &mut BuildableImage,
    parent: &mut dyn ParentImage,
) -> BuildResult<StageOutcome> {
    if image.exists_as_tag().await? {
        info!("Using cached stage image {}", image.name());
        return Ok(StageOutcome::Cached);
    }

    image.build(parent).await?;
    let name = image.name().to_string();
    image.tag(&name).await?;
    info!("Built stage image {}", name);
    Ok(StageOutcome::Built)
}

/// Label the stage image with the stage name and signature
fn label_stage_image(image: &mut BuildableImage, name: StageName, signature: &Signature) {
    image
        .add_commit_option("label", format!("{}={}", labels::STAGE, name))
        .add_commit_option("label", format!("{}={}", labels::SIGNATURE, signature));
}
