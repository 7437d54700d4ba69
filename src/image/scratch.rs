use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::image::ParentImage;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Empty origin image used when a build has no base image.
///
/// Nothing is fetched for it: it always counts as tagged, and its id is
/// produced on first use by importing an empty tarball.
#[derive(Debug)]
pub struct ScratchImage {
    ctx: Arc<BuildContext>,
    built_id: Option<String>,
}

impl ScratchImage {
    pub const NAME: &'static str = "scratch";

    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self {
            ctx,
            built_id: None,
        }
    }
}

#[async_trait]
impl ParentImage for ScratchImage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn built_id(&mut self) -> BuildResult<Option<String>> {
        if self.built_id.is_none() {
            debug!("Importing empty image for scratch origin");
            let output = self
                .ctx
                .runner()
                .shellout_checked("tar c --files-from /dev/null | docker import - ")
                .await?;
            let id = output.stdout.trim();
            if id.is_empty() {
                return Err(BuildError::Internal(
                    "docker import returned no image id".to_string(),
                ));
            }
            self.built_id = Some(id.to_string());
        }
        Ok(self.built_id.clone())
    }

    async fn pull(&mut self) -> BuildResult<()> {
        Ok(())
    }

    async fn is_tagged(&mut self) -> BuildResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::fake::FakeDocker;

    #[tokio::test]
    async fn scratch_never_pulls() {
        let docker = Arc::new(FakeDocker::new());
        let mut scratch = ScratchImage::new(Arc::new(BuildContext::new(docker.clone())));

        scratch.pull().await.unwrap();
        assert!(scratch.is_tagged().await.unwrap());
        assert!(docker.commands().is_empty());
    }

    #[tokio::test]
    async fn scratch_id_is_imported_once() {
        let docker = Arc::new(FakeDocker::new());
        let mut scratch = ScratchImage::new(Arc::new(BuildContext::new(docker.clone())));

        assert_eq!(scratch.built_id().await.unwrap().as_deref(), Some("sha256:scratch"));
        scratch.built_id().await.unwrap();
        assert_eq!(docker.commands().len(), 1);
    }
}
