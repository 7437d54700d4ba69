//! Query surface over a named image

use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A name in the local image store, with its id resolved on demand.
///
/// The resolved id is memoized until an operation that rebinds the name
/// (`pull`, `untag`, or a tag through [`BuildableImage`]) resets it.
///
/// [`BuildableImage`]: crate::image::BuildableImage
#[derive(Debug)]
pub struct ImageHandle {
    name: String,
    ctx: Arc<BuildContext>,
    /// `None` = not looked up yet, `Some(None)` = looked up, not tagged
    resolved_id: Option<Option<String>>,
}

impl ImageHandle {
    pub fn new(name: impl Into<String>, ctx: Arc<BuildContext>) -> Self {
        Self {
            name: name.into(),
            ctx,
            resolved_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    /// Image id the name currently resolves to, memoized
    pub async fn resolved_id(&mut self) -> BuildResult<Option<String>> {
        if let Some(id) = &self.resolved_id {
            return Ok(id.clone());
        }

        let id = lookup_id(&self.ctx, &self.name).await?;
        self.resolved_id = Some(id.clone());
        Ok(id)
    }

    /// Whether the name resolves to an image in the local store
    pub async fn exists_as_tag(&mut self) -> BuildResult<bool> {
        Ok(self.resolved_id().await?.is_some())
    }

    /// Forget the memoized id so the next query hits the store
    pub fn reset_cache(&mut self) {
        self.resolved_id = None;
    }

    /// Pull the image unless it is already tagged locally
    pub async fn pull(&mut self) -> BuildResult<()> {
        if self.exists_as_tag().await? {
            debug!("Image {} already present, skipping pull", self.name);
            return Ok(());
        }

        info!("Pulling image: {}", self.name);
        self.ctx
            .runner()
            .shellout_verbose(&format!("docker pull {}", self.name))
            .await?;
        self.reset_cache();
        Ok(())
    }

    pub async fn push(&mut self) -> BuildResult<()> {
        info!("Pushing image: {}", self.name);
        self.ctx
            .runner()
            .shellout_verbose(&format!("docker push {}", self.name))
            .await?;
        Ok(())
    }

    /// Remove the local tag; the image itself stays while other tags use it
    pub async fn untag(&mut self) -> BuildResult<()> {
        if !self.exists_as_tag().await? {
            return Err(BuildError::ImageAlreadyUntagged {
                name: self.name.clone(),
            });
        }

        self.ctx
            .runner()
            .shellout_checked(&format!("docker rmi {}", self.name))
            .await?;
        self.reset_cache();
        Ok(())
    }

    /// Labels of the image the name resolves to
    pub async fn labels(&mut self) -> BuildResult<HashMap<String, String>> {
        let id = self
            .resolved_id()
            .await?
            .ok_or_else(|| BuildError::ImageNotFound {
                name: self.name.clone(),
            })?;
        image_labels(&self.ctx, &id).await
    }
}

/// Look up the id a reference resolves to; `None` when it does not exist
pub(crate) async fn lookup_id(ctx: &BuildContext, reference: &str) -> BuildResult<Option<String>> {
    let output = ctx
        .runner()
        .shellout(&format!(
            "docker inspect --type=image --format={{{{.Id}}}} {}",
            reference
        ))
        .await?;

    if !output.success() {
        return Ok(None);
    }

    let id = output.stdout.trim();
    Ok((!id.is_empty()).then(|| id.to_string()))
}

/// Read one option of an image's config (e.g. `labels`, `env`) as JSON
pub async fn image_config_option(
    ctx: &BuildContext,
    image_id: &str,
    option: &str,
) -> BuildResult<serde_json::Value> {
    let output = ctx
        .runner()
        .shellout_checked(&format!(
            "docker inspect --type=image --format='{{{{json .Config.{}}}}}' {}",
            config_field(option),
            image_id
        ))
        .await?;

    Ok(serde_json::from_str(output.stdout.trim())?)
}

pub(crate) async fn image_labels(
    ctx: &BuildContext,
    image_id: &str,
) -> BuildResult<HashMap<String, String>> {
    let value = image_config_option(ctx, image_id, "labels").await?;
    let labels: Option<HashMap<String, String>> = serde_json::from_value(value)?;
    Ok(labels.unwrap_or_default())
}

/// `labels` -> `Labels`, `exposed_ports` -> `ExposedPorts`
fn config_field(option: &str) -> String {
    option
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::fake::FakeDocker;

    fn context(docker: &Arc<FakeDocker>) -> Arc<BuildContext> {
        Arc::new(BuildContext::new(docker.clone()))
    }

    #[test]
    fn config_field_names() {
        assert_eq!(config_field("labels"), "Labels");
        assert_eq!(config_field("exposed_ports"), "ExposedPorts");
    }

    #[tokio::test]
    async fn resolved_id_is_memoized() {
        let docker = Arc::new(FakeDocker::new().with_tag("busybox:latest", "sha256:bb"));
        let mut handle = ImageHandle::new("busybox:latest", context(&docker));

        assert_eq!(handle.resolved_id().await.unwrap().as_deref(), Some("sha256:bb"));
        assert!(handle.exists_as_tag().await.unwrap());
        assert_eq!(docker.commands_starting_with("docker inspect").len(), 1);

        handle.reset_cache();
        handle.resolved_id().await.unwrap();
        assert_eq!(docker.commands_starting_with("docker inspect").len(), 2);
    }

    #[tokio::test]
    async fn missing_image_is_not_tagged() {
        let docker = Arc::new(FakeDocker::new());
        let mut handle = ImageHandle::new("nope:1", context(&docker));
        assert!(!handle.exists_as_tag().await.unwrap());
    }

    #[tokio::test]
    async fn pull_skips_tagged_image() {
        let docker = Arc::new(FakeDocker::new().with_tag("alpine:3", "sha256:a3"));
        let mut handle = ImageHandle::new("alpine:3", context(&docker));

        handle.pull().await.unwrap();
        assert!(docker.commands_starting_with("docker pull").is_empty());
    }

    #[tokio::test]
    async fn pull_fetches_and_resets_memo() {
        let docker = Arc::new(FakeDocker::new().with_remote("alpine:3", "sha256:a3"));
        let mut handle = ImageHandle::new("alpine:3", context(&docker));

        handle.pull().await.unwrap();
        assert_eq!(docker.commands_starting_with("docker pull"), vec!["docker pull alpine:3"]);
        assert_eq!(handle.resolved_id().await.unwrap().as_deref(), Some("sha256:a3"));
    }

    #[tokio::test]
    async fn pull_failure_is_shellout() {
        let docker = Arc::new(FakeDocker::new());
        let mut handle = ImageHandle::new("ghost:1", context(&docker));

        let err = handle.pull().await.unwrap_err();
        assert!(err.is_shellout());
    }

    #[tokio::test]
    async fn untag_missing_image_fails() {
        let docker = Arc::new(FakeDocker::new());
        let mut handle = ImageHandle::new("ghost:1", context(&docker));

        let err = handle.untag().await.unwrap_err();
        assert_eq!(err.code(), Some("image_already_untagged"));
    }

    #[tokio::test]
    async fn untag_removes_tag() {
        let docker = Arc::new(FakeDocker::new().with_tag("app:old", "sha256:old"));
        let mut handle = ImageHandle::new("app:old", context(&docker));

        handle.untag().await.unwrap();
        assert!(docker.tag("app:old").is_none());
        assert!(!handle.exists_as_tag().await.unwrap());
    }

    #[tokio::test]
    async fn labels_of_untagged_image_fail() {
        let docker = Arc::new(FakeDocker::new());
        let mut handle = ImageHandle::new("ghost:1", context(&docker));

        let err = handle.labels().await.unwrap_err();
        assert!(matches!(err, BuildError::ImageNotFound { ref name } if name == "ghost:1"));
    }

    #[tokio::test]
    async fn labels_are_parsed() {
        let docker = Arc::new(
            FakeDocker::new()
                .with_tag("app:1", "sha256:app")
                .with_labels("sha256:app", r#"{"stage":"from","version":"3"}"#),
        );
        let mut handle = ImageHandle::new("app:1", context(&docker));

        let labels = handle.labels().await.unwrap();
        assert_eq!(labels.get("stage").unwrap(), "from");
        assert_eq!(labels.get("version").unwrap(), "3");
    }

    #[tokio::test]
    async fn null_labels_are_empty() {
        let docker = Arc::new(FakeDocker::new().with_tag("app:1", "sha256:app"));
        let mut handle = ImageHandle::new("app:1", context(&docker));

        assert!(handle.labels().await.unwrap().is_empty());
    }
}
