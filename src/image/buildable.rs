//! Build lifecycle of a single image
//!
//! ```text
//! Unbuilt --run--> Running --commit--> Committed --tag--> Tagged
//!    |                                                      ^
//!    +----------------- tag (known built id) ---------------+
//! ```
//!
//! The container behind a build is ephemeral: `build` creates it through
//! `run` and always removes it afterwards, whatever `run` or `commit`
//! returned. A build that fails goes back to `Unbuilt`.
//!
//! With an empty command buffer the container is only created, never
//! started, so the parent image needs no shell.

use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult, Warning};
use crate::image::argument::{join_args, render_options, ImageOptions};
use crate::image::handle::{image_labels, lookup_id, ImageHandle};
use crate::image::ParentImage;
use crate::introspect::IntrospectImage;
use crate::shell::shell_quote;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where a [`BuildableImage`] is in its build lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Unbuilt,
    Running,
    Committed,
    Tagged,
}

#[derive(Debug)]
pub struct BuildableImage {
    handle: ImageHandle,
    container_name: String,
    built_id: Option<String>,
    options: ImageOptions,
    state: ImageState,
}

impl BuildableImage {
    /// Image to be built (or already tagged) under `name`
    pub fn new(name: impl Into<String>, ctx: Arc<BuildContext>) -> Self {
        let handle = ImageHandle::new(name, ctx);
        Self {
            container_name: container_name_for(handle.name()),
            handle,
            built_id: None,
            options: ImageOptions::default(),
            state: ImageState::Unbuilt,
        }
    }

    /// Image whose build id is already known
    pub fn with_built_id(
        name: impl Into<String>,
        ctx: Arc<BuildContext>,
        built_id: impl Into<String>,
    ) -> Self {
        let mut image = Self::new(name, ctx);
        image.built_id = Some(built_id.into());
        image.state = ImageState::Committed;
        image
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ImageOptions {
        &mut self.options
    }

    pub fn add_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.options.add_command(command);
        self
    }

    pub fn add_env(&mut self, name: &str, value: &str) -> &mut Self {
        self.options.add_env(name, value);
        self
    }

    pub fn add_volume(&mut self, volume: impl Into<String>) -> &mut Self {
        self.options.add_volume(volume);
        self
    }

    pub fn add_run_option(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.options.add_run_option(key, value);
        self
    }

    pub fn add_commit_option(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.options.add_commit_option(key, value);
        self
    }

    fn ctx(&self) -> &BuildContext {
        self.handle.context()
    }

    /// Id the name currently resolves to in the local store
    pub async fn resolved_id(&mut self) -> BuildResult<Option<String>> {
        self.handle.resolved_id().await
    }

    pub async fn exists_as_tag(&mut self) -> BuildResult<bool> {
        self.handle.exists_as_tag().await
    }

    /// Known build id, falling back to the id the name resolves to
    pub async fn built_id(&mut self) -> BuildResult<Option<String>> {
        if self.built_id.is_none() {
            self.built_id = self.handle.resolved_id().await?;
        }
        Ok(self.built_id.clone())
    }

    async fn require_built_id(&mut self) -> BuildResult<String> {
        self.built_id()
            .await?
            .ok_or_else(|| BuildError::ImageNotFound {
                name: self.name().to_string(),
            })
    }

    /// Run the command buffer on `parent` and commit the result.
    ///
    /// The build container is removed afterwards on every path.
    pub async fn build(&mut self, parent: &mut dyn ParentImage) -> BuildResult<String> {
        let result = self.run_and_commit(parent).await;
        self.remove_container().await;

        let built_id = match result {
            Ok(built_id) => built_id,
            Err(err) => {
                self.state = ImageState::Unbuilt;
                return Err(err);
            }
        };
        self.built_id = Some(built_id.clone());
        self.state = ImageState::Committed;
        Ok(built_id)
    }

    async fn run_and_commit(&mut self, parent: &mut dyn ParentImage) -> BuildResult<String> {
        self.run(parent).await?;
        self.commit().await
    }

    /// Run the command buffer in a new container started from `parent`.
    ///
    /// A failing command is turned into an introspection signal when the
    /// build context asks for one; otherwise the failure is returned as is.
    pub async fn run(&mut self, parent: &mut dyn ParentImage) -> BuildResult<()> {
        let parent_id = parent.built_id().await?.ok_or(BuildError::ParentNotBuilt)?;

        let rendered = render_options(&self.container_name, &self.options);

        if self.options.commands.is_empty() {
            let command = join_args(&["docker create", &rendered.run, &parent_id]);
            info!("Creating build container {} from {}", self.container_name, parent.name());
            self.state = ImageState::Running;
            self.ctx().runner().shellout_checked(&command).await?;
            return Ok(());
        }

        let command = join_args(&[
            "docker run",
            &rendered.run,
            &parent_id,
            "-ec",
            &shell_quote(&rendered.bash),
        ]);

        info!("Running build container {} from {}", self.container_name, parent.name());
        self.state = ImageState::Running;

        match self.ctx().runner().shellout_verbose(&command).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_shellout() => Err(self.introspect(err, parent_id, rendered.run).await),
            Err(err) => Err(err),
        }
    }

    async fn introspect(&self, err: BuildError, parent_id: String, options: String) -> BuildError {
        let policy = self.ctx().introspect();

        if policy.on_error {
            match self.commit().await {
                Ok(built_id) => BuildError::Introspect(IntrospectImage {
                    built_id,
                    options,
                    should_remove: true,
                }),
                Err(commit_err) => {
                    warn!(
                        "Could not commit failed container {} for introspection: {}",
                        self.container_name, commit_err
                    );
                    err
                }
            }
        } else if policy.before_error {
            BuildError::Introspect(IntrospectImage {
                built_id: parent_id,
                options,
                should_remove: false,
            })
        } else {
            err
        }
    }

    /// Snapshot the build container into a new image and return its id.
    ///
    /// Does not record the id on `self`; `build` does that.
    pub async fn commit(&self) -> BuildResult<String> {
        let rendered = render_options(&self.container_name, &self.options);
        let command = join_args(&["docker commit", &rendered.change, &self.container_name]);

        let output = self.ctx().runner().shellout_checked(&command).await?;
        let id = output.stdout.trim();
        if id.is_empty() {
            return Err(BuildError::Internal(format!(
                "docker commit returned no image id for {}",
                self.container_name
            )));
        }

        debug!("Committed {} as {}", self.container_name, id);
        Ok(id.to_string())
    }

    async fn remove_container(&self) {
        let command = format!("docker rm {}", self.container_name);
        match self.ctx().runner().shellout(&command).await {
            Ok(output) if output.success() => debug!("Removed container {}", self.container_name),
            Ok(output) => debug!(
                "Container {} not removed: {}",
                self.container_name,
                output.stderr.trim()
            ),
            Err(e) => debug!("Container {} not removed: {}", self.container_name, e),
        }
    }

    /// Bind `name` to this image's build id.
    ///
    /// An existing binding to another image is overwritten; the returned
    /// warning reports it.
    pub async fn tag(&mut self, name: &str) -> BuildResult<Option<Warning>> {
        let built_id = self.require_built_id().await?;

        let existing = if name == self.name() {
            self.handle.resolved_id().await?
        } else {
            lookup_id(self.ctx(), name).await?
        };

        let warning = match existing {
            Some(existing_id) if existing_id != built_id => {
                let warning = Warning::AnotherImageAlreadyTagged {
                    name: name.to_string(),
                    existing_id,
                    built_id: built_id.clone(),
                };
                warn!("{}", warning);
                Some(warning)
            }
            _ => None,
        };

        self.ctx()
            .runner()
            .shellout_checked(&format!("docker tag {} {}", built_id, name))
            .await?;

        if name == self.name() {
            self.handle.reset_cache();
            self.state = ImageState::Tagged;
        }

        Ok(warning)
    }

    pub async fn pull(&mut self) -> BuildResult<()> {
        self.handle.pull().await
    }

    pub async fn push(&mut self) -> BuildResult<()> {
        self.handle.push().await
    }

    pub async fn untag(&mut self) -> BuildResult<()> {
        self.handle.untag().await
    }

    /// Publish this image under `name`, leaving no local `name` tag behind
    pub async fn export(&mut self, name: &str) -> BuildResult<()> {
        let built_id = self.require_built_id().await?;
        info!("Exporting {} as {}", built_id, name);

        let mut image = Self::with_built_id(name, self.handle.context().clone(), built_id);
        image.tag(name).await?;
        image.push().await?;
        image.untag().await
    }

    /// Adopt the registry image `name` as this image, keeping only our own tag
    pub async fn import(&mut self, name: &str) -> BuildResult<()> {
        info!("Importing {} as {}", name, self.name());

        let mut image = Self::new(name, self.handle.context().clone());
        image.pull().await?;
        let built_id = image
            .built_id()
            .await?
            .ok_or_else(|| BuildError::ImageNotFound {
                name: name.to_string(),
            })?;

        self.built_id = Some(built_id);
        let own_name = self.name().to_string();
        self.tag(&own_name).await?;
        image.untag().await
    }

    /// Labels of the built image
    pub async fn labels(&mut self) -> BuildResult<HashMap<String, String>> {
        let built_id = self.require_built_id().await?;
        image_labels(self.ctx(), &built_id).await
    }
}

#[async_trait]
impl ParentImage for BuildableImage {
    fn name(&self) -> &str {
        self.handle.name()
    }

    async fn built_id(&mut self) -> BuildResult<Option<String>> {
        BuildableImage::built_id(self).await
    }

    async fn pull(&mut self) -> BuildResult<()> {
        self.handle.pull().await
    }

    async fn is_tagged(&mut self) -> BuildResult<bool> {
        self.handle.exists_as_tag().await
    }
}

/// `registry/app:tag` -> `registry-app.1a2b3c4d`
fn container_name_for(name: &str) -> String {
    let base: String = name
        .split(':')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "_.-".contains(c) { c } else { '-' })
        .collect();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}.{}", base, &suffix[..8])
}
