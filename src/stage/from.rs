//! Base image stage

use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::hashsum::{hashsum, CacheVersion, Dependency};
use crate::image::{BuildableImage, ImageOptions, ParentImage, ScratchImage};
use crate::stage::{
    label_stage_image, prepare_stage_image, stage_image_name, Stage, StageName, StageOutcome,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// First stage of every build: resolves the base image, or an empty
/// scratch origin when none is configured.
pub struct FromStage {
    ctx: Arc<BuildContext>,
    from: Option<String>,
    from_cache_version: Option<CacheVersion>,
    /// Resolved on first use, kept for the stage's lifetime
    from_image: Option<Box<dyn ParentImage>>,
    image: BuildableImage,
}

impl FromStage {
    pub fn new(
        ctx: Arc<BuildContext>,
        from: Option<String>,
        from_cache_version: Option<CacheVersion>,
        options: &ImageOptions,
    ) -> Self {
        let signature = hashsum(&from_dependencies(
            from.as_deref(),
            from_cache_version.as_ref(),
            ctx.cache_version(),
        ));
        let mut image = BuildableImage::new(
            stage_image_name(ctx.project_name(), &signature),
            ctx.clone(),
        );
        image.options_mut().extend(options);
        label_stage_image(&mut image, StageName::From, &signature);

        Self {
            ctx,
            from,
            from_cache_version,
            from_image: None,
            image,
        }
    }

    /// Configured base image reference
    pub fn base_image(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Whether the base image has been resolved yet
    pub fn is_resolved(&self) -> bool {
        self.from_image.is_some()
    }
}

fn from_dependencies(
    from: Option<&str>,
    from_cache_version: Option<&CacheVersion>,
    cache_version: &CacheVersion,
) -> Vec<Dependency> {
    vec![
        Dependency::from(from),
        Dependency::from(from_cache_version),
        Dependency::from(cache_version),
    ]
}

fn resolve_from_image<'a>(
    slot: &'a mut Option<Box<dyn ParentImage>>,
    ctx: &Arc<BuildContext>,
    from: Option<&str>,
) -> &'a mut Box<dyn ParentImage> {
    slot.get_or_insert_with(|| -> Box<dyn ParentImage> {
        match from {
            None => Box::new(ScratchImage::new(ctx.clone())),
            Some(name) => Box::new(BuildableImage::new(name, ctx.clone())),
        }
    })
}

#[async_trait]
impl Stage for FromStage {
    fn name(&self) -> StageName {
        StageName::From
    }

    fn dependencies(&self) -> Vec<Dependency> {
        from_dependencies(
            self.from.as_deref(),
            self.from_cache_version.as_ref(),
            self.ctx.cache_version(),
        )
    }

    fn image(&self) -> &BuildableImage {
        &self.image
    }

    fn image_mut(&mut self) -> &mut BuildableImage {
        &mut self.image
    }

    async fn prepare(&mut self, _parent: Option<&mut BuildableImage>) -> BuildResult<StageOutcome> {
        let from_image = resolve_from_image(&mut self.from_image, &self.ctx, self.from.as_deref());

        match from_image.pull().await {
            Ok(()) => {}
            Err(err) if err.is_shellout() => debug!("Pulling {} failed: {}", from_image.name(), err),
            Err(err) => return Err(err),
        }

        if !from_image.is_tagged().await? {
            return Err(BuildError::BaseImageNotFound {
                name: from_image.name().to_string(),
            });
        }

        prepare_stage_image(&mut self.image, &mut **from_image).await
    }

    async fn should_not_be_detailed(&mut self) -> BuildResult<bool> {
        resolve_from_image(&mut self.from_image, &self.ctx, self.from.as_deref())
            .is_tagged()
            .await
    }
}
