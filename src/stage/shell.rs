//! User shell commands stage

use crate::config::schema::ShellConfig;
use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::hashsum::{hashsum, CacheVersion, Dependency, Signature};
use crate::image::{BuildableImage, ImageOptions};
use crate::stage::{
    label_stage_image, prepare_stage_image, stage_image_name, Stage, StageName, StageOutcome,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs the configured shell commands on top of the previous stage image
pub struct ShellStage {
    ctx: Arc<BuildContext>,
    prev_signature: Signature,
    commands: Vec<String>,
    env: BTreeMap<String, String>,
    cache_version: Option<CacheVersion>,
    image: BuildableImage,
}

impl ShellStage {
    pub fn new(
        ctx: Arc<BuildContext>,
        prev_signature: Signature,
        config: &ShellConfig,
        options: &ImageOptions,
    ) -> Self {
        let signature = hashsum(&shell_dependencies(
            &prev_signature,
            &config.commands,
            &config.env,
            config.cache_version.as_ref(),
            ctx.cache_version(),
        ));

        let mut image = BuildableImage::new(
            stage_image_name(ctx.project_name(), &signature),
            ctx.clone(),
        );
        image.options_mut().extend(options);
        for (name, value) in &config.env {
            image.add_env(name, value);
        }
        for command in &config.commands {
            image.add_command(command.clone());
        }
        label_stage_image(&mut image, StageName::Shell, &signature);

        Self {
            ctx,
            prev_signature,
            commands: config.commands.clone(),
            env: config.env.clone(),
            cache_version: config.cache_version.clone(),
            image,
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

/// Env entries are hashed as sorted `NAME=value` pairs
fn shell_dependencies(
    prev_signature: &Signature,
    commands: &[String],
    env: &BTreeMap<String, String>,
    cache_version: Option<&CacheVersion>,
    global_cache_version: &CacheVersion,
) -> Vec<Dependency> {
    let env: Vec<String> = env
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();

    vec![
        Dependency::from(prev_signature),
        Dependency::from(commands.to_vec()),
        Dependency::from(env),
        Dependency::from(cache_version),
        Dependency::from(global_cache_version),
    ]
}

#[async_trait]
impl Stage for ShellStage {
    fn name(&self) -> StageName {
        StageName::Shell
    }

    fn dependencies(&self) -> Vec<Dependency> {
        shell_dependencies(
            &self.prev_signature,
            &self.commands,
            &self.env,
            self.cache_version.as_ref(),
            self.ctx.cache_version(),
        )
    }

    fn image(&self) -> &BuildableImage {
        &self.image
    }

    fn image_mut(&mut self) -> &mut BuildableImage {
        &mut self.image
    }

    async fn prepare(&mut self, parent: Option<&mut BuildableImage>) -> BuildResult<StageOutcome> {
        let parent = parent.ok_or(BuildError::ParentNotBuilt)?;
        prepare_stage_image(&mut self.image, parent).await
    }
}
