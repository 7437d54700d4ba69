//! Stage pipeline
//!
//! Builds the configured stages in order, each on top of the previous
//! stage image, and exposes the final image for export, import and label
//! queries.

use crate::config::Config;
use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::hashsum::{Dependency, Signature};
use crate::image::BuildableImage;
use crate::stage::{FromStage, ShellStage, Stage, StageName, StageOutcome};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Receives progress events while the pipeline builds
pub trait BuildObserver: Send {
    /// `detailed` is false when the stage is expected to be quick
    fn stage_started(&mut self, name: StageName, signature: &Signature, detailed: bool);
    fn stage_finished(&mut self, name: StageName, outcome: StageOutcome);
    fn stage_failed(&mut self, name: StageName, error: &BuildError);
}

/// Observer that ignores every event
pub struct SilentObserver;

impl BuildObserver for SilentObserver {
    fn stage_started(&mut self, _name: StageName, _signature: &Signature, _detailed: bool) {}
    fn stage_finished(&mut self, _name: StageName, _outcome: StageOutcome) {}
    fn stage_failed(&mut self, _name: StageName, _error: &BuildError) {}
}

/// Signature and inputs of one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub name: StageName,
    pub signature: Signature,
    pub image: String,
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: StageName,
    pub image: String,
    pub outcome: StageOutcome,
}

/// Result of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub stages: Vec<StageReport>,
    /// Name of the final stage image
    pub image: String,
    pub image_id: Option<String>,
}

impl BuildReport {
    pub fn built_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.outcome == StageOutcome::Built)
            .count()
    }
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Stages for `config`: the base image stage, then a shell stage when
    /// there are commands to run.
    pub fn from_config(config: &Config, ctx: Arc<BuildContext>) -> Self {
        let options = config.docker.image_options();
        let from = FromStage::new(
            ctx.clone(),
            config.docker.from.clone(),
            config.docker.from_cache_version.clone(),
            &options,
        );

        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        let from_signature = from.signature();
        stages.push(Box::new(from));

        if !config.shell.commands.is_empty() {
            stages.push(Box::new(ShellStage::new(
                ctx,
                from_signature,
                &config.shell,
                &options,
            )));
        }

        debug!("Pipeline has {} stage(s)", stages.len());
        Self { stages }
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    pub fn signatures(&self) -> Vec<StageSummary> {
        self.stages
            .iter()
            .map(|stage| StageSummary {
                name: stage.name(),
                signature: stage.signature(),
                image: stage.image().name().to_string(),
                dependencies: stage.dependencies(),
            })
            .collect()
    }

    pub async fn build(&mut self) -> BuildResult<BuildReport> {
        self.build_with(&mut SilentObserver).await
    }

    /// Prepare every stage in order, reporting progress to `observer`.
    ///
    /// Stops at the first failing stage and returns its error.
    pub async fn build_with(&mut self, observer: &mut dyn BuildObserver) -> BuildResult<BuildReport> {
        let mut stages = Vec::with_capacity(self.stages.len());

        for index in 0..self.stages.len() {
            let (done, rest) = self.stages.split_at_mut(index);
            let stage = &mut rest[0];
            let name = stage.name();
            let signature = stage.signature();

            let detailed = !stage.should_not_be_detailed().await?;
            observer.stage_started(name, &signature, detailed);

            let parent = done.last_mut().map(|prev| prev.image_mut());
            match stage.prepare(parent).await {
                Ok(outcome) => {
                    observer.stage_finished(name, outcome);
                    stages.push(StageReport {
                        name,
                        image: stage.image().name().to_string(),
                        outcome,
                    });
                }
                Err(err) => {
                    observer.stage_failed(name, &err);
                    return Err(err);
                }
            }
        }

        let last = self.last_image_mut()?;
        let report = BuildReport {
            stages,
            image: last.name().to_string(),
            image_id: last.built_id().await?,
        };
        info!(
            "Build finished: {} ({} stage(s) built)",
            report.image,
            report.built_count()
        );
        Ok(report)
    }

    /// Push the final stage image to the registry as `name`
    pub async fn export(&mut self, name: &str) -> BuildResult<()> {
        self.last_image_mut()?.export(name).await
    }

    /// Pull `name` from the registry and adopt it as the final stage image
    pub async fn import(&mut self, name: &str) -> BuildResult<()> {
        self.last_image_mut()?.import(name).await
    }

    /// Labels of the final stage image
    pub async fn labels(&mut self) -> BuildResult<HashMap<String, String>> {
        self.last_image_mut()?.labels().await
    }

    fn last_image_mut(&mut self) -> BuildResult<&mut BuildableImage> {
        self.stages
            .last_mut()
            .map(|stage| stage.image_mut())
            .ok_or_else(|| BuildError::Internal("pipeline has no stages".to_string()))
    }
}
