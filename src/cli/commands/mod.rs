//! CLI command implementations

pub mod build;
pub mod export;
pub mod import;
pub mod labels;
pub mod stages;

pub use build::execute as build;
pub use export::execute as export;
pub use import::execute as import;
pub use labels::execute as labels;
pub use stages::execute as stages;

use crate::config::Config;
use crate::context::BuildContext;
use crate::introspect::IntrospectPolicy;
use crate::pipeline::Pipeline;
use crate::shell::{CommandRunner, ShellRunner};
use std::sync::Arc;

/// Flags shared by every subcommand
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalOptions {
    pub introspect_error: bool,
    pub introspect_before_error: bool,
}

/// Introspection flags from the command line add to those in `[build]`
pub fn introspect_policy(config: &Config, options: GlobalOptions) -> IntrospectPolicy {
    IntrospectPolicy {
        on_error: options.introspect_error || config.build.introspect_error,
        before_error: options.introspect_before_error || config.build.introspect_before_error,
    }
}

pub fn build_context(
    config: &Config,
    options: GlobalOptions,
    runner: Arc<dyn CommandRunner>,
) -> Arc<BuildContext> {
    Arc::new(
        BuildContext::new(runner)
            .with_project_name(config.project.name.clone())
            .with_introspect(introspect_policy(config, options)),
    )
}

/// Pipeline for `config` running docker through the system shell
pub fn pipeline(config: &Config, options: GlobalOptions) -> (Arc<BuildContext>, Pipeline) {
    let ctx = build_context(config, options, Arc::new(ShellRunner::new()));
    let pipeline = Pipeline::from_config(config, ctx.clone());
    (ctx, pipeline)
}
