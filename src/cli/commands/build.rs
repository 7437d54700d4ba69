//! Build command - prepare every stage

use crate::cli::commands::{pipeline, GlobalOptions};
use crate::config::Config;
use crate::error::{BuildError, BuildResult};
use crate::introspect::run_session;
use crate::ui::{self, StageProgress, UiContext};
use tracing::debug;

/// Execute the build command
pub async fn execute(config: &Config, options: GlobalOptions) -> BuildResult<()> {
    let ui_ctx = UiContext::detect();
    let (ctx, mut pipeline) = pipeline(config, options);

    ui::section(&ui_ctx, &format!("Building {}", config.project.name));
    let mut progress = StageProgress::new(&ui_ctx);

    match pipeline.build_with(&mut progress).await {
        Ok(report) => {
            ui::step_info(
                &ui_ctx,
                &format!(
                    "{} of {} stage(s) rebuilt",
                    report.built_count(),
                    report.stages.len()
                ),
            );
            ui::key_value(&ui_ctx, "image", &report.image);
            if let Some(id) = &report.image_id {
                ui::key_value(&ui_ctx, "id", id);
            }
            Ok(())
        }
        Err(err) => {
            let signal = err.into_introspection()?;
            ui::step_warn(
                &ui_ctx,
                &format!("Opening a shell in {} (exit to continue)", signal.built_id),
            );
            let code = run_session(ctx.runner(), &signal).await?;
            debug!("Introspection session exited with {}", code);
            Err(BuildError::Introspect(signal))
        }
    }
}
