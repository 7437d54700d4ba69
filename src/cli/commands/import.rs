//! Import command - adopt a registry image as the final stage image

use crate::cli::args::ImageNameArgs;
use crate::cli::commands::{pipeline, GlobalOptions};
use crate::config::Config;
use crate::error::BuildResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the import command
pub async fn execute(args: ImageNameArgs, config: &Config, options: GlobalOptions) -> BuildResult<()> {
    let ui_ctx = UiContext::detect();
    let (_, mut pipeline) = pipeline(config, options);

    let mut spinner = TaskSpinner::new(&ui_ctx);
    spinner.start(&format!("Pulling {}", args.name));
    match pipeline.import(&args.name).await {
        Ok(()) => {
            spinner.stop(&format!("Imported {}", args.name));
            Ok(())
        }
        Err(e) => {
            spinner.clear();
            ui::step_error(&ui_ctx, &format!("Import of {} failed", args.name));
            Err(e)
        }
    }
}
