//! Labels command - print labels of the final stage image

use crate::cli::commands::{pipeline, GlobalOptions};
use crate::config::Config;
use crate::error::BuildResult;
use std::collections::BTreeMap;

/// Execute the labels command
pub async fn execute(config: &Config, options: GlobalOptions) -> BuildResult<()> {
    let (_, mut pipeline) = pipeline(config, options);
    let labels: BTreeMap<String, String> = pipeline.labels().await?.into_iter().collect();

    println!("{}", serde_json::to_string_pretty(&labels)?);
    Ok(())
}
