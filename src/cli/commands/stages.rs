//! Stages command - show stage signatures without building

use crate::cli::args::{OutputFormat, StagesArgs};
use crate::cli::commands::{pipeline, GlobalOptions};
use crate::config::Config;
use crate::error::BuildResult;
use crate::pipeline::StageSummary;
use console::style;

/// Execute the stages command
pub async fn execute(args: StagesArgs, config: &Config, options: GlobalOptions) -> BuildResult<()> {
    let (_, pipeline) = pipeline(config, options);
    let summaries = pipeline.signatures();

    match args.format {
        OutputFormat::Table => print_table(&summaries),
        OutputFormat::Json => print_json(&summaries)?,
        OutputFormat::Plain => print_plain(&summaries),
    }

    Ok(())
}

fn print_table(summaries: &[StageSummary]) {
    println!(
        "{:<8} {:<66} {}",
        style("STAGE").bold(),
        style("SIGNATURE").bold(),
        style("DEPENDENCIES").bold()
    );

    for summary in summaries {
        let dependencies: Vec<String> = summary.dependencies.iter().map(|d| d.to_string()).collect();
        println!(
            "{:<8} {:<66} {}",
            summary.name,
            summary.signature,
            style(dependencies.join(", ")).dim()
        );
    }
}

fn print_json(summaries: &[StageSummary]) -> BuildResult<()> {
    let json = serde_json::to_string_pretty(summaries)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(summaries: &[StageSummary]) {
    for summary in summaries {
        println!("{} {}", summary.name, summary.signature);
    }
}
