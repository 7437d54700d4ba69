//! Rendering of `docker run` / `docker commit` arguments
//!
//! Pure functions over the accumulated option set of an image. Nothing
//! here touches the image store.

use crate::shell::shell_quote;
use std::collections::BTreeMap;

/// Option name to values, rendered in key order
pub type OptionMap = BTreeMap<String, Vec<String>>;

/// Entrypoint used for every build container
pub const BUILD_ENTRYPOINT: &str = "/bin/bash";

/// Accumulated commands and options for one image build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    /// Shell commands run inside the build container, in order
    pub commands: Vec<String>,
    /// `docker run` options (`--key=value`)
    pub run_options: OptionMap,
    /// `docker commit --change` instructions (`KEY value`)
    pub commit_options: OptionMap,
}

impl ImageOptions {
    pub fn add_command(&mut self, command: impl Into<String>) {
        self.commands.push(command.into());
    }

    pub fn add_run_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.run_options
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    pub fn add_commit_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.commit_options
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// Set an environment variable for the build and keep it in the committed image
    pub fn add_env(&mut self, name: &str, value: &str) {
        let pair = format!("{}={}", name, value);
        self.add_run_option("env", pair.clone());
        self.add_commit_option("env", pair);
    }

    pub fn add_volume(&mut self, volume: impl Into<String>) {
        self.add_run_option("volume", volume);
    }

    /// Merge another option set after this one
    pub fn extend(&mut self, other: &ImageOptions) {
        self.commands.extend(other.commands.iter().cloned());
        for (key, values) in &other.run_options {
            self.run_options
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
        for (key, values) in &other.commit_options {
            self.commit_options
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }
}

/// Rendered argument strings for one build container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOptions {
    /// Options placed before the parent id in `docker run`
    pub run: String,
    /// `--change` options for `docker commit`
    pub change: String,
    /// Commands joined for `bash -ec`
    pub bash: String,
}

/// Render the run options, commit changes and bash command of a build
pub fn render_options(container_name: &str, options: &ImageOptions) -> RenderedOptions {
    RenderedOptions {
        run: render_run_options(container_name, &options.run_options),
        change: render_change_options(&options.commit_options),
        bash: render_bash_command(&options.commands),
    }
}

/// `--entrypoint` and `--name` always come first, then user options in key order
pub fn render_run_options(container_name: &str, run_options: &OptionMap) -> String {
    let mut args = vec![
        format!("--entrypoint={}", BUILD_ENTRYPOINT),
        format!("--name={}", container_name),
    ];

    for (key, values) in run_options {
        for value in values {
            args.push(format!("--{}={}", key, quote_if_needed(value)));
        }
    }

    args.join(" ")
}

pub fn render_change_options(commit_options: &OptionMap) -> String {
    commit_options
        .iter()
        .flat_map(|(key, values)| {
            values.iter().map(move |value| {
                format!(
                    "--change={}",
                    shell_quote(&format!("{} {}", key.to_uppercase(), value))
                )
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// An empty command buffer still runs `true` so the container commits cleanly
pub fn render_bash_command(commands: &[String]) -> String {
    if commands.is_empty() {
        "true".to_string()
    } else {
        commands.join(" && ")
    }
}

/// Join command words, skipping empty ones
pub(crate) fn join_args(args: &[&str]) -> String {
    args.iter()
        .filter(|a| !a.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_if_needed(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@,+%".contains(c));
    if plain {
        value.to_string()
    } else {
        shell_quote(value)
    }
}
