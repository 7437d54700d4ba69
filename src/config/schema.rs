//! Configuration schema for stagecache
//!
//! Configuration is read from `stagecache.toml` in the project directory.

use crate::hashsum::CacheVersion;
use crate::image::{ImageOptions, OptionMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project settings
    pub project: ProjectConfig,

    /// Base image and container options
    pub docker: DockerConfig,

    /// Commands run on top of the base image
    pub shell: ShellConfig,

    /// Build behaviour
    pub build: BuildConfig,
}

/// Project settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Prefix of stage image names (`<name>-stage:<signature>`)
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: crate::context::DEFAULT_PROJECT_NAME.to_string(),
        }
    }
}

/// Base image configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Base image reference; an empty scratch image when unset
    pub from: Option<String>,

    /// Bump to rebuild from a moved base tag
    pub from_cache_version: Option<CacheVersion>,

    /// Extra `docker run` options for every stage container
    pub run_options: OptionMap,

    /// Extra `docker commit --change` instructions for every stage image
    pub commit_options: OptionMap,
}

impl DockerConfig {
    /// Run/commit options shared by all stages
    pub fn image_options(&self) -> ImageOptions {
        ImageOptions {
            commands: Vec::new(),
            run_options: self.run_options.clone(),
            commit_options: self.commit_options.clone(),
        }
    }
}

/// Shell stage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Commands run in order, the first failure stops the stage
    pub commands: Vec<String>,

    /// Environment variables for the commands and the resulting image
    pub env: BTreeMap<String, String>,

    /// Bump to rebuild the stage without changing its commands
    pub cache_version: Option<CacheVersion>,
}

/// Build behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Keep a failed build container as an image and open a shell in it
    pub introspect_error: bool,

    /// Open a shell in the image a failed command ran on
    pub introspect_before_error: bool,
}

impl Config {
    /// Check values serde cannot, returning the reason for the first problem
    pub fn validate(&self) -> Result<(), String> {
        let name = &self.project.name;
        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-/".contains(c))
            && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
        if !valid_name {
            return Err(format!(
                "project.name '{}' is not a valid image repository name",
                name
            ));
        }

        if let Some(from) = &self.docker.from {
            if from.trim().is_empty() {
                return Err("docker.from must not be empty".to_string());
            }
        }

        if self.shell.commands.iter().any(|c| c.trim().is_empty()) {
            return Err("shell.commands must not contain empty commands".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.project.name, "stagecache");
        assert!(config.docker.from.is_none());
        assert!(config.shell.commands.is_empty());
        assert!(!config.build.introspect_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let config: Config = toml::from_str(
            r#"
[project]
name = "app"

[docker]
from = "busybox:latest"
from_cache_version = "1"

[docker.run_options]
volume = ["/tmp/cache:/cache"]

[docker.commit_options]
workdir = ["/app"]

[shell]
commands = ["apk add make", "make"]
cache_version = "2"

[shell.env]
LANG = "C.UTF-8"

[build]
introspect_error = true
"#,
        )
        .unwrap();

        assert_eq!(config.project.name, "app");
        assert_eq!(config.docker.from.as_deref(), Some("busybox:latest"));
        assert_eq!(config.docker.from_cache_version, Some(CacheVersion::from("1")));
        assert_eq!(config.docker.run_options["volume"], vec!["/tmp/cache:/cache"]);
        assert_eq!(config.shell.commands, vec!["apk add make", "make"]);
        assert_eq!(config.shell.env["LANG"], "C.UTF-8");
        assert_eq!(config.shell.cache_version, Some(CacheVersion::from("2")));
        assert!(config.build.introspect_error);
        assert!(!config.build.introspect_before_error);

        let options = config.docker.image_options();
        assert_eq!(options.commit_options["workdir"], vec!["/app"]);
        assert!(options.commands.is_empty());
    }

    #[test]
    fn integer_cache_versions() {
        let config: Config = toml::from_str(
            "[docker]\nfrom = \"busybox:latest\"\nfrom_cache_version = 1\n\n[shell]\ncache_version = 7\n",
        )
        .unwrap();
        assert_eq!(config.docker.from_cache_version, Some(CacheVersion::Int(1)));
        assert_eq!(config.shell.cache_version, Some(CacheVersion::Int(7)));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: Config = toml::from_str("[docker]\nfrom = \"alpine:3\"\n").unwrap();
        assert_eq!(config.project.name, "stagecache");
        assert_eq!(config.docker.from.as_deref(), Some("alpine:3"));
    }

    #[test]
    fn invalid_project_name() {
        let mut config = Config::default();
        config.project.name = "My App".to_string();
        assert!(config.validate().unwrap_err().contains("project.name"));
    }

    #[test]
    fn empty_command_rejected() {
        let mut config = Config::default();
        config.shell.commands = vec!["make".to_string(), "  ".to_string()];
        assert!(config.validate().is_err());
    }
}
