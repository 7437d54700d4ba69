//! In-memory docker stand-in for unit tests
//!
//! Understands the handful of docker commands the image layer issues and
//! records every command it receives.

use crate::error::BuildResult;
use crate::shell::runner::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    log: Vec<String>,
    tags: HashMap<String, String>,
    remote: HashMap<String, String>,
    images: HashSet<String>,
    containers: HashSet<String>,
    labels: HashMap<String, String>,
    fail_markers: Vec<String>,
    fail_commits: bool,
    commits: usize,
}

#[derive(Default)]
pub(crate) struct FakeDocker {
    state: Mutex<State>,
}

impl FakeDocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local tag `name` pointing at `id`
    pub fn with_tag(self, name: &str, id: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.tags.insert(name.to_string(), id.to_string());
            state.images.insert(id.to_string());
        }
        self
    }

    /// Registry image `name` with `id`, available to `docker pull`
    pub fn with_remote(self, name: &str, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .remote
            .insert(name.to_string(), id.to_string());
        self
    }

    /// Labels JSON returned by inspect for `id`
    pub fn with_labels(self, id: &str, labels_json: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .labels
            .insert(id.to_string(), labels_json.to_string());
        self
    }

    /// `docker run` fails when the command contains `marker`
    pub fn fail_run_on(self, marker: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_markers
            .push(marker.to_string());
        self
    }

    /// Every `docker commit` fails
    pub fn fail_commits(self) -> Self {
        self.state.lock().unwrap().fail_commits = true;
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn tag(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().tags.get(name).cloned()
    }

    pub fn remote(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().remote.get(name).cloned()
    }

    fn handle(state: &mut State, command: &str) -> CommandOutput {
        let words: Vec<&str> = command.split_whitespace().collect();
        let last = words.last().copied().unwrap_or_default().to_string();

        if command.contains("docker import") {
            state.images.insert("sha256:scratch".to_string());
            return CommandOutput::ok("sha256:scratch\n");
        }

        match words.get(1).copied() {
            Some("inspect") if command.contains(".Config.Labels") => {
                let labels = state.labels.get(&last).cloned();
                CommandOutput::ok(labels.unwrap_or_else(|| "null".to_string()))
            }
            Some("inspect") => {
                if let Some(id) = state.tags.get(&last) {
                    CommandOutput::ok(format!("{}\n", id))
                } else if state.images.contains(&last) {
                    CommandOutput::ok(format!("{}\n", last))
                } else {
                    CommandOutput::failed(1, format!("Error: No such image: {}", last))
                }
            }
            Some("pull") => match state.remote.get(&last).cloned() {
                Some(id) => {
                    state.images.insert(id.clone());
                    state.tags.insert(last, id);
                    CommandOutput::ok("")
                }
                None => CommandOutput::failed(1, "manifest unknown"),
            },
            Some("push") => match state.tags.get(&last).cloned() {
                Some(id) => {
                    state.remote.insert(last, id);
                    CommandOutput::ok("")
                }
                None => CommandOutput::failed(1, "An image does not exist locally"),
            },
            Some("rmi") => {
                if state.tags.remove(&last).is_some() || state.images.remove(&last) {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(1, "No such image")
                }
            }
            Some("tag") => {
                let id = words.get(2).copied().unwrap_or_default().to_string();
                state.tags.insert(last, id);
                CommandOutput::ok("")
            }
            Some("create") => {
                if let Some(name) = words.iter().find_map(|w| w.strip_prefix("--name=")) {
                    state.containers.insert(name.to_string());
                }
                CommandOutput::ok("container\n")
            }
            Some("run") => {
                if let Some(name) = words.iter().find_map(|w| w.strip_prefix("--name=")) {
                    state.containers.insert(name.to_string());
                }
                if state.fail_markers.iter().any(|m| command.contains(m.as_str())) {
                    CommandOutput::failed(1, "command failed")
                } else {
                    CommandOutput::ok("")
                }
            }
            Some("commit") if state.fail_commits => CommandOutput::failed(1, "commit failed"),
            Some("commit") => {
                if state.containers.contains(&last) {
                    state.commits += 1;
                    let id = format!("sha256:commit{}", state.commits);
                    state.images.insert(id.clone());
                    CommandOutput::ok(format!("{}\n", id))
                } else {
                    CommandOutput::failed(1, format!("No such container: {}", last))
                }
            }
            Some("rm") => {
                if state.containers.remove(&last) {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(1, format!("No such container: {}", last))
                }
            }
            _ => CommandOutput::ok(""),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeDocker {
    async fn shellout(&self, command: &str) -> BuildResult<CommandOutput> {
        let mut state = self.state.lock().unwrap();
        state.log.push(command.to_string());
        Ok(Self::handle(&mut state, command))
    }

    async fn interactive(&self, command: &str) -> BuildResult<i32> {
        self.state.lock().unwrap().log.push(command.to_string());
        Ok(0)
    }
}
