//! Domain types for twelve-factor applications.
//!
//! These are declarative values: an `App` is handed to a scheduler on every
//! call and never persisted by this layer. `Task`s are only ever produced by
//! reading backend state.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{SchedulerError, SchedulerResult};

/// Unique identifier for an app. Used as the root of the resource namespace.
pub type AppId = String;

/// Identifier of a single running/pending instance, as reported by a backend.
pub type TaskId = String;

// ── App ────────────────────────────────────────────────────────────

/// A twelve-factor application: a collection of processes that share a
/// common image and environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct App {
    /// Unique identifier of the application.
    pub id: AppId,
    pub name: String,
    pub version: String,
    /// The container image every process runs.
    pub image: String,
    /// Environment shared by all processes.
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl App {
    /// Check that process names are unique.
    ///
    /// Resource identity is derived from `(id, process.name)`, so two
    /// processes with the same name would converge onto the same resource.
    pub fn validate(&self) -> SchedulerResult<()> {
        let mut seen = HashSet::new();
        for process in &self.processes {
            if !seen.insert(process.name.as_str()) {
                return Err(SchedulerError::DuplicateProcess(process.name.clone()));
            }
        }
        Ok(())
    }

    /// Look up a process by name.
    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.name == name)
    }

    /// The effective environment for `process`: app env overridden by the
    /// process env.
    pub fn env_for(&self, process: &Process) -> HashMap<String, String> {
        merge_env(&[&self.env, &process.env])
    }
}

// ── Process ────────────────────────────────────────────────────────

/// One runnable role within an App, e.g. "web" or "worker".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Process {
    /// Unique within the app.
    pub name: String,
    /// Command tokens to run.
    #[serde(default)]
    pub command: Vec<String>,
    /// Overrides merged on top of the app environment.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Free form labels attached to the process.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub stdout: Stdout,
    #[serde(default)]
    pub stdin: Stdin,
    /// Target number of instances.
    #[serde(default)]
    pub desired_count: u32,
    /// Memory to allocate, in bytes.
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub cpu_shares: u32,
}

impl Process {
    /// Attached vs detached is determined by where stdout goes.
    pub fn is_attached(&self) -> bool {
        self.stdout == Stdout::Attached
    }
}

/// Where a process's stdout goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stdout {
    /// Output goes to the backend's own log sink.
    #[default]
    Detached,
    /// Output is streamed back to the caller.
    Attached,
}

/// Where a process's stdin comes from. The default is to not attach stdin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stdin {
    #[default]
    Closed,
    Attached,
}

// ── Task ───────────────────────────────────────────────────────────

/// A running or pending instance of a process, as observed on the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    /// Backend-defined status string, copied verbatim (e.g. "RUNNING").
    pub state: String,
    /// Unix timestamp (seconds) when this task was observed.
    pub time: u64,
}

/// Merge environment maps. Later maps win on key conflicts.
pub fn merge_env(envs: &[&HashMap<String, String>]) -> HashMap<String, String> {
    let mut merged = HashMap::new();
    for env in envs {
        for (k, v) in env.iter() {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}
