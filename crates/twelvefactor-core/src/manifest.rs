//! app.toml manifest parser.
//!
//! ```toml
//! [app]
//! id = "acme"
//! name = "acme"
//! version = "v1"
//! image = "remind101/acme-inc"
//!
//! [app.env]
//! RAILS_ENV = "production"
//!
//! [[process]]
//! name = "web"
//! command = "acme-inc web"
//! desired_count = 2
//! memory = "512MB"
//! cpu_shares = 256
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{SchedulerError, SchedulerResult};
use crate::types::{App, Process, Stdin, Stdout};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppManifest {
    pub app: AppSection,
    #[serde(default, rename = "process")]
    pub processes: Vec<ProcessSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub id: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub image: String,
    pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSection {
    pub name: String,
    pub command: Option<CommandSpec>,
    pub env: Option<HashMap<String, String>>,
    pub labels: Option<HashMap<String, String>>,
    pub stdout: Option<Stdout>,
    pub stdin: Option<Stdin>,
    pub desired_count: Option<u32>,
    pub memory: Option<MemorySpec>,
    pub cpu_shares: Option<u32>,
}

/// A command given either as one line (split on whitespace) or as tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Tokens(Vec<String>),
}

impl CommandSpec {
    pub fn tokens(&self) -> Vec<String> {
        match self {
            CommandSpec::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandSpec::Tokens(tokens) => tokens.clone(),
        }
    }
}

/// Memory given as raw bytes or a size string like "512MB".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MemorySpec {
    Bytes(u64),
    Size(String),
}

impl MemorySpec {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            MemorySpec::Bytes(b) => Some(*b),
            MemorySpec::Size(s) => parse_size(s),
        }
    }
}

impl AppManifest {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let manifest: AppManifest = toml::from_str(content)?;
        Ok(manifest)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Convert into a validated [`App`].
    pub fn into_app(self) -> SchedulerResult<App> {
        let mut processes = Vec::with_capacity(self.processes.len());
        for p in self.processes {
            let memory = match &p.memory {
                Some(spec) => spec.bytes().ok_or_else(|| {
                    SchedulerError::Manifest(format!("process {}: invalid memory {spec:?}", p.name))
                })?,
                None => 0,
            };
            processes.push(Process {
                command: p.command.as_ref().map(CommandSpec::tokens).unwrap_or_default(),
                env: p.env.unwrap_or_default(),
                labels: p.labels.unwrap_or_default(),
                stdout: p.stdout.unwrap_or_default(),
                stdin: p.stdin.unwrap_or_default(),
                desired_count: p.desired_count.unwrap_or(0),
                memory,
                cpu_shares: p.cpu_shares.unwrap_or(0),
                name: p.name,
            });
        }

        if self.app.id.is_empty() {
            return Err(SchedulerError::Manifest("app.id must not be empty".to_string()));
        }

        let app = App {
            name: self.app.name.unwrap_or_else(|| self.app.id.clone()),
            version: self.app.version.unwrap_or_default(),
            image: self.app.image,
            env: self.app.env.unwrap_or_default(),
            processes,
            id: self.app.id,
        };
        app.validate()?;
        Ok(app)
    }
}

/// Parse a size string like "512MB", "1GB", "64kb" or "1048576".
/// Units are binary (1KB = 1024 bytes).
fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim().to_ascii_uppercase();
    let (digits, multiplier) = if let Some(n) = s.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}
