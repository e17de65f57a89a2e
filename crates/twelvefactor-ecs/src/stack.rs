//! The StackBuilder seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use twelvefactor_core::{App, Process};

use crate::error::EcsResult;

/// Provisions and enumerates the ECS resources of an app.
#[async_trait]
pub trait StackBuilder: Send + Sync {
    /// Converge `processes` of `app` onto ECS services, in order.
    async fn build(&self, app: &App, processes: &[Process]) -> EcsResult<()>;

    /// Remove every service belonging to the app.
    async fn remove(&self, app_id: &str) -> EcsResult<()>;

    /// Process name → service name for the app's services.
    async fn services(&self, app_id: &str) -> EcsResult<BTreeMap<String, String>>;

    /// Register a task definition revision for a process and return its
    /// `family:revision` reference.
    async fn register_task_definition(&self, app: &App, process: &Process) -> EcsResult<String>;
}
