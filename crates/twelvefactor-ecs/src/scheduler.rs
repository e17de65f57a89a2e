//! EcsScheduler — the [`Scheduler`] contract on top of ECS services.
//!
//! Convergence and enumeration go through the [`StackBuilder`]; scaling,
//! task listing and task stops are direct ECS calls against the service
//! names the stack builder resolves. Nothing is retried and every call is a
//! single round trip.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{debug, info};
use twelvefactor_core::*;

use crate::arn;
use crate::client::{EcsClient, RunTaskInput, UpdateServiceInput};
use crate::config::EcsConfig;
use crate::error::EcsResult;
use crate::raw::RawStackBuilder;
use crate::stack::StackBuilder;

/// A [`Scheduler`] backed by ECS.
pub struct EcsScheduler {
    /// ECS cluster to operate within.
    cluster: String,
    client: Arc<dyn EcsClient>,
    stack: Arc<dyn StackBuilder>,
}

impl EcsScheduler {
    /// Create a scheduler that provisions with a [`RawStackBuilder`] on the
    /// same client.
    pub fn new(client: Arc<dyn EcsClient>, config: &EcsConfig) -> Self {
        let stack = Arc::new(RawStackBuilder::new(client.clone(), config));
        Self::with_stack_builder(client, stack, &config.cluster)
    }

    pub fn with_stack_builder(
        client: Arc<dyn EcsClient>,
        stack: Arc<dyn StackBuilder>,
        cluster: &str,
    ) -> Self {
        Self {
            cluster: cluster.to_string(),
            client,
            stack,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Running and pending tasks of a single ECS service.
    pub async fn service_tasks(&self, service: &str) -> EcsResult<Vec<Task>> {
        let task_arns = self.client.list_tasks(&self.cluster, service).await?;
        if task_arns.is_empty() {
            return Ok(Vec::new());
        }

        let described = self.client.describe_tasks(&self.cluster, &task_arns).await?;
        let now = epoch_secs();
        described
            .into_iter()
            .map(|task| {
                Ok(Task {
                    id: arn::resource_id(&task.task_arn)?.to_string(),
                    state: task.last_status,
                    time: now,
                })
            })
            .collect()
    }

    /// Resolve the service name of a process.
    async fn service(&self, app_id: &str, process: &str) -> SchedulerResult<String> {
        let mut services = self.stack.services(app_id).await?;
        services
            .remove(process)
            .ok_or_else(|| SchedulerError::ProcessNotFound(process.to_string()))
    }

    /// Stop every task of a service; the service starts replacements.
    async fn restart_service(&self, service: &str) -> SchedulerResult<()> {
        let task_arns = self.client.list_tasks(&self.cluster, service).await?;
        for task in &task_arns {
            self.client.stop_task(&self.cluster, task).await?;
        }
        info!(%service, stopped = task_arns.len(), "service restarted");
        Ok(())
    }
}

#[async_trait]
impl Runner for EcsScheduler {
    async fn run(&self, app: &App) -> SchedulerResult<()> {
        app.validate()?;
        self.stack.build(app, &app.processes).await?;
        Ok(())
    }
}

#[async_trait]
impl Scaler for EcsScheduler {
    async fn scale_process(
        &self,
        app_id: &str,
        process: &str,
        desired: u32,
    ) -> SchedulerResult<()> {
        let service = self.service(app_id, process).await?;

        self.client
            .update_service(&UpdateServiceInput {
                cluster: self.cluster.clone(),
                service: service.clone(),
                desired_count: desired,
            })
            .await?;

        info!(app = %app_id, %process, %service, desired, "process scaled");
        Ok(())
    }
}

#[async_trait]
impl Remover for EcsScheduler {
    async fn remove(&self, app_id: &str) -> SchedulerResult<()> {
        self.stack.remove(app_id).await?;
        Ok(())
    }
}

#[async_trait]
impl Scheduler for EcsScheduler {
    async fn tasks(&self, app_id: &str) -> SchedulerResult<Vec<Task>> {
        let services = self.stack.services(app_id).await?;

        let mut tasks = Vec::new();
        for service in services.values() {
            match self.service_tasks(service).await {
                Ok(found) => tasks.extend(found),
                Err(e) if tasks.is_empty() => return Err(e.into()),
                Err(e) => {
                    return Err(SchedulerError::PartialTasks {
                        collected: tasks,
                        source: Box::new(e.into()),
                    });
                }
            }
        }

        debug!(app = %app_id, services = services.len(), tasks = tasks.len(), "tasks listed");
        Ok(tasks)
    }

    async fn stop_task(&self, task_id: &str) -> SchedulerResult<()> {
        self.client.stop_task(&self.cluster, task_id).await?;
        info!(task = %task_id, "task stopped");
        Ok(())
    }

    fn process_runner(&self) -> Option<&dyn ProcessRunner> {
        Some(self)
    }

    fn restarter(&self) -> Option<&dyn Restarter> {
        Some(self)
    }

    fn process_restarter(&self) -> Option<&dyn ProcessRestarter> {
        Some(self)
    }
}

#[async_trait]
impl ProcessRunner for EcsScheduler {
    /// Start a detached one-off task. ECS cannot stream a task's stdio back
    /// to the caller, so attached processes are rejected.
    async fn run_process(&self, app: &App, process: &Process) -> SchedulerResult<()> {
        if process.is_attached() {
            return Err(SchedulerError::Unsupported(
                "attached processes on ECS".to_string(),
            ));
        }

        let task_definition = self.stack.register_task_definition(app, process).await?;
        let started = self
            .client
            .run_task(&RunTaskInput {
                cluster: self.cluster.clone(),
                task_definition: task_definition.clone(),
                count: 1,
                started_by: Some(app.id.clone()),
            })
            .await?;

        info!(
            app = %app.id,
            process = %process.name,
            %task_definition,
            tasks = started.len(),
            "detached process started"
        );
        Ok(())
    }
}

#[async_trait]
impl ProcessRestarter for EcsScheduler {
    async fn restart_process(&self, app_id: &str, process: &str) -> SchedulerResult<()> {
        let service = self.service(app_id, process).await?;
        self.restart_service(&service).await
    }
}

#[async_trait]
impl Restarter for EcsScheduler {
    async fn restart(&self, app_id: &str) -> SchedulerResult<()> {
        let services = self.stack.services(app_id).await?;
        for service in services.values() {
            self.restart_service(service).await?;
        }
        Ok(())
    }
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
