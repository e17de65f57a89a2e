//! RawStackBuilder — converges apps with direct ECS API calls.
//!
//! For every process, a new task definition revision is registered and a
//! service named `{app_id}{delimiter}{process}` is created on top of it.
//! There is no existence check before creating a service and no
//! content-based dedup of task definitions: each build registers a fresh
//! revision.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use twelvefactor_core::{App, NameCodec, Process};

use crate::arn;
use crate::client::*;
use crate::config::EcsConfig;
use crate::error::EcsResult;
use crate::stack::StackBuilder;

/// Bytes per MiB, the unit ECS takes memory limits in.
pub const MIB: u64 = 1024 * 1024;

/// A [`StackBuilder`] that talks to ECS directly.
pub struct RawStackBuilder {
    client: Arc<dyn EcsClient>,
    cluster: String,
    codec: NameCodec,
    service_role: Option<String>,
}

impl RawStackBuilder {
    pub fn new(client: Arc<dyn EcsClient>, config: &EcsConfig) -> Self {
        Self {
            client,
            cluster: config.cluster.clone(),
            codec: config.codec(),
            service_role: config.service_role.clone(),
        }
    }

    pub fn codec(&self) -> &NameCodec {
        &self.codec
    }

    /// The task definition registered for a process.
    pub fn task_definition_input(
        &self,
        app: &App,
        process: &Process,
    ) -> RegisterTaskDefinitionInput {
        let environment = app
            .env_for(process)
            .into_iter()
            .map(|(name, value)| KeyValuePair { name, value })
            .collect();

        RegisterTaskDefinitionInput {
            family: self.codec.encode(&app.id, &process.name),
            container_definitions: vec![ContainerDefinition {
                name: process.name.clone(),
                image: app.image.clone(),
                cpu: process.cpu_shares,
                memory: process.memory / MIB,
                command: process.command.clone(),
                essential: true,
                environment,
                docker_labels: process.labels.clone(),
            }],
        }
    }

    /// Register a task definition and create the process's service on it.
    async fn create_service(&self, app: &App, process: &Process) -> EcsResult<()> {
        let name = self.codec.encode(&app.id, &process.name);
        let task_definition = self.register_task_definition(app, process).await?;

        self.client
            .create_service(&CreateServiceInput {
                cluster: self.cluster.clone(),
                service_name: name.clone(),
                task_definition: task_definition.clone(),
                desired_count: process.desired_count,
                role: self.service_role.clone(),
            })
            .await?;

        info!(
            app = %app.id,
            service = %name,
            %task_definition,
            desired = process.desired_count,
            "service created"
        );
        Ok(())
    }
}

#[async_trait]
impl StackBuilder for RawStackBuilder {
    async fn build(&self, app: &App, processes: &[Process]) -> EcsResult<()> {
        for (done, process) in processes.iter().enumerate() {
            if let Err(e) = self.create_service(app, process).await {
                warn!(
                    app = %app.id,
                    process = %process.name,
                    converged = done,
                    remaining = processes.len() - done,
                    error = %e,
                    "build aborted"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    async fn remove(&self, app_id: &str) -> EcsResult<()> {
        let services = self.services(app_id).await?;

        for (done, service) in services.values().enumerate() {
            if let Err(e) = self.client.delete_service(&self.cluster, service).await {
                warn!(
                    app = %app_id,
                    %service,
                    removed = done,
                    remaining = services.len() - done,
                    error = %e,
                    "remove aborted"
                );
                return Err(e);
            }
            info!(app = %app_id, %service, "service removed");
        }

        Ok(())
    }

    async fn services(&self, app_id: &str) -> EcsResult<BTreeMap<String, String>> {
        let mut services = BTreeMap::new();
        let mut skipped = 0usize;

        list_services_pages(self.client.as_ref(), &self.cluster, |page| {
            for entry in &page.service_arns {
                let Some(name) = entry.as_deref().and_then(arn::service_name) else {
                    skipped += 1;
                    continue;
                };
                let Some((app, process)) = self.codec.decode(name) else {
                    skipped += 1;
                    continue;
                };
                if app == app_id {
                    services.insert(process.to_string(), name.to_string());
                }
            }
            ControlFlow::Continue(())
        })
        .await?;

        debug!(app = %app_id, found = services.len(), skipped, "services resolved");
        Ok(services)
    }

    async fn register_task_definition(&self, app: &App, process: &Process) -> EcsResult<String> {
        let input = self.task_definition_input(app, process);
        let registered = self.client.register_task_definition(&input).await?;
        debug!(
            app = %app.id,
            process = %process.name,
            task_definition = %registered,
            "task definition registered"
        );
        Ok(registered.to_string())
    }
}
