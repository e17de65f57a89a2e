//! The ECS API boundary.
//!
//! [`EcsClient`] is the narrow set of ECS calls the stack builder and the
//! scheduler make. A production implementation wraps an AWS SDK client;
//! [`MemoryCluster`](crate::MemoryCluster) implements it in memory.

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EcsResult;

/// Request for one page of the cluster's service listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListServicesInput {
    pub cluster: String,
    pub next_token: Option<String>,
}

/// One page of service ARNs. Entries may be null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePage {
    pub service_arns: Vec<Option<String>>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValuePair {
    pub name: String,
    pub value: String,
}

/// A container within a task definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    /// CPU units (shares).
    pub cpu: u32,
    /// Hard memory limit in MiB.
    pub memory: u64,
    pub command: Vec<String>,
    pub essential: bool,
    pub environment: Vec<KeyValuePair>,
    pub docker_labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterTaskDefinitionInput {
    pub family: String,
    pub container_definitions: Vec<ContainerDefinition>,
}

/// A registered task definition revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDefinitionRef {
    pub family: String,
    pub revision: u32,
}

impl fmt::Display for TaskDefinitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.revision)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateServiceInput {
    pub cluster: String,
    pub service_name: String,
    /// `family:revision`
    pub task_definition: String,
    pub desired_count: u32,
    /// IAM role for services fronted by a load balancer.
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateServiceInput {
    pub cluster: String,
    pub service: String,
    pub desired_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTaskInput {
    pub cluster: String,
    pub task_definition: String,
    pub count: u32,
    pub started_by: Option<String>,
}

/// Status of a task as returned by `describe_tasks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedTask {
    pub task_arn: String,
    pub last_status: String,
}

/// The ECS operations used by this crate.
#[async_trait]
pub trait EcsClient: Send + Sync {
    /// One page of the (unfiltered) service listing for a cluster.
    async fn list_services(&self, input: &ListServicesInput) -> EcsResult<ServicePage>;

    async fn delete_service(&self, cluster: &str, service: &str) -> EcsResult<()>;

    /// Register a new revision. Always creates a revision, even when the
    /// definition is unchanged.
    async fn register_task_definition(
        &self,
        input: &RegisterTaskDefinitionInput,
    ) -> EcsResult<TaskDefinitionRef>;

    async fn create_service(&self, input: &CreateServiceInput) -> EcsResult<()>;

    async fn update_service(&self, input: &UpdateServiceInput) -> EcsResult<()>;

    /// ARNs of the RUNNING and PENDING tasks of a service. May be empty.
    async fn list_tasks(&self, cluster: &str, service: &str) -> EcsResult<Vec<String>>;

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> EcsResult<Vec<DescribedTask>>;

    async fn stop_task(&self, cluster: &str, task: &str) -> EcsResult<()>;

    /// Start tasks outside of any service. Returns the new task ARNs.
    async fn run_task(&self, input: &RunTaskInput) -> EcsResult<Vec<String>>;
}

/// Walk every page of a cluster's service listing.
///
/// `f` is called once per page and may return `ControlFlow::Break` to end
/// the scan early. An error from any page request aborts the walk. An empty
/// or repeated `next_token` ends the walk after that page.
pub async fn list_services_pages<F>(
    client: &dyn EcsClient,
    cluster: &str,
    mut f: F,
) -> EcsResult<()>
where
    F: FnMut(&ServicePage) -> ControlFlow<()> + Send,
{
    let mut input = ListServicesInput {
        cluster: cluster.to_string(),
        next_token: None,
    };
    let mut pages = 0usize;

    loop {
        let page = client.list_services(&input).await?;
        pages += 1;

        if f(&page).is_break() {
            debug!(%cluster, pages, "service scan stopped early");
            return Ok(());
        }

        match page.next_token {
            Some(token) if !token.is_empty() && input.next_token.as_ref() != Some(&token) => {
                input.next_token = Some(token);
            }
            _ => break,
        }
    }

    debug!(%cluster, pages, "service scan complete");
    Ok(())
}
