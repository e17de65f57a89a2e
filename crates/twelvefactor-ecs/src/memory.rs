//! MemoryCluster — an in-process ECS stand-in.
//!
//! Keeps services, task definition revisions and tasks in memory and
//! applies desired counts immediately: creating or scaling a service starts
//! or stops tasks on the spot, and a stopped service task is replaced right
//! away. Every call is appended to a log, and single calls can be made to
//! fail, so tests can assert exactly what a scheduler asked for.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::arn;
use crate::client::*;
use crate::error::{EcsError, EcsResult};

const DEFAULT_PAGE_SIZE: usize = 10;
const ARN_PREFIX: &str = "arn:aws:ecs:us-east-1:012345678910";

/// The operations a [`MemoryCluster`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListServices,
    DeleteService,
    RegisterTaskDefinition,
    CreateService,
    UpdateService,
    ListTasks,
    DescribeTasks,
    StopTask,
    RunTask,
}

/// A call received by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListServices { next_token: Option<String> },
    DeleteService { service: String },
    RegisterTaskDefinition { family: String },
    CreateService { service: String, task_definition: String, desired_count: u32 },
    UpdateService { service: String, desired_count: u32 },
    ListTasks { service: String },
    DescribeTasks { tasks: usize },
    StopTask { task: String },
    RunTask { task_definition: String, count: u32 },
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::ListServices { .. } => Operation::ListServices,
            Call::DeleteService { .. } => Operation::DeleteService,
            Call::RegisterTaskDefinition { .. } => Operation::RegisterTaskDefinition,
            Call::CreateService { .. } => Operation::CreateService,
            Call::UpdateService { .. } => Operation::UpdateService,
            Call::ListTasks { .. } => Operation::ListTasks,
            Call::DescribeTasks { .. } => Operation::DescribeTasks,
            Call::StopTask { .. } => Operation::StopTask,
            Call::RunTask { .. } => Operation::RunTask,
        }
    }
}

/// A service as stored by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub task_definition: String,
    pub desired_count: u32,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
struct TaskRecord {
    cluster: String,
    /// Owning service, `None` for one-off tasks.
    service: Option<String>,
    status: &'static str,
}

#[derive(Debug)]
struct Failure {
    operation: Operation,
    /// Only fail when the call targets this service / family / task.
    target: Option<String>,
    message: String,
}

#[derive(Debug, Default)]
struct ClusterState {
    /// (cluster, service name) → service.
    services: BTreeMap<(String, String), ServiceRecord>,
    /// family → latest revision.
    revisions: HashMap<String, u32>,
    /// `family:revision` → definition.
    definitions: BTreeMap<String, RegisterTaskDefinitionInput>,
    /// task arn → task.
    tasks: BTreeMap<String, TaskRecord>,
    next_task: u64,
    calls: Vec<Call>,
    failures: Vec<Failure>,
}

impl ClusterState {
    /// Consume a matching one-shot failure, if one was injected.
    fn check(&mut self, operation: Operation, target: &str, name: &'static str) -> EcsResult<()> {
        let hit = self.failures.iter().position(|f| {
            f.operation == operation && f.target.as_deref().is_none_or(|t| t == target)
        });
        match hit {
            Some(i) => {
                let failure = self.failures.remove(i);
                Err(EcsError::api(name, failure.message))
            }
            None => Ok(()),
        }
    }

    fn spawn_task(&mut self, cluster: &str, service: Option<&str>) -> String {
        self.next_task += 1;
        let n = self.next_task;
        let arn = format!(
            "{ARN_PREFIX}:task/{cluster}/{:08x}-0000-4000-8000-{:012x}",
            n, n
        );
        self.tasks.insert(
            arn.clone(),
            TaskRecord {
                cluster: cluster.to_string(),
                service: service.map(str::to_string),
                status: "RUNNING",
            },
        );
        arn
    }

    fn live_tasks(&self, cluster: &str, service: &str) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|(_, t)| {
                t.cluster == cluster
                    && t.service.as_deref() == Some(service)
                    && t.status != "STOPPED"
            })
            .map(|(arn, _)| arn.clone())
            .collect()
    }

    /// Start or stop tasks until the service runs its desired count.
    fn reconcile(&mut self, cluster: &str, service: &str) {
        let Some(record) = self
            .services
            .get(&(cluster.to_string(), service.to_string()))
            .cloned()
        else {
            return;
        };

        let live = self.live_tasks(cluster, service);
        let desired = record.desired_count as usize;
        if live.len() < desired {
            for _ in live.len()..desired {
                self.spawn_task(cluster, Some(service));
            }
        } else {
            for arn in &live[desired..] {
                if let Some(task) = self.tasks.get_mut(arn) {
                    task.status = "STOPPED";
                }
            }
        }
        debug!(%cluster, %service, from = live.len(), to = desired, "service reconciled");
    }

    /// Resolve a task given by ARN or bare id.
    fn find_task(&self, cluster: &str, task: &str) -> Option<String> {
        if self.tasks.contains_key(task) {
            return Some(task.to_string());
        }
        self.tasks
            .iter()
            .find(|(task_arn, t)| {
                t.cluster == cluster && arn::resource_id(task_arn).ok() == Some(task)
            })
            .map(|(task_arn, _)| task_arn.clone())
    }
}

/// An in-memory ECS cluster implementing [`EcsClient`].
pub struct MemoryCluster {
    state: Mutex<ClusterState>,
    page_size: usize,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a cluster that returns at most `page_size` services per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(ClusterState::default()),
            page_size: page_size.max(1),
        }
    }

    /// Make the next call of `operation` fail. With a `target`, only a call
    /// for that service name, task definition family or task fails. A
    /// `DescribeTasks` call targets the service owning its first task, or
    /// that task's ARN for one-off tasks.
    pub async fn fail_next(&self, operation: Operation, target: Option<&str>, message: &str) {
        self.state.lock().await.failures.push(Failure {
            operation,
            target: target.map(str::to_string),
            message: message.to_string(),
        });
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    /// Calls of one operation.
    pub async fn calls_of(&self, operation: Operation) -> Vec<Call> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| c.operation() == operation)
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn service(&self, cluster: &str, name: &str) -> Option<ServiceRecord> {
        self.state
            .lock()
            .await
            .services
            .get(&(cluster.to_string(), name.to_string()))
            .cloned()
    }

    /// Names of all services in a cluster.
    pub async fn service_names(&self, cluster: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .services
            .keys()
            .filter(|(c, _)| c == cluster)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// All registered task definitions, keyed by `family:revision`.
    pub async fn task_definitions(&self) -> BTreeMap<String, RegisterTaskDefinitionInput> {
        self.state.lock().await.definitions.clone()
    }

    /// Number of tasks not yet stopped, across all clusters.
    pub async fn live_task_count(&self) -> usize {
        self.state
            .lock()
            .await
            .tasks
            .values()
            .filter(|t| t.status != "STOPPED")
            .count()
    }
}

#[async_trait]
impl EcsClient for MemoryCluster {
    async fn list_services(&self, input: &ListServicesInput) -> EcsResult<ServicePage> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::ListServices {
            next_token: input.next_token.clone(),
        });
        state.check(Operation::ListServices, &input.cluster, "ListServices")?;

        let offset = match &input.next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| EcsError::api("ListServices", format!("invalid next token {token}")))?,
            None => 0,
        };

        let names: Vec<&String> = state
            .services
            .keys()
            .filter(|(c, _)| c == &input.cluster)
            .map(|(_, name)| name)
            .collect();
        let end = (offset + self.page_size).min(names.len());
        let service_arns = names
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|name| Some(format!("{ARN_PREFIX}:service/{}/{name}", input.cluster)))
            .collect();
        let next_token = (end < names.len()).then(|| end.to_string());

        Ok(ServicePage {
            service_arns,
            next_token,
        })
    }

    async fn delete_service(&self, cluster: &str, service: &str) -> EcsResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::DeleteService {
            service: service.to_string(),
        });
        state.check(Operation::DeleteService, service, "DeleteService")?;

        if state
            .services
            .remove(&(cluster.to_string(), service.to_string()))
            .is_none()
        {
            return Err(EcsError::api("DeleteService", format!("service not found: {service}")));
        }
        for task in state.tasks.values_mut() {
            if task.cluster == cluster && task.service.as_deref() == Some(service) {
                task.status = "STOPPED";
            }
        }
        Ok(())
    }

    async fn register_task_definition(
        &self,
        input: &RegisterTaskDefinitionInput,
    ) -> EcsResult<TaskDefinitionRef> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::RegisterTaskDefinition {
            family: input.family.clone(),
        });
        state.check(Operation::RegisterTaskDefinition, &input.family, "RegisterTaskDefinition")?;

        let revision = state.revisions.entry(input.family.clone()).or_insert(0);
        *revision += 1;
        let registered = TaskDefinitionRef {
            family: input.family.clone(),
            revision: *revision,
        };
        state.definitions.insert(registered.to_string(), input.clone());
        Ok(registered)
    }

    async fn create_service(&self, input: &CreateServiceInput) -> EcsResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::CreateService {
            service: input.service_name.clone(),
            task_definition: input.task_definition.clone(),
            desired_count: input.desired_count,
        });
        state.check(Operation::CreateService, &input.service_name, "CreateService")?;

        if !state.definitions.contains_key(&input.task_definition) {
            return Err(EcsError::api(
                "CreateService",
                format!("unknown task definition: {}", input.task_definition),
            ));
        }
        let key = (input.cluster.clone(), input.service_name.clone());
        if state.services.contains_key(&key) {
            return Err(EcsError::api(
                "CreateService",
                format!("service already exists: {}", input.service_name),
            ));
        }
        state.services.insert(
            key,
            ServiceRecord {
                name: input.service_name.clone(),
                task_definition: input.task_definition.clone(),
                desired_count: input.desired_count,
                role: input.role.clone(),
            },
        );
        state.reconcile(&input.cluster, &input.service_name);
        Ok(())
    }

    async fn update_service(&self, input: &UpdateServiceInput) -> EcsResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::UpdateService {
            service: input.service.clone(),
            desired_count: input.desired_count,
        });
        state.check(Operation::UpdateService, &input.service, "UpdateService")?;

        let key = (input.cluster.clone(), input.service.clone());
        let Some(record) = state.services.get_mut(&key) else {
            return Err(EcsError::api(
                "UpdateService",
                format!("service not found: {}", input.service),
            ));
        };
        record.desired_count = input.desired_count;
        state.reconcile(&input.cluster, &input.service);
        Ok(())
    }

    async fn list_tasks(&self, cluster: &str, service: &str) -> EcsResult<Vec<String>> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::ListTasks {
            service: service.to_string(),
        });
        state.check(Operation::ListTasks, service, "ListTasks")?;
        Ok(state.live_tasks(cluster, service))
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> EcsResult<Vec<DescribedTask>> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::DescribeTasks {
            tasks: task_arns.len(),
        });
        let target = task_arns
            .first()
            .map(|first| {
                state
                    .tasks
                    .get(first)
                    .and_then(|t| t.service.clone())
                    .unwrap_or_else(|| first.clone())
            })
            .unwrap_or_default();
        state.check(Operation::DescribeTasks, &target, "DescribeTasks")?;

        Ok(task_arns
            .iter()
            .filter_map(|arn| {
                let task = state.tasks.get(arn)?;
                (task.cluster == cluster).then(|| DescribedTask {
                    task_arn: arn.clone(),
                    last_status: task.status.to_string(),
                })
            })
            .collect())
    }

    async fn stop_task(&self, cluster: &str, task: &str) -> EcsResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::StopTask {
            task: task.to_string(),
        });
        state.check(Operation::StopTask, task, "StopTask")?;

        let Some(arn) = state.find_task(cluster, task) else {
            return Err(EcsError::api("StopTask", format!("task not found: {task}")));
        };
        let service = match state.tasks.get_mut(&arn) {
            Some(record) => {
                record.status = "STOPPED";
                record.service.clone()
            }
            None => None,
        };
        // Services replace stopped tasks.
        if let Some(service) = service {
            state.reconcile(cluster, &service);
        }
        Ok(())
    }

    async fn run_task(&self, input: &RunTaskInput) -> EcsResult<Vec<String>> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::RunTask {
            task_definition: input.task_definition.clone(),
            count: input.count,
        });
        state.check(Operation::RunTask, &input.task_definition, "RunTask")?;

        if !state.definitions.contains_key(&input.task_definition) {
            return Err(EcsError::api(
                "RunTask",
                format!("unknown task definition: {}", input.task_definition),
            ));
        }
        Ok((0..input.count)
            .map(|_| state.spawn_task(&input.cluster, None))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn register(cluster: &MemoryCluster, family: &str) -> String {
        cluster
            .register_task_definition(&RegisterTaskDefinitionInput {
                family: family.to_string(),
                container_definitions: Vec::new(),
            })
            .await
            .unwrap()
            .to_string()
    }

    async fn create(cluster: &MemoryCluster, name: &str, desired: u32) {
        let task_definition = register(cluster, name).await;
        cluster
            .create_service(&CreateServiceInput {
                cluster: "default".to_string(),
                service_name: name.to_string(),
                task_definition,
                desired_count: desired,
                role: None,
            })
            .await
            .unwrap();
    }

    fn list(next_token: Option<String>) -> ListServicesInput {
        ListServicesInput {
            cluster: "default".to_string(),
            next_token,
        }
    }

    #[tokio::test]
    async fn revisions_increment_per_family() {
        let cluster = MemoryCluster::new();
        assert_eq!(register(&cluster, "acme--web").await, "acme--web:1");
        assert_eq!(register(&cluster, "acme--web").await, "acme--web:2");
        assert_eq!(register(&cluster, "acme--worker").await, "acme--worker:1");
        assert_eq!(cluster.task_definitions().await.len(), 3);
    }

    #[tokio::test]
    async fn listing_is_paginated() {
        let cluster = MemoryCluster::with_page_size(2);
        for name in ["a--web", "b--web", "c--web"] {
            create(&cluster, name, 0).await;
        }

        let first = cluster.list_services(&list(None)).await.unwrap();
        assert_eq!(first.service_arns.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let second = cluster.list_services(&list(first.next_token)).await.unwrap();
        assert_eq!(second.service_arns.len(), 1);
        assert!(second.next_token.is_none());
        assert_eq!(
            second.service_arns[0].as_deref(),
            Some("arn:aws:ecs:us-east-1:012345678910:service/default/c--web")
        );
    }

    #[tokio::test]
    async fn desired_count_drives_tasks() {
        let cluster = MemoryCluster::new();
        create(&cluster, "acme--web", 3).await;
        assert_eq!(cluster.list_tasks("default", "acme--web").await.unwrap().len(), 3);

        cluster
            .update_service(&UpdateServiceInput {
                cluster: "default".to_string(),
                service: "acme--web".to_string(),
                desired_count: 1,
            })
            .await
            .unwrap();
        assert_eq!(cluster.list_tasks("default", "acme--web").await.unwrap().len(), 1);
        assert_eq!(cluster.live_task_count().await, 1);
    }

    #[tokio::test]
    async fn stopped_service_tasks_are_replaced() {
        let cluster = MemoryCluster::new();
        create(&cluster, "acme--web", 1).await;
        let before = cluster.list_tasks("default", "acme--web").await.unwrap();
        let id = arn::resource_id(&before[0]).unwrap().to_string();

        cluster.stop_task("default", &id).await.unwrap();

        let after = cluster.list_tasks("default", "acme--web").await.unwrap();
        assert_eq!(after.len(), 1);
        assert_ne!(after, before);
    }

    #[tokio::test]
    async fn create_existing_service_fails() {
        let cluster = MemoryCluster::new();
        create(&cluster, "acme--web", 1).await;

        let task_definition = register(&cluster, "acme--web").await;
        let err = cluster
            .create_service(&CreateServiceInput {
                cluster: "default".to_string(),
                service_name: "acme--web".to_string(),
                task_definition,
                desired_count: 1,
                role: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn delete_missing_service_fails() {
        let cluster = MemoryCluster::new();
        assert!(cluster.delete_service("default", "acme--web").await.is_err());
    }

    #[tokio::test]
    async fn injected_failure_fires_once_for_its_target() {
        let cluster = MemoryCluster::new();
        cluster
            .fail_next(Operation::RegisterTaskDefinition, Some("acme--worker"), "throttled")
            .await;

        register(&cluster, "acme--web").await;
        let input = RegisterTaskDefinitionInput {
            family: "acme--worker".to_string(),
            container_definitions: Vec::new(),
        };
        let err = cluster.register_task_definition(&input).await.unwrap_err();
        assert_eq!(err.to_string(), "RegisterTaskDefinition: throttled");
        assert!(cluster.register_task_definition(&input).await.is_ok());
        assert_eq!(cluster.calls_of(Operation::RegisterTaskDefinition).await.len(), 3);
    }

    #[tokio::test]
    async fn run_task_starts_one_off_tasks() {
        let cluster = MemoryCluster::new();
        let task_definition = register(&cluster, "acme--migrate").await;
        let arns = cluster
            .run_task(&RunTaskInput {
                cluster: "default".to_string(),
                task_definition,
                count: 2,
                started_by: Some("acme".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(arns.len(), 2);

        let described = cluster.describe_tasks("default", &arns).await.unwrap();
        assert!(described.iter().all(|t| t.last_status == "RUNNING"));
        assert!(cluster.service_names("default").await.is_empty());
    }

    #[tokio::test]
    async fn describe_failure_targets_owning_service() {
        let cluster = MemoryCluster::new();
        create(&cluster, "acme--web", 1).await;
        create(&cluster, "acme--worker", 1).await;
        cluster
            .fail_next(Operation::DescribeTasks, Some("acme--worker"), "boom")
            .await;

        let web = cluster.list_tasks("default", "acme--web").await.unwrap();
        assert!(cluster.describe_tasks("default", &web).await.is_ok());

        let worker = cluster.list_tasks("default", "acme--worker").await.unwrap();
        let err = cluster.describe_tasks("default", &worker).await.unwrap_err();
        assert_eq!(err.to_string(), "DescribeTasks: boom");
        assert!(cluster.describe_tasks("default", &worker).await.is_ok());
    }
}
