//! The scheduler contract.
//!
//! A backend implements [`Scheduler`] (run, scale, remove, list and stop
//! tasks). Operations a backend may not be able to support, like attached
//! processes or restarts, are separate capability traits. Callers discover
//! them through query methods like [`Scheduler::restarter`] instead of
//! every backend having to stub them out.

use async_trait::async_trait;

use crate::error::SchedulerResult;
use crate::types::{App, Process, Task};

/// Runs a twelve-factor application.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Create or update the backend resources for every process of `app`.
    async fn run(&self, app: &App) -> SchedulerResult<()>;
}

/// Scales a single process of an app.
#[async_trait]
pub trait Scaler: Send + Sync {
    async fn scale_process(&self, app_id: &str, process: &str, desired: u32)
    -> SchedulerResult<()>;
}

/// Removes an app and all of its processes.
#[async_trait]
pub trait Remover: Send + Sync {
    async fn remove(&self, app_id: &str) -> SchedulerResult<()>;
}

/// Runs one-off processes, e.g. a console (attached) or a migration
/// (detached). Attached vs detached is determined from the process stdout.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run_process(&self, app: &App, process: &Process) -> SchedulerResult<()>;
}

/// Restarts every process of an app.
#[async_trait]
pub trait Restarter: Send + Sync {
    async fn restart(&self, app_id: &str) -> SchedulerResult<()>;
}

/// Restarts a single process of an app.
#[async_trait]
pub trait ProcessRestarter: Send + Sync {
    async fn restart_process(&self, app_id: &str, process: &str) -> SchedulerResult<()>;
}

/// Runs twelve-factor applications on an orchestration backend.
#[async_trait]
pub trait Scheduler: Runner + Scaler + Remover {
    /// Running and pending tasks for the app.
    async fn tasks(&self, app_id: &str) -> SchedulerResult<Vec<Task>>;

    /// Stop an individual task.
    async fn stop_task(&self, task_id: &str) -> SchedulerResult<()>;

    fn process_runner(&self) -> Option<&dyn ProcessRunner> {
        None
    }

    fn restarter(&self) -> Option<&dyn Restarter> {
        None
    }

    fn process_restarter(&self) -> Option<&dyn ProcessRestarter> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    #[async_trait]
    impl Runner for Bare {
        async fn run(&self, _app: &App) -> SchedulerResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Scaler for Bare {
        async fn scale_process(&self, _: &str, _: &str, _: u32) -> SchedulerResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Remover for Bare {
        async fn remove(&self, _: &str) -> SchedulerResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Scheduler for Bare {
        async fn tasks(&self, _: &str) -> SchedulerResult<Vec<Task>> {
            Ok(Vec::new())
        }

        async fn stop_task(&self, _: &str) -> SchedulerResult<()> {
            Ok(())
        }
    }

    #[test]
    fn capabilities_default_to_unsupported() {
        let scheduler: &dyn Scheduler = &Bare;
        assert!(scheduler.process_runner().is_none());
        assert!(scheduler.restarter().is_none());
        assert!(scheduler.process_restarter().is_none());
    }
}
