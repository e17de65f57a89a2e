//! Per-app serialization for any [`Scheduler`].
//!
//! Schedulers do not coordinate calls against each other: a `remove` racing
//! a `run` for the same app can delete what `run` just created.
//! [`Serialized`] wraps a scheduler and holds one async mutex per app id so
//! that mutating calls for the same app run one at a time. Calls for
//! different apps still proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{SchedulerError, SchedulerResult};
use crate::scheduler::*;
use crate::types::{App, Task};

/// A scheduler whose run/scale/remove/restart calls are serialized per app.
pub struct Serialized<S> {
    inner: S,
    /// app id → lock. An entry lives while a call holds or awaits it.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: Scheduler> Serialized<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped scheduler.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of apps with a call holding or awaiting their lock.
    pub async fn tracked_apps(&self) -> usize {
        self.locks.lock().await.len()
    }

    async fn lock(&self, app_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(app_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        debug!(app = %app_id, "waiting for app lock");
        lock.lock_owned().await
    }

    /// Release an app lock and forget it when no other call is waiting.
    async fn release(&self, app_id: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.lock().await;
        if locks
            .get(app_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(app_id);
        }
    }
}

#[async_trait]
impl<S: Scheduler> Runner for Serialized<S> {
    async fn run(&self, app: &App) -> SchedulerResult<()> {
        let guard = self.lock(&app.id).await;
        let result = self.inner.run(app).await;
        self.release(&app.id, guard).await;
        result
    }
}

#[async_trait]
impl<S: Scheduler> Scaler for Serialized<S> {
    async fn scale_process(
        &self,
        app_id: &str,
        process: &str,
        desired: u32,
    ) -> SchedulerResult<()> {
        let guard = self.lock(app_id).await;
        let result = self.inner.scale_process(app_id, process, desired).await;
        self.release(app_id, guard).await;
        result
    }
}

#[async_trait]
impl<S: Scheduler> Remover for Serialized<S> {
    async fn remove(&self, app_id: &str) -> SchedulerResult<()> {
        let guard = self.lock(app_id).await;
        let result = self.inner.remove(app_id).await;
        self.release(app_id, guard).await;
        result
    }
}

#[async_trait]
impl<S: Scheduler> Restarter for Serialized<S> {
    async fn restart(&self, app_id: &str) -> SchedulerResult<()> {
        let restarter = self
            .inner
            .restarter()
            .ok_or_else(|| SchedulerError::Unsupported("restart".to_string()))?;
        let guard = self.lock(app_id).await;
        let result = restarter.restart(app_id).await;
        self.release(app_id, guard).await;
        result
    }
}

#[async_trait]
impl<S: Scheduler> ProcessRestarter for Serialized<S> {
    async fn restart_process(&self, app_id: &str, process: &str) -> SchedulerResult<()> {
        let restarter = self
            .inner
            .process_restarter()
            .ok_or_else(|| SchedulerError::Unsupported("process restart".to_string()))?;
        let guard = self.lock(app_id).await;
        let result = restarter.restart_process(app_id, process).await;
        self.release(app_id, guard).await;
        result
    }
}

#[async_trait]
impl<S: Scheduler> Scheduler for Serialized<S> {
    async fn tasks(&self, app_id: &str) -> SchedulerResult<Vec<Task>> {
        self.inner.tasks(app_id).await
    }

    async fn stop_task(&self, task_id: &str) -> SchedulerResult<()> {
        self.inner.stop_task(task_id).await
    }

    fn process_runner(&self) -> Option<&dyn ProcessRunner> {
        self.inner.process_runner()
    }

    fn restarter(&self) -> Option<&dyn Restarter> {
        self.inner.restarter().map(|_| self as &dyn Restarter)
    }

    fn process_restarter(&self) -> Option<&dyn ProcessRestarter> {
        self.inner
            .process_restarter()
            .map(|_| self as &dyn ProcessRestarter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records the peak number of overlapping calls.
    #[derive(Default)]
    struct Overlap {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Overlap {
        async fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Slow {
        overlap: Overlap,
    }

    #[async_trait]
    impl Runner for Slow {
        async fn run(&self, _app: &App) -> SchedulerResult<()> {
            self.overlap.enter().await;
            Ok(())
        }
    }

    #[async_trait]
    impl Scaler for Slow {
        async fn scale_process(&self, _: &str, _: &str, _: u32) -> SchedulerResult<()> {
            self.overlap.enter().await;
            Ok(())
        }
    }

    #[async_trait]
    impl Remover for Slow {
        async fn remove(&self, _: &str) -> SchedulerResult<()> {
            self.overlap.enter().await;
            Ok(())
        }
    }

    #[async_trait]
    impl Scheduler for Slow {
        async fn tasks(&self, _: &str) -> SchedulerResult<Vec<Task>> {
            Ok(Vec::new())
        }

        async fn stop_task(&self, _: &str) -> SchedulerResult<()> {
            Ok(())
        }
    }

    fn app(id: &str) -> App {
        App {
            id: id.to_string(),
            ..App::default()
        }
    }

    #[tokio::test]
    async fn same_app_calls_do_not_overlap() {
        let scheduler = Serialized::new(Slow::default());
        let acme = app("acme");

        let (a, b, c) = tokio::join!(
            scheduler.run(&acme),
            scheduler.remove("acme"),
            scheduler.scale_process("acme", "web", 2),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(scheduler.inner().overlap.peak.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.tracked_apps().await, 0);
    }

    #[tokio::test]
    async fn different_apps_run_concurrently() {
        let scheduler = Serialized::new(Slow::default());
        let (acme, other) = (app("acme"), app("other"));

        let (a, b) = tokio::join!(scheduler.run(&acme), scheduler.run(&other));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(scheduler.inner().overlap.peak.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.tracked_apps().await, 0);
    }

    #[tokio::test]
    async fn app_locks_are_forgotten_once_released() {
        let scheduler = Serialized::new(Slow::default());
        let acme = app("acme");
        let in_flight = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            scheduler.tracked_apps().await
        };

        let (result, tracked) = tokio::join!(scheduler.run(&acme), in_flight);
        result.unwrap();
        assert_eq!(tracked, 1);
        assert_eq!(scheduler.tracked_apps().await, 0);

        scheduler.remove("acme").await.unwrap();
        assert_eq!(scheduler.tracked_apps().await, 0);
    }

    #[tokio::test]
    async fn capabilities_follow_the_inner_scheduler() {
        let scheduler = Serialized::new(Slow::default());
        assert!(scheduler.restarter().is_none());
        assert!(scheduler.process_restarter().is_none());
        assert!(scheduler.process_runner().is_none());

        let err = Restarter::restart(&scheduler, "acme").await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unsupported(_)));
    }
}
