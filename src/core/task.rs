//! Synchronous and background execution of rate resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, error, info};

use super::asset::CurrencyIdentifier;
use super::engine::RateEngine;
use super::error::{ResolveError, TaskError};
use super::rate::ResolutionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "outcome", rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Completed(ResolutionResult),
    Failed(String),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sync,
    Async,
}

impl ExecutionMode {
    pub fn from_async_flag(async_query: bool) -> Self {
        if async_query {
            ExecutionMode::Async
        } else {
            ExecutionMode::Sync
        }
    }
}

/// Caller-visible handle of a dispatched resolution.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    state: watch::Receiver<TaskState>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state.borrow().clone()
    }

    /// Waits until the task reaches a terminal state.
    pub async fn wait(&mut self) -> TaskState {
        let terminal = self
            .state
            .wait_for(TaskState::is_terminal)
            .await
            .map(|state| state.clone());
        // The writer is only dropped after publishing, so the last value is terminal.
        terminal.unwrap_or_else(|_| self.state.borrow().clone())
    }
}

/// Outcome of a query in either execution mode.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Result(ResolutionResult),
    Task(TaskHandle),
}

/// Runs the engine inline or on background workers, tracking dispatched tasks.
pub struct TaskExecutor {
    engine: Arc<RateEngine>,
    workers: Arc<Semaphore>,
    tasks: Mutex<HashMap<TaskId, watch::Receiver<TaskState>>>,
    next_id: AtomicU64,
}

impl TaskExecutor {
    pub fn new(engine: Arc<RateEngine>, workers: usize) -> Self {
        Self {
            engine,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn engine(&self) -> &Arc<RateEngine> {
        &self.engine
    }

    /// Single entry point of the query interface.
    pub async fn query(
        &self,
        identifiers: Vec<CurrencyIdentifier>,
        mode: ExecutionMode,
    ) -> Result<QueryOutcome, ResolveError> {
        match mode {
            ExecutionMode::Sync => self.run_sync(&identifiers).await.map(QueryOutcome::Result),
            ExecutionMode::Async => self.dispatch(identifiers).map(QueryOutcome::Task),
        }
    }

    pub async fn run_sync(
        &self,
        identifiers: &[CurrencyIdentifier],
    ) -> Result<ResolutionResult, ResolveError> {
        self.engine.resolve(identifiers).await
    }

    /// Schedules a resolution on a worker and returns immediately.
    ///
    /// Contract violations are reported here, before any task is created.
    /// Must be called from within a Tokio runtime, otherwise
    /// [`ResolveError::NoRuntime`] is returned and nothing is scheduled.
    pub fn dispatch(
        &self,
        identifiers: Vec<CurrencyIdentifier>,
    ) -> Result<TaskHandle, ResolveError> {
        RateEngine::validate(&identifiers)?;
        let runtime = Handle::try_current().map_err(|_| ResolveError::NoRuntime)?;

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = watch::channel(TaskState::Pending);
        self.tasks_guard().insert(id, rx.clone());

        let engine = Arc::clone(&self.engine);
        let workers = Arc::clone(&self.workers);
        runtime.spawn(async move {
            let worker = tokio::spawn(async move {
                // The semaphore is never closed.
                let _permit = workers.acquire_owned().await.ok();
                engine.resolve(&identifiers).await
            });

            let state = match worker.await {
                Ok(Ok(result)) => TaskState::Completed(result),
                Ok(Err(e)) => TaskState::Failed(e.to_string()),
                Err(join_error) => {
                    error!(task = %id, error = %join_error, "Worker crashed");
                    TaskState::Failed(format!("worker crashed: {join_error}"))
                }
            };
            debug!(task = %id, ?state, "Task finished");
            tx.send_replace(state);
        });

        info!(task = %id, "Dispatched rate query");
        Ok(TaskHandle { id, state: rx })
    }

    /// Non-blocking read of a task's state.
    pub fn status(&self, id: TaskId) -> Result<TaskState, TaskError> {
        self.tasks_guard()
            .get(&id)
            .map(|rx| rx.borrow().clone())
            .ok_or(TaskError::UnknownTask(id))
    }

    pub fn handle(&self, id: TaskId) -> Result<TaskHandle, TaskError> {
        self.tasks_guard()
            .get(&id)
            .map(|rx| TaskHandle {
                id,
                state: rx.clone(),
            })
            .ok_or(TaskError::UnknownTask(id))
    }

    pub async fn wait(&self, id: TaskId) -> Result<TaskState, TaskError> {
        let mut handle = self.handle(id)?;
        Ok(handle.wait().await)
    }

    /// Returns a finished task's state and forgets the task.
    ///
    /// Pending tasks are left in place and reported as pending.
    pub fn take(&self, id: TaskId) -> Result<TaskState, TaskError> {
        let mut tasks = self.tasks_guard();
        let state = tasks
            .get(&id)
            .map(|rx| rx.borrow().clone())
            .ok_or(TaskError::UnknownTask(id))?;
        if state.is_terminal() {
            tasks.remove(&id);
        }
        Ok(state)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks_guard()
            .values()
            .filter(|rx| !rx.borrow().is_terminal())
            .count()
    }

    fn tasks_guard(&self) -> MutexGuard<'_, HashMap<TaskId, watch::Receiver<TaskState>>> {
        // A poisoned map is still structurally valid.
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::{Asset, AssetKind, AssetRegistry};
    use crate::core::cache::RateCache;
    use crate::core::error::OracleError;
    use crate::core::oracle::tests::MockOracle;
    use crate::core::oracle::{OracleChain, RateOracle};
    use async_trait::async_trait;
    use std::time::Duration;

    struct PanickingOracle;

    #[async_trait]
    impl RateOracle for PanickingOracle {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn query(&self, _asset: &Asset, _reference: &Asset) -> Result<f64, OracleError> {
            panic!("oracle blew up");
        }
    }

    fn executor_with(oracle: Arc<dyn RateOracle>, workers: usize) -> TaskExecutor {
        let engine = RateEngine::new(
            Arc::new(AssetRegistry::new()),
            RateCache::new(Duration::from_secs(60)),
            OracleChain::new(vec![oracle], Duration::from_secs(1)),
            Asset::new("USD", "United States Dollar", AssetKind::Fiat),
        );
        TaskExecutor::new(Arc::new(engine), workers)
    }

    fn mock() -> Arc<MockOracle> {
        Arc::new(
            MockOracle::new("mock")
                .with_rate("EUR", 1.08)
                .with_rate("KRW", 0.00073)
                .with_rate("ETH", 3150.5),
        )
    }

    fn ids(values: &[&str]) -> Vec<CurrencyIdentifier> {
        values.iter().map(|v| CurrencyIdentifier::from(*v)).collect()
    }

    #[tokio::test]
    async fn test_async_result_matches_sync_result() {
        let sync_executor = executor_with(mock(), 2);
        let async_executor = executor_with(mock(), 2);
        let request = ids(&["EUR", "USD", "KRW", "ETH"]);

        let expected = sync_executor.run_sync(&request).await.unwrap();

        let mut handle = async_executor.dispatch(request).unwrap();
        let state = handle.wait().await;

        assert_eq!(state, TaskState::Completed(expected));
        assert_eq!(async_executor.status(handle.id()).unwrap(), state);
    }

    #[tokio::test]
    async fn test_empty_request_fails_in_both_modes() {
        let executor = executor_with(mock(), 1);

        for mode in [ExecutionMode::Sync, ExecutionMode::Async] {
            let err = executor.query(vec![], mode).await.unwrap_err();
            assert_eq!(err, ResolveError::EmptyRequest);
        }
        assert_eq!(executor.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_async_dispatch_rejects_non_string_before_scheduling() {
        let executor = executor_with(mock(), 1);
        let request = vec![CurrencyIdentifier::from(serde_json::json!(4234324.21))];

        let err = executor.query(request, ExecutionMode::Async).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidIdentifierType { .. }));
        assert!(executor.handle(TaskId(1)).is_err());
    }

    #[tokio::test]
    async fn test_worker_crash_is_recorded_as_failure() {
        let executor = executor_with(Arc::new(PanickingOracle), 1);

        let handle = executor.dispatch(ids(&["EUR"])).unwrap();
        let state = executor.wait(handle.id()).await.unwrap();

        match state {
            TaskState::Failed(message) => assert!(message.contains("worker crashed")),
            other => panic!("Expected failed state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_take_releases_finished_tasks_only() {
        let slow = Arc::new(
            MockOracle::new("slow")
                .with_rate("EUR", 1.08)
                .with_delay(Duration::from_millis(200)),
        );
        let executor = executor_with(slow, 1);

        let handle = executor.dispatch(ids(&["EUR"])).unwrap();
        assert_eq!(executor.take(handle.id()).unwrap(), TaskState::Pending);
        assert_eq!(executor.pending_count(), 1);

        let state = executor.wait(handle.id()).await.unwrap();
        assert!(state.is_terminal());

        // Terminal states are stable across reads
        assert_eq!(executor.status(handle.id()).unwrap(), state);
        assert_eq!(executor.take(handle.id()).unwrap(), state);
        assert_eq!(
            executor.status(handle.id()),
            Err(TaskError::UnknownTask(handle.id()))
        );
    }

    #[tokio::test]
    async fn test_sync_query_returns_result_directly() {
        let executor = executor_with(mock(), 1);

        let outcome = executor
            .query(ids(&["DDSAS", "EUR"]), ExecutionMode::Sync)
            .await
            .unwrap();

        match outcome {
            QueryOutcome::Result(result) => {
                assert_eq!(result.len(), 1);
                assert!(result.contains_key("EUR"));
            }
            QueryOutcome::Task(_) => panic!("Expected an inline result"),
        }
    }

    #[test]
    fn test_dispatch_outside_runtime_is_an_error() {
        let oracle = mock();
        let executor = executor_with(oracle.clone(), 1);

        let err = executor.dispatch(ids(&["EUR"])).unwrap_err();

        assert_eq!(err, ResolveError::NoRuntime);
        assert_eq!(executor.pending_count(), 0);
        assert!(executor.handle(TaskId(1)).is_err());
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_task_ids_are_unique() {
        let executor = executor_with(mock(), 4);
        let a = executor.dispatch(ids(&["EUR"])).unwrap();
        let b = executor.dispatch(ids(&["ETH"])).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
