//! Scheduled task workers
//!
//! Workers are independent maintenance jobs invoked by an external timer
//! loop. The contract at the invocation boundary: `None` means success, and
//! any failure (a returned error or a panic) becomes a non-empty message
//! string. Nothing crosses the boundary as a panic, so one failing worker
//! never takes the timer loop down.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};
use crate::provider::DataStore;
use crate::staging::StagingLog;

/// Descriptor of one scheduled task instance
#[derive(Debug, Clone)]
pub struct TaskInfo {
    /// Task name, also used in logs
    pub name: String,
    /// Worker-specific payload
    pub data: String,
    /// When the task last ran, if ever
    pub last_run: Option<DateTime<Utc>>,
    /// Error message of the last failed run
    pub last_error: Option<String>,
}

impl TaskInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: String::new(),
            last_run: None,
            last_error: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }
}

/// One schedulable job
#[async_trait]
pub trait TaskWorker: Send + Sync {
    /// Short worker name for logs and error messages
    fn name(&self) -> &str;

    /// Run to completion; errors are reported, never propagated further
    async fn run(&self, task: &TaskInfo) -> Result<()>;
}

/// Invoke a worker on behalf of the timer loop.
///
/// Returns `None` on success. Errors and panics both resolve to a non-empty
/// message recorded against the task run.
pub async fn execute_worker(worker: Arc<dyn TaskWorker>, task: TaskInfo) -> Option<String> {
    let name = worker.name().to_string();
    let task_name = task.name.clone();

    let handle = tokio::spawn(async move { worker.run(&task).await });
    match handle.await {
        Ok(Ok(())) => {
            tracing::debug!(worker = %name, task = %task_name, "worker completed");
            None
        }
        Ok(Err(e)) => {
            let message = e.to_string();
            let message = if message.is_empty() {
                format!("worker '{}' failed", name)
            } else {
                message
            };
            tracing::warn!(worker = %name, task = %task_name, error = %message, "worker failed");
            Some(message)
        }
        Err(join_error) => {
            let message = format!("worker '{}' panicked: {}", name, join_error);
            tracing::error!(worker = %name, task = %task_name, "worker panicked");
            Some(message)
        }
    }
}

/// Evicts provider-cache entries older than the configured maximum age
pub struct CacheCleanupWorker {
    store: DataStore,
    max_age: Duration,
}

impl CacheCleanupWorker {
    /// Use the store's configured cache max age
    pub fn new(store: DataStore) -> Self {
        let max_age = store.config().cache_max_age;
        Self { store, max_age }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

#[async_trait]
impl TaskWorker for CacheCleanupWorker {
    fn name(&self) -> &str {
        "cache.cleanup"
    }

    async fn run(&self, _task: &TaskInfo) -> Result<()> {
        let evicted = self.store.evict_stale_caches(self.max_age);
        tracing::debug!(evicted, "cache cleanup finished");
        Ok(())
    }
}

/// Deletes staging tasks older than a retention window
pub struct StagingPurgeWorker {
    staging: StagingLog,
    retention: Duration,
}

impl StagingPurgeWorker {
    pub fn new(staging: StagingLog, retention: Duration) -> Self {
        Self { staging, retention }
    }
}

#[async_trait]
impl TaskWorker for StagingPurgeWorker {
    fn name(&self) -> &str {
        "staging.purge"
    }

    async fn run(&self, _task: &TaskInfo) -> Result<()> {
        let retention = chrono::Duration::from_std(self.retention)
            .map_err(|e| StoreError::validation(format!("Invalid retention window: {}", e)))?;
        let cutoff = Utc::now() - retention;
        let removed = self.staging.purge_before(cutoff).await?;
        tracing::debug!(removed, "staging purge finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OkWorker;

    #[async_trait]
    impl TaskWorker for OkWorker {
        fn name(&self) -> &str {
            "test.ok"
        }

        async fn run(&self, _task: &TaskInfo) -> Result<()> {
            Ok(())
        }
    }

    struct FailingWorker;

    #[async_trait]
    impl TaskWorker for FailingWorker {
        fn name(&self) -> &str {
            "test.failing"
        }

        async fn run(&self, _task: &TaskInfo) -> Result<()> {
            Err(StoreError::Connection("database unreachable".into()))
        }
    }

    struct PanickingWorker;

    #[async_trait]
    impl TaskWorker for PanickingWorker {
        fn name(&self) -> &str {
            "test.panicking"
        }

        async fn run(&self, _task: &TaskInfo) -> Result<()> {
            panic!("worker exploded");
        }
    }

    #[tokio::test]
    async fn test_success_returns_none() {
        let result = execute_worker(Arc::new(OkWorker), TaskInfo::new("nightly")).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_error_becomes_message() {
        let result = execute_worker(Arc::new(FailingWorker), TaskInfo::new("nightly")).await;
        let message = result.unwrap();
        assert!(!message.is_empty());
        assert!(message.contains("database unreachable"));
    }

    #[tokio::test]
    async fn test_panic_becomes_message() {
        let result = execute_worker(Arc::new(PanickingWorker), TaskInfo::new("nightly")).await;
        let message = result.unwrap();
        assert!(message.contains("panicked"));
        assert!(message.contains("test.panicking"));
    }

    #[test]
    fn test_task_info_builder() {
        let task = TaskInfo::new("staging.purge").with_data("30d");
        assert_eq!(task.name, "staging.purge");
        assert_eq!(task.data, "30d");
        assert!(task.last_run.is_none());
        assert!(task.last_error.is_none());
    }
}
