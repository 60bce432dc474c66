//! Call gateway - retrying driver for outbound upstream calls.
//!
//! Every call to a record source or completion service goes through the
//! gateway. It enforces the per-attempt deadline, retries transient
//! failures with exponential backoff, and keeps a task registry that
//! callers poll to watch attempts progress.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::domain::foundation::{TaskId, Timestamp};
use crate::ports::{CallStatus, Retryable, TaskMonitor, TaskMonitorError, TaskSnapshot};

/// Retry and timeout policy for outbound calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed per call, the first try included.
    ///
    /// Default: 3 attempts
    pub max_retries: u32,

    /// Backoff before attempt n+1 is `base_delay * 2^(n-1)`.
    ///
    /// Default: 500ms
    pub base_delay: Duration,

    /// Per-attempt deadline. A timed-out attempt counts as a transient
    /// failure and is retried like one.
    ///
    /// Default: 30 seconds
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Terminal failure of a gateway call.
#[derive(Debug)]
pub enum CallFailure<E> {
    /// The last attempt exceeded the per-attempt deadline.
    Timeout { after: Duration },

    /// The last attempt returned an error: either non-retryable, or
    /// retryable with the attempt budget exhausted.
    Upstream(E),
}

impl<E: fmt::Display> fmt::Display for CallFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFailure::Timeout { after } => {
                write!(f, "timed out after {}ms", after.as_millis())
            }
            CallFailure::Upstream(err) => write!(f, "{}", err),
        }
    }
}

/// Outcome of a driven call, with the registry bookkeeping attached.
#[derive(Debug)]
pub struct CallResult<T, E> {
    /// Registry entry for polling this call.
    pub task_id: TaskId,
    /// Attempts actually made.
    pub attempt_count: u32,
    /// Terminal outcome.
    pub outcome: Result<T, CallFailure<E>>,
}

#[derive(Debug, Clone)]
struct TaskEntry {
    label: String,
    status: CallStatus,
    attempt_count: u32,
    result: Option<serde_json::Value>,
    error: Option<String>,
    submitted_at: Timestamp,
}

/// Drives outbound calls to a terminal outcome under a retry policy.
///
/// The gateway is shared; one instance serves every upstream call of
/// the process, so the task registry gives a single polling surface.
pub struct CallGateway {
    policy: RetryPolicy,
    tasks: RwLock<HashMap<TaskId, TaskEntry>>,
}

impl CallGateway {
    /// Creates a gateway with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the active policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drives one outbound call to a terminal outcome.
    ///
    /// The operation closure receives the attempt number (starting at 1)
    /// and is re-invoked on each retry. Retryable errors and per-attempt
    /// timeouts back off exponentially until the attempt budget runs
    /// out; non-retryable errors end the call immediately.
    pub async fn submit<T, E, F, Fut>(&self, label: &str, operation: F) -> CallResult<T, E>
    where
        T: Serialize,
        E: Retryable + fmt::Display,
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let task_id = TaskId::new();
        self.register(task_id, label).await;

        let mut attempt = 0;
        let failure = loop {
            attempt += 1;
            self.record_attempt(&task_id, attempt).await;

            match tokio::time::timeout(self.policy.call_timeout, operation(attempt)).await {
                Ok(Ok(value)) => {
                    self.record_success(&task_id, serde_json::to_value(&value).ok())
                        .await;
                    tracing::debug!("Call '{}' succeeded on attempt {}", label, attempt);
                    return CallResult {
                        task_id,
                        attempt_count: attempt,
                        outcome: Ok(value),
                    };
                }
                Ok(Err(err)) if err.is_retryable() && attempt < self.policy.max_retries => {
                    tracing::warn!(
                        "Call '{}' attempt {} failed ({}), backing off",
                        label,
                        attempt,
                        err
                    );
                    tokio::time::sleep(self.backoff_delay(attempt)).await;
                }
                Ok(Err(err)) => break CallFailure::Upstream(err),
                Err(_) if attempt < self.policy.max_retries => {
                    tracing::warn!("Call '{}' attempt {} timed out, backing off", label, attempt);
                    tokio::time::sleep(self.backoff_delay(attempt)).await;
                }
                Err(_) => {
                    break CallFailure::Timeout {
                        after: self.policy.call_timeout,
                    }
                }
            }
        };

        self.record_failure(&task_id, failure.to_string()).await;
        tracing::warn!(
            "Call '{}' failed after {} attempt(s): {}",
            label,
            attempt,
            failure
        );
        CallResult {
            task_id,
            attempt_count: attempt,
            outcome: Err(failure),
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.policy.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    async fn register(&self, task_id: TaskId, label: &str) {
        self.tasks.write().await.insert(
            task_id,
            TaskEntry {
                label: label.to_string(),
                status: CallStatus::Pending,
                attempt_count: 0,
                result: None,
                error: None,
                submitted_at: Timestamp::now(),
            },
        );
    }

    async fn record_attempt(&self, task_id: &TaskId, attempt: u32) {
        if let Some(entry) = self.tasks.write().await.get_mut(task_id) {
            entry.attempt_count = attempt;
        }
    }

    async fn record_success(&self, task_id: &TaskId, result: Option<serde_json::Value>) {
        if let Some(entry) = self.tasks.write().await.get_mut(task_id) {
            entry.status = CallStatus::Succeeded;
            entry.result = result;
        }
    }

    async fn record_failure(&self, task_id: &TaskId, error: String) {
        if let Some(entry) = self.tasks.write().await.get_mut(task_id) {
            entry.status = CallStatus::Failed;
            entry.error = Some(error);
        }
    }
}

impl Default for CallGateway {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl TaskMonitor for CallGateway {
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskSnapshot, TaskMonitorError> {
        let tasks = self.tasks.read().await;
        let entry = tasks
            .get(task_id)
            .ok_or(TaskMonitorError::NotFound(*task_id))?;
        Ok(TaskSnapshot {
            task_id: *task_id,
            label: entry.label.clone(),
            status: entry.status,
            attempt_count: entry.attempt_count,
            result: entry.result.clone(),
            error: entry.error.clone(),
            submitted_at: entry.submitted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CompletionError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            call_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn succeeds_first_try_without_retries() {
        let gateway = CallGateway::new(fast_policy(3));

        let result = gateway
            .submit("echo", |_| async { Ok::<_, CompletionError>(42u32) })
            .await;

        assert_eq!(result.attempt_count, 1);
        assert_eq!(result.outcome.unwrap(), 42);

        let snapshot = gateway.task_status(&result.task_id).await.unwrap();
        assert_eq!(snapshot.status, CallStatus::Succeeded);
        assert_eq!(snapshot.attempt_count, 1);
        assert_eq!(snapshot.result, Some(serde_json::json!(42)));
        assert_eq!(snapshot.label, "echo");
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let gateway = CallGateway::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result = gateway
            .submit("flaky", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(CompletionError::unavailable("warming up"))
                    } else {
                        Ok("done".to_string())
                    }
                }
            })
            .await;

        assert_eq!(result.attempt_count, 3);
        assert_eq!(result.outcome.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let snapshot = gateway.task_status(&result.task_id).await.unwrap();
        assert_eq!(snapshot.status, CallStatus::Succeeded);
        assert_eq!(snapshot.attempt_count, 3);
    }

    #[tokio::test]
    async fn non_retryable_error_ends_call_immediately() {
        let gateway = CallGateway::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result: CallResult<u32, _> = gateway
            .submit("strict", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CompletionError::parse("bad json")) }
            })
            .await;

        assert_eq!(result.attempt_count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result.outcome,
            Err(CallFailure::Upstream(CompletionError::Parse(_)))
        ));

        let snapshot = gateway.task_status(&result.task_id).await.unwrap();
        assert_eq!(snapshot.status, CallStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("parse error: bad json"));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_error() {
        let gateway = CallGateway::new(fast_policy(2));
        let calls = AtomicU32::new(0);

        let result: CallResult<u32, _> = gateway
            .submit("down", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CompletionError::unavailable("still down")) }
            })
            .await;

        assert_eq!(result.attempt_count, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            result.outcome,
            Err(CallFailure::Upstream(CompletionError::Unavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn slow_operation_times_out_per_attempt() {
        let gateway = CallGateway::new(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            call_timeout: Duration::from_millis(10),
        });

        let result: CallResult<u32, CompletionError> = gateway
            .submit("slow", |_| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(7)
            })
            .await;

        assert_eq!(result.attempt_count, 2);
        assert!(matches!(
            result.outcome,
            Err(CallFailure::Timeout { .. })
        ));

        let snapshot = gateway.task_status(&result.task_id).await.unwrap();
        assert_eq!(snapshot.status, CallStatus::Failed);
        assert!(snapshot.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn unknown_task_reads_not_found() {
        let gateway = CallGateway::default();
        let missing = TaskId::new();

        let err = gateway.task_status(&missing).await.unwrap_err();
        assert!(matches!(err, TaskMonitorError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn each_submission_gets_its_own_task() {
        let gateway = CallGateway::new(fast_policy(1));

        let a = gateway
            .submit("one", |_| async { Ok::<_, CompletionError>(1u32) })
            .await;
        let b = gateway
            .submit("two", |_| async { Ok::<_, CompletionError>(2u32) })
            .await;

        assert_ne!(a.task_id, b.task_id);
        assert_eq!(gateway.task_status(&a.task_id).await.unwrap().label, "one");
        assert_eq!(gateway.task_status(&b.task_id).await.unwrap().label, "two");
    }
}
