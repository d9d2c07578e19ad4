//! Task processor: claims due tasks and runs their handlers.
//!
//! Lifecycle is `Created -> Running -> Draining -> Stopped`. While running, a
//! single fetch loop draws a weighted random queue order for every claim and
//! takes one task from the first queue with a free slot and a due task. Each
//! claimed task runs on its own tokio task and is settled exactly once: acked
//! on success, rescheduled while it has retries left, archived after that.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bankline_core::task::{
    ProcessorState, QUEUE_CRITICAL, QUEUE_DEFAULT, WeightedScheduler, default_retry_delay,
};
use bankline_shared::WorkerConfig;
use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use rand::{SeedableRng, rngs::StdRng};
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::{Broker, Task};
use crate::error::{ProcessError, ProcessorError};
use crate::mux::{ServeMux, TaskHandler};

/// Delay before the n-th retry (n starts at 1).
pub type RetryDelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Called for every failed task execution.
pub type ErrorHook = Arc<dyn Fn(&TaskFailure) + Send + Sync>;

/// A failed task execution, as seen by the error hook.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    /// Task id.
    pub task_id: Uuid,
    /// Handler routing key.
    pub type_name: String,
    /// Queue the task came from.
    pub queue: String,
    /// Raw payload.
    pub payload: Vec<u8>,
    /// Failures before this one.
    pub retried: i32,
    /// Retry budget.
    pub max_retry: i32,
    /// Rendered handler error.
    pub error: String,
    /// Whether the task was archived instead of rescheduled.
    pub dead_lettered: bool,
}

/// Default error hook: logs the failure.
pub fn log_task_failure(failure: &TaskFailure) {
    error!(
        task_id = %failure.task_id,
        type_name = %failure.type_name,
        queue = %failure.queue,
        payload = %String::from_utf8_lossy(&failure.payload),
        retried = failure.retried,
        max_retry = failure.max_retry,
        dead_lettered = failure.dead_lettered,
        error = %failure.error,
        "process task failed"
    );
}

/// Processor settings.
#[derive(Clone)]
pub struct ProcessorConfig {
    /// Queue name to weight. The weight is also the queue's concurrency.
    pub queues: BTreeMap<String, u32>,
    /// Idle wait between fetch rounds that claimed nothing.
    pub poll_interval: Duration,
    /// Backoff for rescheduled tasks.
    pub retry_delay: RetryDelayFn,
    /// Failure callback.
    pub error_hook: ErrorHook,
}

impl fmt::Debug for ProcessorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorConfig")
            .field("queues", &self.queues)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            queues: BTreeMap::from([
                (QUEUE_CRITICAL.to_string(), 10),
                (QUEUE_DEFAULT.to_string(), 5),
            ]),
            poll_interval: Duration::from_secs(1),
            retry_delay: Arc::new(default_retry_delay),
            error_hook: Arc::new(log_task_failure),
        }
    }
}

impl ProcessorConfig {
    /// Builds a config from the `[worker]` settings.
    #[must_use]
    pub fn from_worker_config(worker: &WorkerConfig) -> Self {
        Self {
            queues: worker.queues.clone(),
            poll_interval: worker.poll_interval(),
            ..Self::default()
        }
    }

    /// Replaces the queue weights.
    #[must_use]
    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        self.queues = queues
            .into_iter()
            .map(|(name, weight)| (name.into(), weight))
            .collect();
        self
    }

    /// Sets the idle poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the retry backoff.
    #[must_use]
    pub fn with_retry_delay(mut self, f: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.retry_delay = Arc::new(f);
        self
    }

    /// Sets the failure callback.
    #[must_use]
    pub fn with_error_hook(mut self, f: impl Fn(&TaskFailure) + Send + Sync + 'static) -> Self {
        self.error_hook = Arc::new(f);
        self
    }
}

/// Consumes tasks from a [`Broker`].
pub struct TaskProcessor<B: Broker> {
    inner: Arc<Inner<B>>,
}

impl<B: Broker> Clone for TaskProcessor<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Broker> fmt::Debug for TaskProcessor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskProcessor")
            .field("state", &self.state())
            .field("mux", &self.inner.mux)
            .finish_non_exhaustive()
    }
}

struct Inner<B> {
    broker: B,
    mux: ServeMux,
    scheduler: WeightedScheduler,
    pools: HashMap<String, Arc<Semaphore>>,
    poll_interval: Duration,
    retry_delay: RetryDelayFn,
    error_hook: ErrorHook,
    state: watch::Sender<ProcessorState>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    wake: Notify,
}

impl<B: Broker> TaskProcessor<B> {
    /// Creates a processor in the `Created` state.
    pub fn new(broker: B, config: ProcessorConfig, mux: ServeMux) -> Result<Self, ProcessorError> {
        let scheduler = WeightedScheduler::new(config.queues)?;
        let pools = scheduler
            .queues()
            .map(|(name, weight)| {
                let permits = usize::try_from(weight).unwrap_or(Semaphore::MAX_PERMITS);
                (name.to_string(), Arc::new(Semaphore::new(permits)))
            })
            .collect();

        let (state, _) = watch::channel(ProcessorState::Created);

        Ok(Self {
            inner: Arc::new(Inner {
                broker,
                mux,
                scheduler,
                pools,
                poll_interval: config.poll_interval,
                retry_delay: config.retry_delay,
                error_hook: config.error_hook,
                state,
                cancel: CancellationToken::new(),
                tracker: TaskTracker::new(),
                wake: Notify::new(),
            }),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProcessorState {
        *self.inner.state.borrow()
    }

    /// Starts the fetch loop on the current tokio runtime.
    pub fn start(&self) -> Result<(), ProcessorError> {
        let handle = Handle::try_current().map_err(|_| ProcessorError::NoRuntime)?;

        let mut started = false;
        self.inner.state.send_if_modified(|state| {
            started = state.can_transition_to(ProcessorState::Running);
            if started {
                *state = ProcessorState::Running;
            }
            started
        });
        if !started {
            return Err(ProcessorError::AlreadyStarted(self.state()));
        }

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn_on(inner.fetch_loop(), &handle);

        info!(
            queues = ?self.inner.scheduler.queues().collect::<Vec<_>>(),
            "task processor started"
        );
        Ok(())
    }

    /// Stops claiming, waits for in-flight tasks to settle, then stops.
    ///
    /// Safe to call any number of times and from several tasks at once: every
    /// call returns once the processor is `Stopped`.
    pub async fn shutdown(&self) {
        let mut was_running = false;
        self.inner.state.send_if_modified(|state| match *state {
            ProcessorState::Created => {
                *state = ProcessorState::Stopped;
                true
            }
            ProcessorState::Running => {
                *state = ProcessorState::Draining;
                was_running = true;
                true
            }
            ProcessorState::Draining | ProcessorState::Stopped => false,
        });

        if self.state() == ProcessorState::Stopped {
            return;
        }
        if was_running {
            info!("task processor draining");
        }

        self.inner.cancel.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;

        self.inner.state.send_if_modified(|state| {
            if *state == ProcessorState::Stopped {
                false
            } else {
                *state = ProcessorState::Stopped;
                true
            }
        });
        if was_running {
            info!("task processor stopped");
        }
    }

    /// Shuts the processor down once `signal` is cancelled.
    ///
    /// Must be called inside a tokio runtime. The returned handle completes
    /// after the drain.
    pub fn shutdown_on(&self, signal: CancellationToken) -> JoinHandle<()> {
        let processor = self.clone();
        tokio::spawn(async move {
            signal.cancelled().await;
            processor.shutdown().await;
        })
    }
}

impl<B: Broker> Inner<B> {
    async fn fetch_loop(self: Arc<Self>) {
        let mut rng = StdRng::from_os_rng();

        while self.accepts_work() {
            if !self.claim_one(&mut rng).await {
                tokio::select! {
                    () = self.cancel.cancelled() => break,
                    () = tokio::time::sleep(self.poll_interval) => {}
                    () = self.wake.notified() => {}
                }
            }
        }

        debug!("fetch loop stopped");
    }

    fn accepts_work(&self) -> bool {
        self.state.borrow().accepts_work() && !self.cancel.is_cancelled()
    }

    /// Claims at most one task per weighted draw, so under backlog each queue
    /// is served in proportion to its weight.
    async fn claim_one(self: &Arc<Self>, rng: &mut StdRng) -> bool {
        for queue in self.scheduler.order(rng) {
            if !self.accepts_work() {
                return false;
            }
            let Some(pool) = self.pools.get(queue) else {
                continue;
            };
            // Queue at capacity; try the next one.
            let Ok(permit) = Arc::clone(pool).try_acquire_owned() else {
                continue;
            };

            match self.broker.dequeue(queue).await {
                Ok(Some(task)) => {
                    let inner = Arc::clone(self);
                    self.tracker.spawn(async move {
                        inner.execute(task).await;
                        drop(permit);
                        inner.wake.notify_one();
                    });
                    return true;
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, queue, "failed to dequeue task"),
            }
        }

        false
    }

    async fn execute(&self, task: Task) {
        debug!(task_id = %task.id, type_name = %task.type_name, retried = task.retried, "processing task");

        let result = AssertUnwindSafe(self.mux.process_task(&task))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ProcessError::Panic(panic_message(panic.as_ref()))));

        match result {
            Ok(()) => match self.broker.ack(&task).await {
                Ok(()) => debug!(task_id = %task.id, type_name = %task.type_name, "task completed"),
                Err(e) => error!(error = %e, task_id = %task.id, "failed to ack task"),
            },
            Err(err) => self.fail(&task, &err).await,
        }
    }

    async fn fail(&self, task: &Task, err: &ProcessError) {
        let message = err.to_string();
        let dead_lettered = task.retried >= task.max_retry;

        let settled = if dead_lettered {
            self.broker.archive(task, &message).await
        } else {
            let attempt = u32::try_from(task.retried).unwrap_or(0).saturating_add(1);
            let delay = (self.retry_delay)(attempt);
            self.broker.retry(task, &message, retry_at(delay)).await
        };

        if let Err(e) = settled {
            warn!(error = %e, task_id = %task.id, dead_lettered, "failed to settle task");
        }

        (self.error_hook)(&TaskFailure {
            task_id: task.id,
            type_name: task.type_name.clone(),
            queue: task.queue.clone(),
            payload: task.payload.clone(),
            retried: task.retried,
            max_retry: task.max_retry,
            error: message,
            dead_lettered,
        });
    }
}

fn retry_at(delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::testing::{MemoryBroker, wait_until};

    const TEST_TYPE: &str = "task:test";

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: usize,
        calls: Arc<AtomicUsize>,
        successes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TaskHandler for Flaky {
        async fn process_task(&self, _task: &Task) -> Result<(), ProcessError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ProcessError::Failed(format!("attempt {call} failed")));
            }
            self.successes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Slow {
        started: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TaskHandler for Slow {
        async fn process_task(&self, _task: &Task) -> Result<(), ProcessError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Panicking;

    #[async_trait]
    impl TaskHandler for Panicking {
        async fn process_task(&self, _task: &Task) -> Result<(), ProcessError> {
            panic!("handler exploded");
        }
    }

    fn config() -> ProcessorConfig {
        ProcessorConfig::default()
            .with_poll_interval(Duration::from_millis(10))
            .with_retry_delay(|_| Duration::ZERO)
    }

    fn flaky(failures: usize) -> (Flaky, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let successes = Arc::new(AtomicUsize::new(0));
        let handler = Flaky {
            failures,
            calls: Arc::clone(&calls),
            successes: Arc::clone(&successes),
        };
        (handler, calls, successes)
    }

    #[tokio::test]
    async fn test_success_acks_task() {
        let broker = MemoryBroker::new();
        let id = broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 3);
        let (handler, _, successes) = flaky(0);
        let mut mux = ServeMux::new();
        mux.handle(TEST_TYPE, handler);

        let processor = TaskProcessor::new(broker.clone(), config(), mux).unwrap();
        processor.start().unwrap();

        wait_until(|| broker.acked().contains(&id)).await;
        processor.shutdown().await;

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert!(broker.is_empty());
    }

    #[tokio::test]
    async fn test_retries_until_success_runs_side_effect_once() {
        let broker = MemoryBroker::new();
        let id = broker.enqueue(TEST_TYPE, QUEUE_CRITICAL, 5);
        let (handler, calls, successes) = flaky(3);
        let mut mux = ServeMux::new();
        mux.handle(TEST_TYPE, handler);

        let failures = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&failures);
        let config = config().with_error_hook(move |f: &TaskFailure| {
            recorded.lock().unwrap().push((f.retried, f.dead_lettered));
        });

        let processor = TaskProcessor::new(broker.clone(), config, mux).unwrap();
        processor.start().unwrap();

        wait_until(|| broker.acked().contains(&id)).await;
        processor.shutdown().await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(
            *failures.lock().unwrap(),
            vec![(0, false), (1, false), (2, false)]
        );
        assert!(broker.archived().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_retries_archive_and_call_hook() {
        let broker = MemoryBroker::new();
        let id = broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 2);
        let (handler, calls, _) = flaky(usize::MAX);
        let mut mux = ServeMux::new();
        mux.handle(TEST_TYPE, handler);

        let dead = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&dead);
        let config = config().with_error_hook(move |f: &TaskFailure| {
            if f.dead_lettered {
                recorded.lock().unwrap().push(f.task_id);
            }
        });

        let processor = TaskProcessor::new(broker.clone(), config, mux).unwrap();
        processor.start().unwrap();

        wait_until(|| !broker.archived().is_empty()).await;
        processor.shutdown().await;

        // First attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(broker.archived(), vec![id]);
        assert_eq!(*dead.lock().unwrap(), vec![id]);
        assert!(broker.acked().is_empty());
    }

    #[tokio::test]
    async fn test_panic_counts_as_failure() {
        let broker = MemoryBroker::new();
        let id = broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 0);
        let mut mux = ServeMux::new();
        mux.handle(TEST_TYPE, Panicking);

        let errors = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&errors);
        let config = config().with_error_hook(move |f: &TaskFailure| {
            recorded.lock().unwrap().push(f.error.clone());
        });

        let processor = TaskProcessor::new(broker.clone(), config, mux).unwrap();
        processor.start().unwrap();

        wait_until(|| broker.archived().contains(&id)).await;
        processor.shutdown().await;

        assert_eq!(
            *errors.lock().unwrap(),
            vec!["Handler panicked: handler exploded".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_archived() {
        let broker = MemoryBroker::new();
        let id = broker.enqueue("task:nobody_handles_this", QUEUE_DEFAULT, 0);

        let processor = TaskProcessor::new(broker.clone(), config(), ServeMux::new()).unwrap();
        processor.start().unwrap();

        wait_until(|| broker.archived().contains(&id)).await;
        processor.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_in_flight_tasks() {
        let broker = MemoryBroker::new();
        for _ in 0..3 {
            broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 3);
        }
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let mut mux = ServeMux::new();
        mux.handle(
            TEST_TYPE,
            Slow {
                started: Arc::clone(&started),
                finished: Arc::clone(&finished),
            },
        );

        let processor = TaskProcessor::new(broker.clone(), config(), mux).unwrap();
        processor.start().unwrap();

        wait_until(|| started.load(Ordering::SeqCst) == 3).await;
        processor.shutdown().await;

        assert_eq!(processor.state(), ProcessorState::Stopped);
        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(broker.acked().len(), 3);
        assert!(broker.is_empty());
    }

    #[tokio::test]
    async fn test_no_claims_after_shutdown() {
        let broker = MemoryBroker::new();
        let (handler, calls, _) = flaky(0);
        let mut mux = ServeMux::new();
        mux.handle(TEST_TYPE, handler);

        let processor = TaskProcessor::new(broker.clone(), config(), mux).unwrap();
        processor.start().unwrap();
        processor.shutdown().await;

        broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 3);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!broker.is_empty());
    }

    #[tokio::test]
    async fn test_queue_concurrency_is_bounded_by_weight() {
        let broker = MemoryBroker::new();
        for _ in 0..4 {
            broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 3);
        }
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let mut mux = ServeMux::new();
        mux.handle(
            TEST_TYPE,
            Slow {
                started: Arc::clone(&started),
                finished: Arc::clone(&finished),
            },
        );

        let config = config().with_queues([(QUEUE_DEFAULT, 2)]);
        let processor = TaskProcessor::new(broker.clone(), config, mux).unwrap();
        processor.start().unwrap();

        wait_until(|| started.load(Ordering::SeqCst) >= 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);

        wait_until(|| finished.load(Ordering::SeqCst) == 4).await;
        processor.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_backlogged_queues_are_served_by_weight() {
        let broker = MemoryBroker::with_dequeue_delay(Duration::from_millis(2));
        for _ in 0..300 {
            broker.enqueue(TEST_TYPE, QUEUE_CRITICAL, 3);
            broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 3);
        }
        let (handler, _, _) = flaky(0);
        let mut mux = ServeMux::new();
        mux.handle(TEST_TYPE, handler);

        let processor = TaskProcessor::new(broker.clone(), config(), mux).unwrap();
        processor.start().unwrap();

        wait_until(|| broker.claims().len() >= 200).await;
        processor.shutdown().await;

        // Weights 10:5, so critical should take about 133 of the first 200.
        let critical = broker
            .claims()
            .iter()
            .take(200)
            .filter(|queue| *queue == QUEUE_CRITICAL)
            .count();
        assert!(
            (110..=160).contains(&critical),
            "critical served {critical} of 200"
        );
    }

    #[tokio::test]
    async fn test_shutdown_on_signal_drains() {
        let broker = MemoryBroker::new();
        broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 3);
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let mut mux = ServeMux::new();
        mux.handle(
            TEST_TYPE,
            Slow {
                started: Arc::clone(&started),
                finished: Arc::clone(&finished),
            },
        );

        let processor = TaskProcessor::new(broker.clone(), config(), mux).unwrap();
        processor.start().unwrap();
        let signal = CancellationToken::new();
        let stopped = processor.shutdown_on(signal.clone());

        wait_until(|| started.load(Ordering::SeqCst) == 1).await;
        assert_eq!(processor.state(), ProcessorState::Running);

        signal.cancel();
        stopped.await.unwrap();

        assert_eq!(processor.state(), ProcessorState::Stopped);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(broker.acked().len(), 1);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let processor = TaskProcessor::new(MemoryBroker::new(), config(), ServeMux::new()).unwrap();

        processor.start().unwrap();
        assert!(matches!(
            processor.start(),
            Err(ProcessorError::AlreadyStarted(ProcessorState::Running))
        ));

        processor.shutdown().await;
        assert!(matches!(
            processor.start(),
            Err(ProcessorError::AlreadyStarted(ProcessorState::Stopped))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let processor = TaskProcessor::new(MemoryBroker::new(), config(), ServeMux::new()).unwrap();

        processor.shutdown().await;
        assert_eq!(processor.state(), ProcessorState::Stopped);
        processor.shutdown().await;
        assert_eq!(processor.state(), ProcessorState::Stopped);
    }

    #[tokio::test]
    async fn test_concurrent_shutdown_callers_all_see_stopped() {
        let broker = MemoryBroker::new();
        broker.enqueue(TEST_TYPE, QUEUE_DEFAULT, 3);
        let started = Arc::new(AtomicUsize::new(0));
        let mut mux = ServeMux::new();
        mux.handle(
            TEST_TYPE,
            Slow {
                started: Arc::clone(&started),
                finished: Arc::new(AtomicUsize::new(0)),
            },
        );

        let processor = TaskProcessor::new(broker.clone(), config(), mux).unwrap();
        processor.start().unwrap();
        wait_until(|| started.load(Ordering::SeqCst) == 1).await;

        tokio::join!(processor.shutdown(), processor.shutdown());

        assert_eq!(processor.state(), ProcessorState::Stopped);
        assert_eq!(broker.acked().len(), 1);
    }

    #[test]
    fn test_start_requires_runtime() {
        let processor = TaskProcessor::new(MemoryBroker::new(), config(), ServeMux::new()).unwrap();

        assert!(matches!(processor.start(), Err(ProcessorError::NoRuntime)));
        assert_eq!(processor.state(), ProcessorState::Created);
    }

    #[test]
    fn test_rejects_empty_queue_config() {
        let config = config().with_queues(Vec::<(String, u32)>::new());

        assert!(matches!(
            TaskProcessor::new(MemoryBroker::new(), config, ServeMux::new()),
            Err(ProcessorError::Config(_))
        ));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
