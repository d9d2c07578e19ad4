//! In-memory doubles for worker tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bankline_shared::{EmailError, EmailSender};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::broker::{Broker, BrokerError, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    Active,
    Archived,
}

#[derive(Debug)]
struct Stored {
    task: Task,
    slot: Slot,
    process_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    tasks: Vec<Stored>,
    acked: Vec<Uuid>,
    claims: Vec<String>,
}

/// Broker keeping tasks in a vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
    dequeue_delay: Duration,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `dequeue` call takes `delay`, like a round trip to a database.
    pub fn with_dequeue_delay(delay: Duration) -> Self {
        Self {
            dequeue_delay: delay,
            ..Self::default()
        }
    }

    /// Queue of every successful claim, in claim order.
    pub fn claims(&self) -> Vec<String> {
        self.state.lock().unwrap().claims.clone()
    }

    pub fn enqueue(&self, type_name: &str, queue: &str, max_retry: i32) -> Uuid {
        let id = Uuid::now_v7();
        self.state.lock().unwrap().tasks.push(Stored {
            task: Task {
                id,
                type_name: type_name.to_string(),
                payload: b"{}".to_vec(),
                queue: queue.to_string(),
                max_retry,
                retried: 0,
            },
            slot: Slot::Pending,
            process_at: Utc::now(),
        });
        id
    }

    pub fn acked(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().acked.clone()
    }

    pub fn archived(&self) -> Vec<Uuid> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .filter(|t| t.slot == Slot::Archived)
            .map(|t| t.task.id)
            .collect()
    }

    /// No pending or active tasks remain.
    pub fn is_empty(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .all(|t| t.slot == Slot::Archived)
    }

    fn settle(&self, id: Uuid, f: impl FnOnce(&mut Stored)) -> Result<(), BrokerError> {
        let mut state = self.state.lock().unwrap();
        let stored = state
            .tasks
            .iter_mut()
            .find(|t| t.task.id == id && t.slot == Slot::Active)
            .ok_or(BrokerError::LeaseLost(id))?;
        f(stored);
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn dequeue(&self, queue: &str) -> Result<Option<Task>, BrokerError> {
        if !self.dequeue_delay.is_zero() {
            tokio::time::sleep(self.dequeue_delay).await;
        }

        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let claimed = state
            .tasks
            .iter_mut()
            .filter(|t| t.task.queue == queue && t.slot == Slot::Pending && t.process_at <= now)
            .min_by_key(|t| t.process_at)
            .map(|stored| {
                stored.slot = Slot::Active;
                stored.task.clone()
            });

        if claimed.is_some() {
            state.claims.push(queue.to_string());
        }
        Ok(claimed)
    }

    async fn ack(&self, task: &Task) -> Result<(), BrokerError> {
        let mut state = self.state.lock().unwrap();
        let index = state
            .tasks
            .iter()
            .position(|t| t.task.id == task.id && t.slot == Slot::Active)
            .ok_or(BrokerError::LeaseLost(task.id))?;
        state.tasks.remove(index);
        state.acked.push(task.id);
        Ok(())
    }

    async fn retry(
        &self,
        task: &Task,
        _error: &str,
        process_at: DateTime<Utc>,
    ) -> Result<(), BrokerError> {
        self.settle(task.id, |stored| {
            stored.slot = Slot::Pending;
            stored.task.retried += 1;
            stored.process_at = process_at;
        })
    }

    async fn archive(&self, task: &Task, _error: &str) -> Result<(), BrokerError> {
        self.settle(task.id, |stored| stored.slot = Slot::Archived)
    }
}

/// One email handed to [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub subject: String,
    pub content: String,
    pub to: Vec<String>,
}

/// Mailer that records instead of sending, optionally failing every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send_email(
        &self,
        subject: &str,
        content: &str,
        to: &[String],
    ) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::SendError("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            subject: subject.to_string(),
            content: content.to_string(),
            to: to.to_vec(),
        });
        Ok(())
    }
}

/// Polls `condition` until it holds; panics after five seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
