//! Weighted queue ordering.
//!
//! Each fetch round visits every queue once, in an order drawn at random
//! where a queue's chance to come first is proportional to its weight. With
//! `critical = 10` and `default = 5`, `critical` leads about two rounds in
//! three, but `default` is never starved.

use rand::Rng;
use thiserror::Error;

/// Invalid queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// No queues were configured.
    #[error("at least one queue must be configured")]
    NoQueues,
    /// A queue was given weight zero.
    #[error("queue {0} must have a positive weight")]
    ZeroWeight(String),
}

/// Named queues with relative weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedScheduler {
    queues: Vec<(String, u32)>,
}

impl WeightedScheduler {
    /// Builds a scheduler over `queues`.
    pub fn new<I, S>(queues: I) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let queues: Vec<(String, u32)> = queues
            .into_iter()
            .map(|(name, weight)| (name.into(), weight))
            .collect();

        if queues.is_empty() {
            return Err(SchedulerError::NoQueues);
        }
        if let Some((name, _)) = queues.iter().find(|(_, weight)| *weight == 0) {
            return Err(SchedulerError::ZeroWeight(name.clone()));
        }

        Ok(Self { queues })
    }

    /// Configured queues with their weights.
    pub fn queues(&self) -> impl Iterator<Item = (&str, u32)> {
        self.queues.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    /// Weight of `queue`, if it is configured.
    #[must_use]
    pub fn weight(&self, queue: &str) -> Option<u32> {
        self.queues
            .iter()
            .find(|(name, _)| name == queue)
            .map(|(_, weight)| *weight)
    }

    /// Draws a visiting order containing every queue exactly once.
    pub fn order<R: Rng>(&self, rng: &mut R) -> Vec<&str> {
        let mut remaining: Vec<(&str, u64)> = self
            .queues
            .iter()
            .map(|(name, weight)| (name.as_str(), u64::from(*weight)))
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let total: u64 = remaining.iter().map(|(_, weight)| weight).sum();
            let mut pick = rng.random_range(0..total);
            let mut index = remaining.len() - 1;
            for (i, (_, weight)) in remaining.iter().enumerate() {
                if pick < *weight {
                    index = i;
                    break;
                }
                pick -= weight;
            }
            order.push(remaining.remove(index).0);
        }

        order
    }
}
