use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{BrokerError, BrokerSink, BrokerSource, RawRecord};

/// In-process broker for tests: each name is an append-only log, and every subscription
/// reads its log from the beginning, like a fresh consumer group reading from earliest.
///
/// Publishing to a name appends to the same log that subscriptions read, so stages can be
/// chained through it.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

#[derive(Default)]
struct BrokerState {
    logs: HashMap<String, Vec<String>>,
    failing_subscriptions: HashSet<String>,
    failing_polls: HashMap<String, usize>,
    hanging_polls: HashMap<String, usize>,
    publish_failures: HashMap<String, usize>,
    publish_attempts: HashMap<String, usize>,
    subscribe_calls: usize,
    active_subscriptions: usize,
}

pub struct MemorySubscription {
    name: String,
    offset: usize,
    polls: usize,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends records to a log without counting as published attempts.
    pub fn seed<I, P>(&self, name: &str, payloads: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut state = self.lock();
        state
            .logs
            .entry(name.to_owned())
            .or_default()
            .extend(payloads.into_iter().map(Into::into));
    }

    /// Every subscribe to `name` fails.
    pub fn fail_subscriptions_to(&self, name: &str) {
        self.lock().failing_subscriptions.insert(name.to_owned());
    }

    /// Polls of `name` succeed `successful_polls` times per subscription, then fail.
    pub fn fail_polls_after(&self, name: &str, successful_polls: usize) {
        self.lock()
            .failing_polls
            .insert(name.to_owned(), successful_polls);
    }

    /// Polls of `name` succeed `successful_polls` times per subscription, then never return,
    /// whatever `max_wait` they were given.
    pub fn hang_polls_after(&self, name: &str, successful_polls: usize) {
        self.lock()
            .hanging_polls
            .insert(name.to_owned(), successful_polls);
    }

    /// The next `count` publish attempts to `name` fail.
    pub fn fail_next_publishes(&self, name: &str, count: usize) {
        self.lock().publish_failures.insert(name.to_owned(), count);
    }

    pub fn records(&self, name: &str) -> Vec<String> {
        self.lock().logs.get(name).cloned().unwrap_or_default()
    }

    pub fn publish_attempts(&self, name: &str) -> usize {
        self.lock()
            .publish_attempts
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.lock().subscribe_calls
    }

    pub fn active_subscriptions(&self) -> usize {
        self.lock().active_subscriptions
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl BrokerSource for MemoryBroker {
    type Subscription = MemorySubscription;

    async fn subscribe(&self, name: &str) -> Result<MemorySubscription, BrokerError> {
        let mut state = self.lock();
        state.subscribe_calls += 1;

        if state.failing_subscriptions.contains(name) {
            return Err(BrokerError::Subscribe {
                name: name.to_owned(),
                reason: "subscription refused".to_string(),
            });
        }

        state.active_subscriptions += 1;
        Ok(MemorySubscription {
            name: name.to_owned(),
            offset: 0,
            polls: 0,
        })
    }

    async fn poll(
        &self,
        subscription: &mut MemorySubscription,
        max_wait: Duration,
    ) -> Result<Vec<RawRecord>, BrokerError> {
        let available = {
            let state = self.lock();
            if let Some(limit) = state.failing_polls.get(&subscription.name) {
                if subscription.polls >= *limit {
                    return Err(BrokerError::Poll {
                        name: subscription.name.clone(),
                        reason: "connection lost".to_string(),
                    });
                }
            }
            let hangs = state
                .hanging_polls
                .get(&subscription.name)
                .is_some_and(|limit| subscription.polls >= *limit);
            subscription.polls += 1;

            if hangs {
                None
            } else {
                Some(
                    state
                        .logs
                        .get(&subscription.name)
                        .map(|log| log[subscription.offset.min(log.len())..].to_vec())
                        .unwrap_or_default(),
                )
            }
        };

        let Some(available) = available else {
            return std::future::pending().await;
        };

        if available.is_empty() {
            tokio::time::sleep(max_wait).await;
            return Ok(Vec::new());
        }

        subscription.offset += available.len();
        Ok(available.into_iter().map(RawRecord::new).collect())
    }

    async fn unsubscribe(&self, _subscription: MemorySubscription) {
        let mut state = self.lock();
        state.active_subscriptions = state.active_subscriptions.saturating_sub(1);
    }
}

#[async_trait]
impl BrokerSink for MemoryBroker {
    async fn publish(&self, name: &str, payload: &str) -> Result<(), BrokerError> {
        let mut state = self.lock();
        *state.publish_attempts.entry(name.to_owned()).or_default() += 1;

        if let Some(remaining) = state.publish_failures.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrokerError::Publish {
                    name: name.to_owned(),
                    reason: "broker unavailable".to_string(),
                });
            }
        }

        state
            .logs
            .entry(name.to_owned())
            .or_default()
            .push(payload.to_owned());
        Ok(())
    }
}
