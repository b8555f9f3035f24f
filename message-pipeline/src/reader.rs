use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::broker::{BrokerError, BrokerSource, RawRecord};

/// Extra time a poll in flight at the deadline is given before it is abandoned.
pub const DEADLINE_SLACK: Duration = Duration::from_millis(200);

/// When a bounded read stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRule {
    Count(usize),
    Timeout(Duration),
    /// Whichever bound is reached first.
    CountOrTimeout(usize, Duration),
    /// Read until the source has nothing left. Not supported: a source is never known to
    /// be drained, so this is rejected before touching the broker.
    UntilEmpty,
}

impl StopRule {
    pub fn from_bounds(count: Option<usize>, timeout: Option<Duration>) -> Self {
        match (count, timeout) {
            (Some(n), Some(d)) => StopRule::CountOrTimeout(n, d),
            (Some(n), None) => StopRule::Count(n),
            (None, Some(d)) => StopRule::Timeout(d),
            (None, None) => StopRule::UntilEmpty,
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            StopRule::Count(n) | StopRule::CountOrTimeout(n, _) => Some(*n),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self {
            StopRule::Timeout(d) | StopRule::CountOrTimeout(_, d) => Some(*d),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ReadError> {
        match self {
            StopRule::UntilEmpty => Err(ReadError::UnboundedStopRule),
            _ => Ok(()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("a read needs a message count, a timeout, or both")]
    UnboundedStopRule,
}

/// Pulls records from one source until a stop rule is satisfied.
///
/// Broker failures part way through a read are logged and end the read early; whatever was
/// collected up to that point is returned. The subscription is always released.
#[derive(Debug, Clone)]
pub struct BoundedReader {
    poll_interval: Duration,
    deadline_slack: Duration,
}

impl BoundedReader {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            deadline_slack: DEADLINE_SLACK,
        }
    }

    pub fn with_deadline_slack(mut self, slack: Duration) -> Self {
        self.deadline_slack = slack;
        self
    }

    /// Reads from `name` until `rule` is met. With `required_fields`, records that are not
    /// JSON objects carrying every listed field are dropped and do not count towards the
    /// target.
    pub async fn read<S: BrokerSource>(
        &self,
        source: &S,
        name: &str,
        required_fields: Option<&[&str]>,
        rule: StopRule,
    ) -> Result<Vec<RawRecord>, ReadError> {
        rule.validate()?;

        let started = Instant::now();
        let target = rule.count();
        let deadline = rule.timeout().map(|d| started + d);
        let mut records = Vec::new();
        let mut dropped = 0_u64;

        if target == Some(0) {
            return Ok(records);
        }

        let subscribed = match deadline {
            Some(d) => tokio::time::timeout_at(d + self.deadline_slack, source.subscribe(name))
                .await
                .unwrap_or_else(|_| {
                    Err(BrokerError::Subscribe {
                        name: name.to_owned(),
                        reason: "deadline passed while subscribing".to_string(),
                    })
                }),
            None => source.subscribe(name).await,
        };
        let mut subscription = match subscribed {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("Could not read from {}: {}", name, e);
                return Ok(records);
            }
        };

        'read: loop {
            let max_wait = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        break;
                    }
                    (d - now).min(self.poll_interval)
                }
                None => self.poll_interval,
            };

            let polled = match deadline {
                Some(d) => {
                    let poll = source.poll(&mut subscription, max_wait);
                    match tokio::time::timeout_at(d + self.deadline_slack, poll).await {
                        Ok(polled) => polled,
                        Err(_) => {
                            warn!("Poll of {} overran the read deadline", name);
                            break;
                        }
                    }
                }
                None => source.poll(&mut subscription, max_wait).await,
            };

            let batch = match polled {
                Ok(batch) => batch,
                Err(e) => {
                    error!(
                        "Read from {} aborted after {} records: {}",
                        name,
                        records.len(),
                        e
                    );
                    break;
                }
            };

            for record in batch {
                if let Some(fields) = required_fields {
                    if !has_required_fields(record.payload(), fields) {
                        debug!("Dropping record from {} missing required fields", name);
                        dropped += 1;
                        continue;
                    }
                }

                records.push(record);
                if target.is_some_and(|n| records.len() >= n) {
                    break 'read;
                }
            }
        }

        source.unsubscribe(subscription).await;

        metrics::counter!("pipeline_records_read", "source" => name.to_owned())
            .increment(records.len() as u64);
        if dropped > 0 {
            metrics::counter!("pipeline_records_dropped", "source" => name.to_owned())
                .increment(dropped);
        }
        info!(
            "Read {} records from {} in {:?} ({} dropped)",
            records.len(),
            name,
            started.elapsed(),
            dropped
        );

        Ok(records)
    }
}

/// Whether `payload` is a JSON object that has every field in `fields`.
pub fn has_required_fields(payload: &str, fields: &[&str]) -> bool {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(object)) => fields.iter().all(|field| object.contains_key(*field)),
        _ => false,
    }
}
