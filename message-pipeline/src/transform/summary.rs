use serde::Serialize;

/// Counters accumulated over one transform batch.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TransformCounters {
    messages_written: u64,
    messages_processed: u64,
    cache_updates: u64,
    value_written: f64,
    added: f64,
}

/// Point-in-time copy of the counters, published as a trailer after every Tombstone.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundSummary {
    pub total_messages_written: u64,
    pub total_messages_processed: u64,
    pub total_redis_updates: u64,
    pub total_value_written: f64,
    pub total_added: f64,
}

impl TransformCounters {
    pub fn record_processed(&mut self) {
        self.messages_processed += 1;
    }

    pub fn record_cache_update(&mut self) {
        self.cache_updates += 1;
    }

    pub fn record_bonus(&mut self, bonus: f64) {
        self.added += bonus;
    }

    pub fn record_value_written(&mut self, value: f64) {
        self.value_written += value;
    }

    pub fn record_message_written(&mut self) {
        self.messages_written += 1;
    }

    pub fn snapshot(&self) -> OutboundSummary {
        OutboundSummary {
            total_messages_written: self.messages_written,
            total_messages_processed: self.messages_processed,
            total_redis_updates: self.cache_updates,
            total_value_written: self.value_written,
            total_added: self.added,
        }
    }
}
