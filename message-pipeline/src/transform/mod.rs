use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::broker::{BrokerSink, RawRecord};
use crate::cache::VersionedCache;
use crate::error::PipelineError;
use crate::writer::ReliableWriter;

pub mod record;
pub mod summary;

pub use record::{NormalRecord, TombstoneRecord, TransformRecord};
pub use summary::{OutboundSummary, TransformCounters};

/// Added to a Normal's value whenever it replaces the cached entry for its key.
pub const MERGE_BONUS: f64 = 10.5;

/// Fields a record must carry to be transformed.
pub const REQUIRED_FIELDS: [&str; 1] = ["key"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub read_queue: String,
    pub write_queue: String,
    pub message_count: Option<usize>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformOutcome {
    pub read: usize,
    pub skipped: usize,
    pub trailers: usize,
    pub summary: OutboundSummary,
}

/// Merges versioned records against the cache and republishes them one by one.
pub struct VersionedTransformer {
    cache: VersionedCache,
    writer: ReliableWriter,
}

impl VersionedTransformer {
    pub fn new(cache: VersionedCache, writer: ReliableWriter) -> Self {
        Self { cache, writer }
    }

    pub async fn process<W>(
        &self,
        sink: &W,
        write_queue: &str,
        records: Vec<RawRecord>,
    ) -> Result<TransformOutcome, PipelineError>
    where
        W: BrokerSink + ?Sized,
    {
        let mut counters = TransformCounters::default();
        let mut skipped = 0;
        let mut trailers = 0;

        for raw in &records {
            let record = match TransformRecord::parse(raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unparseable record: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            if self
                .process_record(sink, write_queue, record, &mut counters)
                .await?
                .is_some()
            {
                trailers += 1;
            }
        }

        let summary = counters.snapshot();
        info!(
            "Transformed {} records into {}: {} written, {} cache updates, {} skipped",
            records.len(),
            write_queue,
            summary.total_messages_written,
            summary.total_redis_updates,
            skipped
        );

        Ok(TransformOutcome {
            read: records.len(),
            skipped,
            trailers,
            summary,
        })
    }

    /// Applies one record and publishes its output. Returns the trailer when the record was a
    /// Tombstone.
    pub async fn process_record<W>(
        &self,
        sink: &W,
        write_queue: &str,
        record: TransformRecord,
        counters: &mut TransformCounters,
    ) -> Result<Option<OutboundSummary>, PipelineError>
    where
        W: BrokerSink + ?Sized,
    {
        counters.record_processed();

        match record {
            TransformRecord::Normal(normal) => {
                let outbound = self.merge(normal, counters).await?;
                counters.record_value_written(outbound.value);
                counters.record_message_written();
                self.writer.write(sink, write_queue, &[outbound]).await?;
                Ok(None)
            }
            TransformRecord::Tombstone(tombstone) => {
                if self.cache.exists(&tombstone.key).await? {
                    self.cache.delete(&tombstone.key).await?;
                    counters.record_cache_update();
                    metrics::counter!("pipeline_cache_updates", "op" => "delete").increment(1);
                    debug!("Purged cache entry for {}", tombstone.key);
                }
                counters.record_value_written(tombstone.value);

                let summary = counters.snapshot();
                self.writer.write(sink, write_queue, &[summary]).await?;
                Ok(Some(summary))
            }
        }
    }

    /// Replaces the cached entry when `normal` is newer, bumping its value. Returns the
    /// record to publish.
    async fn merge(
        &self,
        mut normal: NormalRecord,
        counters: &mut TransformCounters,
    ) -> Result<NormalRecord, PipelineError> {
        let newer = match self.cached_version(&normal.key).await? {
            Some(version) => normal.version > version,
            None => true,
        };

        if !newer {
            debug!(
                "Keeping cached entry for {}, version {} is not newer",
                normal.key, normal.version
            );
            return Ok(normal);
        }

        normal.value += MERGE_BONUS;
        self.cache
            .set(&normal.key, &serde_json::to_string(&normal)?)
            .await?;
        counters.record_cache_update();
        counters.record_bonus(MERGE_BONUS);
        metrics::counter!("pipeline_cache_updates", "op" => "set").increment(1);
        debug!("Cached version {} for {}", normal.version, normal.key);

        Ok(normal)
    }

    /// The version of the cached entry for `key`. An entry that does not decode is treated as
    /// absent.
    async fn cached_version(&self, key: &str) -> Result<Option<i64>, PipelineError> {
        let Some(cached) = self.cache.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<NormalRecord>(&cached) {
            Ok(entry) => Ok(Some(entry.version)),
            Err(e) => {
                warn!("Ignoring undecodable cache entry for {}: {}", key, e);
                Ok(None)
            }
        }
    }
}
