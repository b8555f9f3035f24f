use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::broker::{BrokerSink, BrokerSource};
use crate::classify::{self, ClassifyOutcome, ClassifyRequest, Classifier};
use crate::error::PipelineError;
use crate::reader::{BoundedReader, StopRule};
use crate::transform::{self, TransformOutcome, TransformRequest, VersionedTransformer};

/// Runs one request end to end: a bounded read, then classification or transformation of the
/// batch, then the writes.
pub struct Pipeline<S> {
    source: S,
    sink: Arc<dyn BrokerSink>,
    reader: BoundedReader,
    classifier: Classifier,
    transformer: VersionedTransformer,
    default_timeout: Option<Duration>,
}

impl<S: BrokerSource> Pipeline<S> {
    pub fn new(
        source: S,
        sink: Arc<dyn BrokerSink>,
        reader: BoundedReader,
        classifier: Classifier,
        transformer: VersionedTransformer,
    ) -> Self {
        Self {
            source,
            sink,
            reader,
            classifier,
            transformer,
            default_timeout: None,
        }
    }

    /// Timeout applied to requests that carry neither a count nor a timeout.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn stop_rule(&self, message_count: Option<usize>, timeout_ms: Option<u64>) -> StopRule {
        let timeout = timeout_ms.map(Duration::from_millis);
        match StopRule::from_bounds(message_count, timeout) {
            StopRule::UntilEmpty => StopRule::from_bounds(None, self.default_timeout),
            rule => rule,
        }
    }

    pub async fn classify(
        &self,
        request: &ClassifyRequest,
    ) -> Result<ClassifyOutcome, PipelineError> {
        let started = Instant::now();
        let rule = self.stop_rule(request.message_count, request.timeout_ms);

        let records = self
            .reader
            .read(
                &self.source,
                &request.read_topic,
                Some(&classify::REQUIRED_FIELDS),
                rule,
            )
            .await?;

        let outcome = self
            .classifier
            .process(
                self.sink.as_ref(),
                &request.write_queue_good,
                &request.write_queue_bad,
                records,
            )
            .await;

        metrics::histogram!("pipeline_request_duration_seconds", "pipeline" => "classify")
            .record(started.elapsed().as_secs_f64());
        info!(
            "Classify request for {} finished in {:?}",
            request.read_topic,
            started.elapsed()
        );
        outcome
    }

    pub async fn transform(
        &self,
        request: &TransformRequest,
    ) -> Result<TransformOutcome, PipelineError> {
        let started = Instant::now();
        let rule = self.stop_rule(request.message_count, request.timeout_ms);

        let records = self
            .reader
            .read(
                &self.source,
                &request.read_queue,
                Some(&transform::REQUIRED_FIELDS),
                rule,
            )
            .await?;

        let outcome = self
            .transformer
            .process(self.sink.as_ref(), &request.write_queue, records)
            .await;

        metrics::histogram!("pipeline_request_duration_seconds", "pipeline" => "transform")
            .record(started.elapsed().as_secs_f64());
        info!(
            "Transform request for {} finished in {:?}",
            request.read_queue,
            started.elapsed()
        );
        outcome
    }
}
