use common_redis::CustomRedisError;
use thiserror::Error;

use crate::reader::ReadError;
use crate::writer::WriteError;

/// Why a raw record could not be turned into a typed message. Records that fail to parse are
/// dropped; the batch carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("invalid field: {0}")]
    InvalidField(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("cache operation failed: {0}")]
    Cache(#[from] CustomRedisError),
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Errors caused by the request rather than by the pipeline's collaborators.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::Read(ReadError::UnboundedStopRule))
    }
}
