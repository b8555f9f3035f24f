use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::broker::BrokerSource;
use crate::classify::{ClassifyOutcome, ClassifyRequest};
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::transform::{TransformOutcome, TransformRequest};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

pub fn router<S>(pipeline: Arc<Pipeline<S>>) -> Router
where
    S: BrokerSource + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route("/_liveness", get(index))
        .route("/processMessages", post(process_messages::<S>))
        .route("/transformMessages", post(transform_messages::<S>))
        .with_state(pipeline)
}

pub async fn index() -> &'static str {
    "message pipeline"
}

async fn process_messages<S: BrokerSource + 'static>(
    State(pipeline): State<Arc<Pipeline<S>>>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyOutcome>, HandlerError> {
    debug!("received classify request: {:?}", request);
    pipeline
        .classify(&request)
        .await
        .map(Json)
        .map_err(into_response)
}

async fn transform_messages<S: BrokerSource + 'static>(
    State(pipeline): State<Arc<Pipeline<S>>>,
    Json(request): Json<TransformRequest>,
) -> Result<Json<TransformOutcome>, HandlerError> {
    debug!("received transform request: {:?}", request);
    pipeline
        .transform(&request)
        .await
        .map(Json)
        .map_err(into_response)
}

fn into_response(err: PipelineError) -> HandlerError {
    let status = if err.is_configuration() {
        StatusCode::BAD_REQUEST
    } else {
        error!("Request failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
