pub mod broker;
pub mod cache;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics_routes;
pub mod pipeline;
pub mod reader;
pub mod retry;
pub mod router;
pub mod serialization;
pub mod transform;
pub mod writer;
