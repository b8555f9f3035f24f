use std::sync::Arc;

use anyhow::Error;
use envconfig::Envconfig;
use message_pipeline::config::Config;
use message_pipeline::context::build_pipeline;
use message_pipeline::metrics_routes::{serve, setup_metrics_routes};
use message_pipeline::router::router;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_from_env()?;
    let pipeline = Arc::new(build_pipeline(&config).await?);

    let app = setup_metrics_routes(router(pipeline))?;
    let bind = config.bind();
    info!("Listening on {}", bind);

    serve(app, &bind).await?;

    Ok(())
}
