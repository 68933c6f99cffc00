mod app;
mod jobs;
mod modules;
mod types;
mod utils;

#[cfg(test)]
mod test_utils;

use crate::{
    app::App,
    types::{Config, Context, ToContext},
};
use std::sync::Arc;
use tracing_subscriber::prelude::*;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let ctx: Arc<Context> = Arc::new(Config::default().to_context().await);

    let http = async {
        if let Err(err) = App::new(ctx.clone()).serve().await {
            tracing::error!("HTTP server stopped: {}", err);
        }
    };
    let job_monitor = async {
        if let Err(err) = jobs::monitor(ctx.clone()).await.run().await {
            tracing::error!("Job monitor stopped: {}", err);
        }
    };

    tokio::join!(http, job_monitor);
}
