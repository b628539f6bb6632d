//! Insight Server - flight batch analysis backend

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use insight_server::{api, config::Config, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("insight_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting Insight Server...");

    let config = Config::from_env();
    let analysis = config.analysis_config()?;
    let port = config.server_port;
    tracing::info!(
        data_path = %config.data_path.display(),
        sample_secs = analysis.trajectory.sample_secs,
        timeout_ms = analysis.timeout_ms,
        "configuration loaded"
    );
    let state = Arc::new(AppState::new(config, analysis));

    let app = api::routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
