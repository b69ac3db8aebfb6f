use std::sync::Arc;

use flight_price_api::config::AppSettings;
use flight_price_api::handler;
use flight_price_api::model::Model;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = AppSettings::from_env()?;

    // No model, no service: a load failure here is fatal.
    let model = match Model::load(&settings.model_uri) {
        Ok(model) => model,
        Err(err) => {
            tracing::error!("failed to load model from {}: {err:#}", settings.model_uri);
            std::process::exit(1);
        }
    };

    let app = handler::router(Arc::new(model));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.svc_api_port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install shutdown signal handler: {err}");
        return;
    }
    tracing::info!("Got a Signal. Shutting down.");
}
