use std::sync::Arc;

use anyhow::Context;
use common::Catalog;
use server::catalog::InMemoryCatalog;
use server::config::AppConfig;
use server::engine::Engine;
use server::hooks::LoggingHook;
use server::state::AppState;
use tracing::info;
use worker::{Toolchains, build_sandbox};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let catalog = match &config.catalog.path {
        Some(path) => InMemoryCatalog::load(path).context("Failed to load problem catalog")?,
        None => InMemoryCatalog::seeded(),
    };
    info!(problems = catalog.len(), "Problem catalog ready");
    let catalog: Arc<dyn Catalog> = Arc::new(catalog);

    let toolchains = Toolchains::builtin().with_overrides(config.languages.clone());
    info!(
        backend = ?config.sandbox.backend,
        languages = ?toolchains.ids().collect::<Vec<_>>(),
        "Sandbox configured"
    );
    let sandbox = build_sandbox(&config.sandbox, toolchains, config.engine.pool_size);
    sandbox
        .verify()
        .await
        .context("Sandbox cannot provide the configured isolation")?;

    let engine = Engine::start(config.engine.clone(), catalog.clone(), sandbox);
    engine
        .add_hook(LoggingHook)
        .await
        .context("Failed to register logging hook")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        engine: engine.clone(),
        catalog,
        config,
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    info!("Swagger UI: http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down evaluation engine");
    engine.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
