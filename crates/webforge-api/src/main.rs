// WebForge API server
// Decision: Build sessions, runner and generators are created once here and shared via Arc
// Decision: Offline scaffold generation is the default when no OpenAI key is configured

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webforge_api::{app, ApiConfig, Services};
use webforge_core::BuildStream;
use webforge_storage::{ChatStore, ModelStore, ProjectStore, SettingsStore};
use webforge_worker::{
    create_project_generator, create_runner, create_text_generator, spawn_session_sweeper,
    GeneratorConfig, RunnerConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "webforge_api=debug,webforge_worker=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("webforge-api starting...");

    let config = ApiConfig::from_env().context("Invalid API configuration")?;
    let runner_config = RunnerConfig::from_env().context("Invalid runner configuration")?;
    let generator_config = GeneratorConfig::from_env()
        .context("Invalid generator configuration")?
        .fit_within(runner_config.generation_timeout);
    tracing::info!(data_dir = %config.data_dir.display(), "Data directory configured");

    // Storage
    let projects =
        ProjectStore::new(config.projects_dir()).context("Failed to open project store")?;
    let settings =
        SettingsStore::new(config.settings_path()).context("Failed to open settings file")?;
    let models =
        ModelStore::new(config.models_dir(), settings).context("Failed to open model store")?;
    let chat = ChatStore::connect(&config.database_url)
        .await
        .context("Failed to open chat database")?;

    // Generation backends
    let text = create_text_generator(&generator_config)
        .context("Failed to create text generator")?;
    let generator = create_project_generator(&generator_config, text.clone())
        .context("Failed to create project generator")?;

    // Build sessions and runner
    let stream = Arc::new(BuildStream::new());
    let runner = create_runner(
        runner_config,
        stream.clone(),
        generator.clone(),
        Arc::new(projects.clone()),
    );
    let sweeper = spawn_session_sweeper(stream.clone(), config.session_ttl, config.sweep_interval);

    let services = Services {
        stream,
        runner: runner.clone(),
        projects,
        models,
        chat,
        text,
        generator: generator.name().to_string(),
    };
    let app = app(services, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    runner
        .shutdown()
        .await
        .context("Failed to stop build runner")?;
    tracing::info!("webforge-api stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
