//! Workbench - small web workshops on one server

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use workbench::{
    api::{self, AppState},
    config::Config,
    db,
    templates::TemplateEngine,
};

/// How often expired sessions are purged
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workbench=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting workbench...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    let templates = TemplateEngine::new(config.templates.path.as_deref())?;
    let state = AppState::new(pool, &config, templates);

    // Purge expired sessions in the background
    {
        let user_service = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
                SESSION_CLEANUP_INTERVAL_SECS,
            ));
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "expired sessions removed"),
                    Err(e) => tracing::warn!("Failed to clean up sessions: {}", e),
                }
            }
        });
    }

    let app = api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
