mod error;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use cerebro_core::config::CerebroConfig;
use cerebro_core::identity::IdentityService;
use cerebro_core::llm::LlmService;
use cerebro_core::storage::{self, SqliteStorage};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub storage: SqliteStorage,
    pub identity: IdentityService,
    pub llm: LlmService,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cerebro_web=info,tower_http=info".into()),
        )
        .init();

    let cwd = std::env::current_dir().ok();
    let config = CerebroConfig::load_or_default(cwd.as_deref());

    config
        .require_server_settings()
        .context("refusing to start")?;

    let storage = storage::create_backend(&config)?;
    let identity = IdentityService::from_config(&config.identity)?;
    let llm = LlmService::from_config(&config.llm)?;
    tracing::info!(model = %llm.model(), "model provider ready");

    let state = Arc::new(AppState {
        storage,
        identity,
        llm,
    });

    let app = app(state);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    tracing::info!("cerebro-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(state: Arc<AppState>) -> axum::Router {
    routes::router()
        .with_state(state)
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}
