use anyhow::Context;
use reel_orchestrator::api::{self, AppState};
use reel_orchestrator::config::Config;
use reel_orchestrator::db;
use reel_orchestrator::executor::{Executor, ExecutorSettings};
use reel_orchestrator::queue::{RetryPolicy, TokioWorkQueue};
use reel_orchestrator::repository::{PgStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reel_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Reel Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let invoker = config.build_invoker()?;

    tracing::info!(
        "Invoking functions via {} strategy (prefix: '{}')",
        invoker.strategy(),
        config.function_prefix
    );

    let executor = Executor::new(
        Arc::clone(&store),
        invoker,
        ExecutorSettings {
            function_prefix: config.function_prefix.clone(),
            callback_base_url: config.callback_base_url.clone(),
        },
    );

    let queue = TokioWorkQueue::new(
        executor,
        RetryPolicy {
            max_retries: config.max_retries,
            initial_delay: config.retry_delay,
            max_delay: Duration::from_secs(300),
        },
    );

    // Build router with all API endpoints
    let app = api::create_router(AppState {
        store,
        queue: Arc::new(queue),
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
