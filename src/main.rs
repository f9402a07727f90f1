use std::sync::Arc;

use journey::config::AppConfig;
use journey::db::{init_pool, run_migrations};
use journey::error::AppError;
use journey::routes::create_router;
use journey::services::{
    mailer::SmtpMailer,
    notifications::{DispatcherConfig, NotificationDispatcher},
    store::{SqliteStore, Store},
    workflow::Workflow,
};
use journey::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = run_migrations(&db).await {
        error!("migration failed: {err:?}");
        return Err(err);
    }

    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(db.clone()));
    let mailer = SmtpMailer::new(
        Arc::clone(&store),
        &config.smtp,
        config.public_base_url.clone(),
    )?;
    let notifications = NotificationDispatcher::start(
        Arc::new(mailer),
        DispatcherConfig {
            workers: config.notify_workers,
            queue_size: config.notify_queue_size,
        },
    );

    let state = AppState::new(
        config.clone(),
        Workflow::new(store, notifications.clone()),
    );
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    notifications.shutdown().await;
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested, draining notifications");
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,journey=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
