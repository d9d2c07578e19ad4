//! Bankline API Server
//!
//! Serves the HTTP API and runs the background task processor in the same
//! process. Both stop on Ctrl-C or SIGTERM; in-flight tasks drain first.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use bankline_api::{AppState, create_router};
use bankline_core::task::TASK_SEND_VERIFY_EMAIL;
use bankline_db::{
    Store, connect,
    migration::{Migrator, MigratorTrait},
};
use bankline_shared::{AppConfig, SmtpEmailSender};
use bankline_worker::{
    PgBroker, ProcessorConfig, SendVerifyEmailHandler, ServeMux, TaskDistributor, TaskProcessor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);

    let db = Arc::new(connect(&config.database).await?);
    info!("Connected to database");

    if config.database.run_migrations {
        Migrator::up(&*db, None).await?;
        info!("Database migrated");
    }

    let store = Store::new(Arc::clone(&db));

    let mailer = SmtpEmailSender::new(config.email.clone())?;
    info!(
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email sender configured"
    );

    let mut mux = ServeMux::new();
    mux.handle(
        TASK_SEND_VERIFY_EMAIL,
        SendVerifyEmailHandler::new(
            store.clone(),
            Arc::new(mailer),
            config.email.verify_base_url.clone(),
        ),
    );

    let processor = TaskProcessor::new(
        PgBroker::new(Arc::clone(&db), config.worker.lease()),
        ProcessorConfig::from_worker_config(&config.worker),
        mux,
    )?;
    processor.start()?;
    info!(queues = ?config.worker.queues, "Task processor started");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));
    let worker = processor.shutdown_on(shutdown.clone());

    let state = AppState::new(
        store,
        TaskDistributor::new(config.worker.queues.keys()),
        config.auth.clone(),
    );
    let app = create_router(state);

    let served = serve(&config, app, shutdown.clone()).await;
    info!("HTTP server stopped, draining tasks");
    // Also reached when bind or serve fails; the processor must still drain.
    shutdown.cancel();
    worker.await.context("Task processor shutdown panicked")?;
    info!("Shutdown complete");

    served
}

/// Binds the listener and serves `app` until `shutdown` is cancelled.
async fn serve(
    config: &AppConfig,
    app: axum::Router,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bankline=debug,tower_http=debug".into());

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Cancels `token` on Ctrl-C or SIGTERM.
async fn watch_signals(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    token.cancel();
}
