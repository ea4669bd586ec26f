use crate::catalog::CatalogApi;
use crate::config::Config;
use crate::data::PgShowStore;
use crate::state::{AppState, SERVICE_INGEST, SERVICE_WEB, ServiceStatus};
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Connect to the database, apply migrations and wire up the services.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let connect_options = sqlx::postgres::PgConnectOptions::from_str(&config.database_url)
            .context("Failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_slow_threshold(Duration::from_millis(500))
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            max_connections = 4,
            acquire_timeout = "4s",
            "database pool established"
        );

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");

        let catalog = CatalogApi::new(&config.catalog_base_url, config.catalog_timeout)
            .context("Failed to create catalog client")?;
        info!(
            base_url = %config.catalog_base_url,
            timeout = fmt_duration(config.catalog_timeout),
            batch_size = config.ingest_batch_size,
            "catalog client configured"
        );

        let app_state = AppState::new(
            Arc::new(catalog),
            Arc::new(PgShowStore::new(db_pool)),
            config.ingest_batch_size,
        );

        Ok(App { config, app_state })
    }

    /// Serve HTTP until a shutdown signal arrives, then drain within `shutdown_timeout`.
    pub async fn run(self, ingest_on_start: bool) -> ExitCode {
        let statuses = self.app_state.service_statuses.clone();
        statuses.set(SERVICE_WEB, ServiceStatus::Starting);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = ?e, %addr, "Failed to bind web server");
                statuses.set(SERVICE_WEB, ServiceStatus::Error);
                return ExitCode::FAILURE;
            }
        };
        info!(%addr, "web server listening");
        statuses.set(SERVICE_WEB, ServiceStatus::Active);

        let shutdown = CancellationToken::new();

        let server = tokio::spawn({
            let router = create_router(self.app_state.clone());
            let shutdown = shutdown.clone();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await
            }
        });

        let ingestion = ingest_on_start.then(|| {
            let ingestor = self.app_state.ingestor.clone();
            let statuses = statuses.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    result = ingestor.run() => match result {
                        Ok(report) => info!(shows_added = report.shows_added, "Startup ingestion finished"),
                        Err(e) => {
                            error!(error = ?e, "Startup ingestion failed");
                            statuses.set(SERVICE_INGEST, ServiceStatus::Error);
                        }
                    },
                    _ = shutdown.cancelled() => {
                        warn!("Startup ingestion cancelled by shutdown");
                    }
                }
            })
        });

        shutdown_signal().await;
        info!(
            timeout = fmt_duration(self.config.shutdown_timeout),
            "shutdown requested, draining"
        );
        shutdown.cancel();

        if let Some(handle) = ingestion
            && let Err(e) = handle.await
        {
            warn!(error = ?e, "Startup ingestion task panicked");
        }

        match tokio::time::timeout(self.config.shutdown_timeout, server).await {
            Ok(Ok(Ok(()))) => {
                info!("web server stopped");
                ExitCode::SUCCESS
            }
            Ok(Ok(Err(e))) => {
                error!(error = ?e, "web server exited with error");
                ExitCode::FAILURE
            }
            Ok(Err(e)) => {
                error!(error = ?e, "web server task panicked");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!("graceful shutdown timed out, exiting anyway");
                ExitCode::FAILURE
            }
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "Failed to listen for Ctrl+C");
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
                error!(error = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
