//! Comment service entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use comment_api::{AppState, RateLimiterState, app, rate_limit};
use comment_common::{Config, LoggingConfig};
use comment_core::{
    BadWordDetector, HttpNotifier, NotificationDispatcher, NotifierService,
};
use comment_db::repositories::{
    CommentRepository, ReactionRepository, ReportRepository, SettingsRepository,
};
use tokio::signal;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the configured level.
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn notification_dispatcher(config: &Config) -> anyhow::Result<NotificationDispatcher> {
    if !config.notifier.enabled {
        info!("Notifications disabled");
        return Ok(NotificationDispatcher::disabled());
    }

    let notifier: NotifierService = Arc::new(
        HttpNotifier::new(&config.notifier).context("failed to build notification client")?,
    );
    info!(url = %config.notifier.service_url, "Notifications enabled");
    Ok(NotificationDispatcher::new(notifier, &config.notifier))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting comment service...");

    let db = comment_db::init(&config)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    info!("Running database migrations...");
    comment_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let detector = BadWordDetector::from_config(&config.moderation)?;
    let state = AppState::new(
        Arc::new(CommentRepository::new(Arc::clone(&db))),
        Arc::new(SettingsRepository::new(Arc::clone(&db))),
        Arc::new(ReactionRepository::new(Arc::clone(&db))),
        Arc::new(ReportRepository::new(Arc::clone(&db))),
        detector,
        notification_dispatcher(&config)?,
    );

    let rate_limiter = RateLimiterState::per_minute(config.moderation.rate_limit_per_minute);

    // Expired windows would otherwise accumulate one entry per caller
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(rate_limit::WINDOW);
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup().await;
        }
    });

    let app = app(state, rate_limiter)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
