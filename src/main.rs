use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coupon_service::adapters::http::{build_router, CouponAppState};
use coupon_service::adapters::{
    CachedCouponMetadataProvider, PostgresCouponRepository, PostgresUsageLedger, SystemClock,
};
use coupon_service::application::{
    DiscountEvaluator, ListApplicableCouponsHandler, ValidateCouponHandler,
};
use coupon_service::config::{AppConfig, DatabaseConfig};
use coupon_service::ports::CouponMetadataProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let pool = connect(&config.database).await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
        info!("Database migrations applied");
    }

    let repository = Arc::new(PostgresCouponRepository::new(pool.clone()));
    let ledger = Arc::new(PostgresUsageLedger::new(pool));
    let clock = Arc::new(SystemClock);

    let metadata: Arc<dyn CouponMetadataProvider> = if config.validation.cache_enabled {
        Arc::new(CachedCouponMetadataProvider::new(repository.clone()))
    } else {
        repository.clone()
    };

    let validate_handler =
        ValidateCouponHandler::new(metadata.clone(), ledger.clone(), clock.clone())
            .with_deadline(config.validation.deadline())
            .with_evaluator(DiscountEvaluator::new(config.validation.max_workers));
    let list_applicable_handler =
        ListApplicableCouponsHandler::new(repository, metadata, ledger, clock);

    let state = CouponAppState {
        validate_handler: Arc::new(validate_handler),
        list_applicable_handler: Arc::new(list_applicable_handler),
    };
    let app = build_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    info!(
        %addr,
        deadline_ms = config.validation.deadline_ms,
        max_workers = config.validation.max_workers,
        cache_enabled = config.validation.cache_enabled,
        "coupon-service listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("coupon-service stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` overrides
/// the configured filter.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(config.connection_url())
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
