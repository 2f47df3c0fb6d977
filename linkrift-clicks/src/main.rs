use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use socketioxide::SocketIo;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod analytics;
mod config;
mod events;
mod geo;
mod models;
mod processor;
mod realtime;
mod routes;
mod schema;
mod services;
mod uaparse;

use analytics::ClickHouseSink;
use config::AppConfig;
use geo::GeoResolver;
use linkrift_shared::clients::db::DbPool;
use linkrift_shared::clients::rabbitmq::RabbitMQClient;
use linkrift_shared::clients::redis::RedisClient;
use linkrift_shared::license::LicenseManager;

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

pub struct WorkerState {
    pub config: AppConfig,
    pub db: DbPool,
    pub redis: RedisClient,
    pub rabbitmq: RabbitMQClient,
    pub geo: GeoResolver,
    pub analytics: Option<ClickHouseSink>,
    pub license: Arc<LicenseManager>,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    linkrift_shared::middleware::init_tracing("linkrift-clicks");

    let config = AppConfig::load()?;
    let port = config.port;

    let metrics = linkrift_shared::middleware::init_metrics();

    let db = linkrift_shared::clients::db::create_pool(&config.database_url);
    let redis = RedisClient::connect(&config.redis_url).await?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let license = LicenseManager::new(config.license_key.clone());
    tokio::spawn(
        license
            .clone()
            .run_reverify_loop(Duration::from_secs(config.license_check_interval)),
    );

    let geo = GeoResolver::load(config.geoip_db_path.as_deref());
    let analytics = config.clickhouse_url.as_deref().map(|url| {
        ClickHouseSink::new(
            url,
            &config.clickhouse_database,
            config.clickhouse_user.clone(),
            config.clickhouse_password.clone(),
        )
    });

    let state = Arc::new(WorkerState {
        config,
        db,
        redis,
        rabbitmq,
        geo,
        analytics,
        license,
        metrics,
    });

    // Socket.IO setup for realtime click subscribers
    let (sio_layer, io) = SocketIo::builder().with_state(state.clone()).build_layer();
    io.ns("/", realtime::on_connect);

    // Consumer loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = tokio::spawn(processor::run(state.clone(), io.clone(), shutdown_rx));

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .layer(sio_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "linkrift-clicks starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the consumer finish its current event, then stop.
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(SHUTDOWN_DRAIN, consumer).await.is_err() {
        tracing::warn!("click processor did not stop before the shutdown deadline");
    }
    tracing::info!("linkrift-clicks stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
