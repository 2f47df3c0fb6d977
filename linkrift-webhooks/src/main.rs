use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod delivery;
mod dispatcher;
mod models;
mod routes;
mod schema;
mod services;
mod signer;
mod sweep;

use config::AppConfig;
use delivery::RetryPolicy;
use linkrift_shared::clients::db::DbPool;
use linkrift_shared::clients::rabbitmq::RabbitMQClient;
use linkrift_shared::license::LicenseManager;

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

pub struct WorkerState {
    pub config: AppConfig,
    pub db: DbPool,
    pub rabbitmq: RabbitMQClient,
    pub http: reqwest::Client,
    pub retry: RetryPolicy,
    pub license: Arc<LicenseManager>,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    linkrift_shared::middleware::init_tracing("linkrift-webhooks");

    let config = AppConfig::load()?;
    let port = config.port;

    let metrics = linkrift_shared::middleware::init_metrics();

    let db = linkrift_shared::clients::db::create_pool(&config.database_url);
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let license = LicenseManager::new(config.license_key.clone());
    tokio::spawn(
        license
            .clone()
            .run_reverify_loop(Duration::from_secs(config.license_check_interval)),
    );

    let http = reqwest::Client::builder()
        .timeout(delivery::REQUEST_TIMEOUT)
        .build()
        .expect("failed to build outbound HTTP client");

    let state = Arc::new(WorkerState {
        config,
        db,
        rabbitmq,
        http,
        retry: RetryPolicy::default(),
        license,
        metrics,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = tokio::spawn(dispatcher::run(state.clone(), shutdown_rx.clone()));
    let sweeper = tokio::spawn(sweep::run(state.clone(), shutdown_rx));

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "linkrift-webhooks starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Finish the in-flight event and sweep pass, then stop.
    let _ = shutdown_tx.send(true);
    for (name, handle) in [("dispatcher", consumer), ("sweep", sweeper)] {
        if tokio::time::timeout(SHUTDOWN_DRAIN, handle).await.is_err() {
            tracing::warn!(task = name, "worker did not stop before the shutdown deadline");
        }
    }
    tracing::info!("linkrift-webhooks stopped");

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
