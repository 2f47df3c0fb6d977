use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod pages;
mod ratelimit;
mod resolver;
mod routes;
mod rules;
mod schema;
mod services;
mod tracker;

use config::AppConfig;
use linkrift_shared::clients::redis::RedisClient;
use linkrift_shared::license::LicenseManager;
use resolver::Resolver;
use tracker::ClickTracker;

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

pub struct AppState {
    pub config: AppConfig,
    pub redis: RedisClient,
    pub resolver: Resolver,
    pub tracker: ClickTracker,
    pub license: Arc<LicenseManager>,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    linkrift_shared::middleware::init_tracing("linkrift-redirect");

    let config = AppConfig::load()?;
    let port = config.port;
    tracing::info!(
        port,
        local_cache_ttl = config.local_cache_ttl,
        redis_cache_ttl = config.redis_cache_ttl,
        tracker_buffer = config.tracker_buffer,
        geoip_configured = config.geoip_db_path.is_some(),
        "configuration loaded"
    );

    let metrics = linkrift_shared::middleware::init_metrics();

    let db = linkrift_shared::clients::db::create_pool(&config.database_url);
    let redis = RedisClient::connect(&config.redis_url).await?;

    let license = LicenseManager::new(config.license_key.clone());
    tokio::spawn(
        license
            .clone()
            .run_reverify_loop(Duration::from_secs(config.license_check_interval)),
    );

    let resolver = Resolver::new(
        db,
        redis.clone(),
        Duration::from_secs(config.local_cache_ttl),
        config.redis_cache_ttl,
    );

    let tracker = ClickTracker::spawn(
        redis.clone(),
        config.tracker_buffer,
        Duration::from_millis(config.tracker_flush),
    );

    let state = Arc::new(AppState {
        config,
        redis,
        resolver,
        tracker,
        license,
        metrics,
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/:short_code", get(routes::redirect::redirect))
        .route("/:short_code/verify", post(routes::verify::verify))
        .route("/:short_code/preview", get(routes::preview::preview))
        .layer(axum::middleware::from_fn(
            linkrift_shared::middleware::metrics_middleware,
        ))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Management-plane and click-processor invalidations arrive over
    // pub/sub so every replica evicts its L1 entry.
    tokio::spawn(invalidation_listener(state.clone()));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "linkrift-redirect starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Flush buffered clicks before the process exits.
    state.tracker.shutdown(SHUTDOWN_DRAIN).await;
    tracing::info!("linkrift-redirect stopped");

    Ok(())
}

async fn invalidation_listener(state: Arc<AppState>) {
    use futures::StreamExt;

    loop {
        let mut pubsub = match state.redis.pubsub().await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                tracing::warn!(error = %e, "invalidation pub/sub connect failed");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        if let Err(e) = pubsub
            .subscribe(linkrift_shared::types::LINK_INVALIDATE_CHANNEL)
            .await
        {
            tracing::warn!(error = %e, "invalidation subscribe failed");
            tokio::time::sleep(Duration::from_secs(5)).await;
            continue;
        }
        tracing::info!("invalidation listener subscribed");

        let mut messages = pubsub.on_message();
        while let Some(message) = messages.next().await {
            match message.get_payload::<String>() {
                Ok(short_code) => state.resolver.invalidate(&short_code).await,
                Err(e) => tracing::warn!(error = %e, "invalidation payload unreadable"),
            }
        }
        tracing::warn!("invalidation stream ended, reconnecting");
    }
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
