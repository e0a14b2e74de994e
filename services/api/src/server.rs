use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryRoomFiles, LogNotifier};
use crate::routes::build_app;
use axum_prometheus::PrometheusMetricLayer;
use campaign_desk::config::AppConfig;
use campaign_desk::error::AppError;
use campaign_desk::telemetry;
use campaign_desk::workflows::campaigns::{
    CampaignService, ChatReaper, MemoryStore, ReaperSettings,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.no_reaper {
        config.reaper.enabled = false;
    }

    telemetry::init(config.environment, &config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(CampaignService::new(store.clone(), Arc::new(LogNotifier)));

    let reaper = if config.reaper.enabled {
        let settings = ReaperSettings {
            interval: config.reaper.interval,
            lease_ttl: config.reaper.lease_ttl,
            ..ReaperSettings::default()
        };
        let reaper = Arc::new(ChatReaper::new(
            store,
            Arc::new(InMemoryRoomFiles::default()),
            settings,
        ));
        reaper.start();
        Some(reaper)
    } else {
        info!("chat reaper disabled for this instance");
        None
    };

    let app = build_app(service, app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "campaign desk ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    if let Some(handle) = reaper.and_then(|reaper| reaper.stop()) {
        if let Err(err) = handle.await {
            warn!(error = %err, "chat reaper task ended abnormally");
        }
    }
    info!("campaign desk stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
