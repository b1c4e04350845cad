use crate::cli::ServeArgs;
use crate::infra::{load_scorer, open_store, AppState};
use crate::routes::with_monitoring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use wellbeing_monitor::config::AppConfig;
use wellbeing_monitor::error::AppError;
use wellbeing_monitor::monitoring::MonitoringService;
use wellbeing_monitor::store::{InMemoryStore, ResponseStore, RosterDirectory};
use wellbeing_monitor::surveys::ResponseScorer;
use wellbeing_monitor::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(database) = args.database.take() {
        config.storage.database_path = Some(database);
    }

    telemetry::init(&config.telemetry)?;

    let scorer = load_scorer(&config.monitoring)?;
    info!(rules = %scorer.config().version, "scoring rules loaded");

    match config.storage.database_path.clone() {
        Some(path) => {
            let store = open_store(&path, &config.monitoring)?;
            info!(database = %path.display(), "using sqlite store");
            serve(store, scorer, &config).await
        }
        None => {
            info!("no database configured, responses are kept in memory");
            serve(InMemoryStore::new(), scorer, &config).await
        }
    }
}

async fn serve<S>(store: S, scorer: ResponseScorer, config: &AppConfig) -> Result<(), AppError>
where
    S: ResponseStore + RosterDirectory + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(MonitoringService::new(
        Arc::new(store),
        scorer,
        config.monitoring.settings(),
    ));

    let app = with_monitoring_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "wellbeing monitor ready");

    axum::serve(listener, app).await?;
    Ok(())
}
