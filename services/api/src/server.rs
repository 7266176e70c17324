use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryRollupSource};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use crm_engagement::config::{AppConfig, EngagementConfig};
use crm_engagement::error::AppError;
use crm_engagement::rollups::{CsvRollupSource, RefreshSummary, RollupSource};
use crm_engagement::service::EngagementService;
use crm_engagement::telemetry;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let addr = config.server.socket_addr()?;
    info!(?config.environment, "starting principal engagement service");

    match config.engagement.rollup_csv.clone() {
        Some(path) => {
            let source = Arc::new(CsvRollupSource::open(path)?);
            serve(source, &config.engagement, addr).await
        }
        None => {
            warn!("ENGAGEMENT_ROLLUP_CSV not set; serving an empty in-memory rollup source");
            let source = Arc::new(InMemoryRollupSource::default());
            serve(source, &config.engagement, addr).await
        }
    }
}

async fn serve<S>(
    source: Arc<S>,
    engagement: &EngagementConfig,
    addr: SocketAddr,
) -> Result<(), AppError>
where
    S: RollupSource + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = EngagementService::new(source);
    if let Some(interval) = engagement.refresh_interval {
        spawn_refresh_task(service.clone(), interval, engagement.source_timeout);
    }

    let app = with_service_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(%addr, "principal engagement service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_refresh_task<S>(service: EngagementService<S>, interval: Duration, timeout: Duration)
where
    S: RollupSource + 'static,
{
    info!(interval_secs = interval.as_secs(), "periodic rollup refresh enabled");
    let in_flight = Arc::new(AtomicBool::new(false));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick fires immediately; the source was loaded at startup
        ticker.tick().await;
        loop {
            ticker.tick().await;
            refresh_with_timeout(service.clone(), timeout, in_flight.clone()).await;
        }
    });
}

/// Clears the in-flight flag when the blocking refresh ends, even on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs a source refresh on the blocking pool, giving up after `timeout`.
///
/// A refresh that outlives its timeout keeps `in_flight` set until it
/// returns; calls made meanwhile are skipped.
pub(crate) async fn refresh_with_timeout<S>(
    service: EngagementService<S>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
) -> Option<RefreshSummary>
where
    S: RollupSource + 'static,
{
    if in_flight.swap(true, Ordering::AcqRel) {
        warn!("previous rollup refresh still running; skipping");
        return None;
    }
    let guard = InFlightGuard(in_flight);

    let task = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        service.refresh()
    });
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(summary))) => Some(summary),
        // the service already logged the source error
        Ok(Ok(Err(_))) => None,
        Ok(Err(join_error)) => {
            warn!(error = %join_error, "rollup refresh task failed");
            None
        }
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "rollup refresh timed out"
            );
            None
        }
    }
}
