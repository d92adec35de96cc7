// engine-api: the single binary that wires config load -> logger init
// -> state store construction -> coordinator construction -> HTTP
// server bind -> graceful shutdown on SIGINT (SPEC_FULL §2
// "Process/runtime shape"), mirroring the teacher daemon's own startup
// sequence (config, then storage, then RPC server, then signal-driven
// shutdown).

mod app_state;
mod dto;
mod error_response;
mod routes;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use app_state::AppState;
use clap::Parser;
use log::info;
use metrics_exporter_prometheus::PrometheusBuilder;
use reward_common::{config::CliArgs, config::ConfigHandle, logging, time::SystemClock};
use reward_core::collaborators::{AlwaysHumanScorer, NeutralQualityScorer, QueuedSettlementAdapter};
use reward_core::coordinator::{AccrualCoordinator, Stores};
use reward_core::state::store::{InMemoryStateStore, NetworkSnapshotCache, UserStore};
use reward_core::state::types::NetworkSnapshot;
use reward_common::model::Phase;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

/// Periodically recompute the NetworkSnapshot from the store (spec §5
/// "NetworkSnapshot single-writer/many-reader refreshed on a timer"),
/// matching the teacher's own periodic-cleanup timer loop
/// (`daemon/src/rpc/mod.rs`'s websocket-security-cleanup task).
fn spawn_network_refresh(stores: Stores, config: ConfigHandle) {
    tokio::spawn(async move {
        let clock = SystemClock;
        loop {
            tokio::time::sleep(Duration::from_secs(30)).await;
            let cfg = config.current();
            let now = reward_common::time::Clock::now(&clock);
            let total_users = stores.users.total_count();
            let active_users_30d = stores.users.active_count(now.saturating_sub(30 * 86_400));
            let current = stores.network.get();
            let current_phase = Phase::advance(current.current_phase, total_users, &cfg.phase_thresholds);
            stores.network.set(NetworkSnapshot {
                total_users,
                active_users_30d,
                current_phase,
                updated_at: now,
            });
        }
    });
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logging::init_logger(&args.log_level).context("failed to initialize logger")?;

    let engine_config = args.resolve_config().context("failed to resolve engine config")?;
    let bind_address = args.bind_address.clone();
    let config = ConfigHandle::new(engine_config);

    let store = Arc::new(InMemoryStateStore::new());
    let stores = Stores {
        users: store.clone(),
        daily_counters: store.clone(),
        accrual_log: store.clone(),
        referrals: store.clone(),
        network: store.clone(),
        cards: store.clone(),
    };

    let coordinator = Arc::new(AccrualCoordinator::new(
        config.clone(),
        stores.clone(),
        AlwaysHumanScorer,
        Arc::new(QueuedSettlementAdapter::new()),
    ));

    let app_state = web::Data::new(AppState {
        coordinator,
        stores: stores.clone(),
        quality_scorer: Arc::new(NeutralQualityScorer),
        clock: Arc::new(SystemClock),
        config: config.clone(),
        in_flight: Arc::new(AtomicUsize::new(0)),
    });

    let (recorder, _) = PrometheusBuilder::new()
        .build()
        .context("failed to build Prometheus recorder")?;
    let prometheus_handle = recorder.handle();
    metrics::set_global_recorder(Box::new(recorder)).context("failed to set global metrics recorder")?;

    spawn_network_refresh(stores, config);

    info!("starting reward engine API on {bind_address}");

    let server = HttpServer::new(move || {
        let handle = prometheus_handle.clone();
        App::new()
            .app_data(app_state.clone())
            .service(routes::post_activity)
            .service(routes::get_user_state)
            .service(routes::post_referral_link)
            .service(routes::health)
            .route(
                "/metrics",
                web::get().to(move || {
                    let handle = handle.clone();
                    async move {
                        actix_web::HttpResponse::Ok()
                            .content_type("text/plain; version=0.0.4")
                            .body(handle.render())
                    }
                }),
            )
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {bind_address}"))?
    .run();

    let handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl_c")?;
    info!("shutdown signal received, stopping reward engine API");
    handle.stop(true).await;
    let _ = server_task.await;

    Ok(())
}
