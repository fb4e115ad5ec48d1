use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use ledger_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    NotificationHub,
    ReconciliationApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    middleware::ApiKeyMiddlewareFactory,
    routes::{
        health,
        CalculateCycleRoute,
        CancelTransactionRoute,
        CompleteCycleRoute,
        CreateTransactionRoute,
        CycleEarningsRoute,
        FlaggedAuditEntriesRoute,
        OpenCycleRoute,
        PayEarningRoute,
        PaymentWebhookRoute,
        TransactionByIdRoute,
        TransactionUpdatesRoute,
        WalletForUserRoute,
        WebhookChallengeRoute,
    },
};

const DB_POOL_SIZE: u32 = 25;
const EVENT_BUFFER_SIZE: usize = 128;
// How often abandoned notification channels are swept from the hub
const HUB_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, DB_POOL_SIZE)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🗃️ Database ready at {}", config.database_url);

    let hub = NotificationHub::default();
    let mut hooks = EventHooks::default();
    hooks.on_status_changed(hub.hook());
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let _expiry_worker = start_expiry_worker(
        db.clone(),
        producers.clone(),
        config.risk_policy,
        config.stale_transaction_timeout,
        config.expiry_sweep_interval,
    );
    let _pruner = start_hub_pruner(hub.clone());

    let srv = create_server_instance(config, db, producers, hub)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    hub: NotificationHub,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        let api = ReconciliationApi::new(db.clone(), config.risk_policy).with_producers(producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lpg::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(hub.clone()))
            .app_data(web::Data::new(options));
        // Routes that require the admin API key
        let admin_scope = web::scope("/api")
            .wrap(ApiKeyMiddlewareFactory::new(config.admin_api_key.clone()))
            .service(CreateTransactionRoute::<SqliteDatabase>::new())
            .service(TransactionByIdRoute::<SqliteDatabase>::new())
            .service(CancelTransactionRoute::<SqliteDatabase>::new())
            .service(WalletForUserRoute::<SqliteDatabase>::new())
            .service(FlaggedAuditEntriesRoute::<SqliteDatabase>::new())
            .service(OpenCycleRoute::<SqliteDatabase>::new())
            .service(CalculateCycleRoute::<SqliteDatabase>::new())
            .service(CompleteCycleRoute::<SqliteDatabase>::new())
            .service(CycleEarningsRoute::<SqliteDatabase>::new())
            .service(PayEarningRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(PaymentWebhookRoute::<SqliteDatabase>::new())
            .service(WebhookChallengeRoute::new())
            .service(TransactionUpdatesRoute::new())
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Server listening on {}:{}", config.host, config.port);
    Ok(srv)
}

fn start_hub_pruner(hub: NotificationHub) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(HUB_PRUNE_INTERVAL);
        loop {
            timer.tick().await;
            let pruned = hub.prune();
            if pruned > 0 {
                debug!("📡️ Pruned {pruned} idle notification channel(s). {} still watched", hub.watched_count());
            }
        }
    })
}
