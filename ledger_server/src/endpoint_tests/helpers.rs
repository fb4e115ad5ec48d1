use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::Utc;
use ledger_common::Secret;
use ledger_engine::{
    db_types::{Amount, PendingTransaction, TransactionStatus, TransactionType, Wallet},
    ReconciliationApi,
    RiskPolicy,
};
use log::debug;

use super::mocks::{mock_backend, MockBackend};
use crate::{config::ServerOptions, middleware::ApiKeyMiddlewareFactory, routes::*};

pub const TEST_API_KEY: &str = "test-admin-key";

/// Registers every route against a mock backend prepared by `setup`, with the admin scope behind [`TEST_API_KEY`].
pub fn configure_with(setup: fn(&mut MockBackend)) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = ReconciliationApi::new(mock_backend(setup), RiskPolicy::default());
        let admin_scope = web::scope("/api")
            .wrap(ApiKeyMiddlewareFactory::new(Secret::new(TEST_API_KEY.to_string())))
            .service(CreateTransactionRoute::<MockBackend>::new())
            .service(TransactionByIdRoute::<MockBackend>::new())
            .service(CancelTransactionRoute::<MockBackend>::new())
            .service(WalletForUserRoute::<MockBackend>::new())
            .service(FlaggedAuditEntriesRoute::<MockBackend>::new())
            .service(OpenCycleRoute::<MockBackend>::new())
            .service(CompleteCycleRoute::<MockBackend>::new())
            .service(CycleEarningsRoute::<MockBackend>::new());
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(ServerOptions::default()))
            .service(health)
            .service(PaymentWebhookRoute::<MockBackend>::new())
            .service(WebhookChallengeRoute::new())
            .service(admin_scope);
    }
}

pub async fn send(req: TestRequest, setup: fn(&mut MockBackend)) -> (StatusCode, String) {
    let app = App::new().configure(configure_with(setup));
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn get_request(api_key: &str, path: &str, setup: fn(&mut MockBackend)) -> (StatusCode, String) {
    let mut req = TestRequest::get().uri(path);
    if !api_key.is_empty() {
        req = req.insert_header(("X-Api-Key", api_key));
    }
    send(req, setup).await
}

pub async fn post_request(
    api_key: &str,
    path: &str,
    body: serde_json::Value,
    setup: fn(&mut MockBackend),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if !api_key.is_empty() {
        req = req.insert_header(("X-Api-Key", api_key));
    }
    send(req, setup).await
}

/// A backend that is never expected to be asked anything besides the audit log.
pub fn untouched(_: &mut MockBackend) {}

pub fn wallet() -> Wallet {
    let now = Utc::now();
    Wallet {
        id: 7,
        user_id: "alice".to_string(),
        balance: Amount::from_units(5),
        frozen_balance: Amount::default(),
        total_deposited: Amount::from_units(5),
        total_withdrawn: Amount::default(),
        created_at: now,
        updated_at: now,
    }
}

pub fn transaction(status: TransactionStatus) -> PendingTransaction {
    let now = Utc::now();
    PendingTransaction {
        id: 1,
        external_id: "tx-100".to_string(),
        wallet_id: 7,
        transaction_type: TransactionType::UsdtPurchase,
        expected_amount: Amount::from_units(100),
        expected_fiat_amount: Amount::from_units(525),
        exchange_rate: None,
        status,
        previous_status: None,
        created_at: now,
        updated_at: now,
        processed_at: None,
    }
}
