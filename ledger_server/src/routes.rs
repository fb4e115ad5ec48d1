//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use ledger_engine::{db_types::TransitionOutcome, LedgerBackend, NotificationHub, ReconciliationApi};
use log::*;
use serde_json::json;

use crate::{
    config::ServerOptions,
    data_objects::{
        ChallengeQuery,
        FlaggedQuery,
        JsonResponse,
        NewTransactionRequest,
        OpenCycleRequest,
        WebhookAck,
    },
    errors::ServerError,
    helpers::{read_payload, request_metadata},
    live_updates,
};

/// The largest provider notification body that will be read
pub const MAX_WEBHOOK_PAYLOAD: usize = 256 * 1024;
const DEFAULT_FLAGGED_LIMIT: i64 = 100;
const MAX_FLAGGED_LIMIT: i64 = 1_000;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Provider webhook  ----------------------------------------------------

route!(payment_webhook => Post "/webhook/payment" impl LedgerBackend);
/// Receives a payment notification from the provider.
///
/// The response is always `200 OK`, so that the provider does not keep redelivering payloads we will never accept.
/// Whether the notification was acted on is reported in the body (see [`WebhookAck`]). Bodies larger than
/// [`MAX_WEBHOOK_PAYLOAD`] are acknowledged as failed without being parsed.
pub async fn payment_webhook<B: LedgerBackend>(
    req: HttpRequest,
    payload: web::Payload,
    api: web::Data<ReconciliationApi<B>>,
    options: web::Data<ServerOptions>,
) -> HttpResponse {
    let meta = request_metadata(&req, options.get_ref());
    let ip = meta.ip_address.as_deref().unwrap_or("unknown");
    let report = match read_payload(payload, MAX_WEBHOOK_PAYLOAD).await {
        Ok(body) => {
            trace!("💻️ Payment notification from {ip}: {} bytes", body.len());
            api.ingest(&body, &meta).await
        },
        Err(e) => {
            warn!("💻️ Unreadable payment notification from {ip}. {e}");
            api.reject_payload(&e.to_string(), &meta).await
        },
    };
    if !report.success {
        debug!("💻️ Payment notification was not processed. {}", report.error.as_deref().unwrap_or_default());
    }
    HttpResponse::Ok().json(WebhookAck::from(report))
}

route!(webhook_challenge => Get "/webhook/payment");
/// The provider verifies a webhook URL by sending a `challenge` query parameter, which must be echoed back verbatim.
pub async fn webhook_challenge(query: web::Query<ChallengeQuery>) -> HttpResponse {
    match query.into_inner().challenge {
        Some(challenge) => {
            debug!("💻️ Answering webhook verification challenge");
            HttpResponse::Ok().content_type("text/plain").body(challenge)
        },
        None => HttpResponse::Ok().json(JsonResponse::success("Webhook endpoint is live")),
    }
}

//----------------------------------------------   Live updates  --------------------------------------------------------

route!(transaction_updates => Get "/ws/transactions/{external_id}");
pub async fn transaction_updates(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Payload,
    hub: web::Data<NotificationHub>,
) -> Result<HttpResponse, actix_web::Error> {
    let external_id = path.into_inner();
    debug!("💻️ Websocket subscription request for {external_id}");
    live_updates::subscribe(&req, body, external_id, hub.get_ref().clone())
}

//----------------------------------------------   Transactions  --------------------------------------------------------

route!(create_transaction => Post "/transactions" impl LedgerBackend);
/// Registers a pending transaction. `expected_amount` and `expected_fiat_amount` are given in micro-units.
pub async fn create_transaction<B: LedgerBackend>(
    body: web::Json<NewTransactionRequest>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ Create pending transaction request for {}", request.external_id);
    let tx = api.create_pending_transaction(request.into()).await?;
    Ok(HttpResponse::Created().json(tx))
}

route!(transaction_by_id => Get "/transactions/{external_id}" impl LedgerBackend);
pub async fn transaction_by_id<B: LedgerBackend>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let external_id = path.into_inner();
    trace!("💻️ Fetching transaction {external_id}");
    let tx = api
        .fetch_transaction(&external_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No transaction with external id {external_id}")))?;
    Ok(HttpResponse::Ok().json(tx))
}

route!(cancel_transaction => Post "/transactions/{external_id}/cancel" impl LedgerBackend);
/// Cancels a pending or processing transaction. Cancelling a transaction that has already reached a final state is
/// answered with `409 Conflict` and leaves it untouched.
pub async fn cancel_transaction<B: LedgerBackend>(
    req: HttpRequest,
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let external_id = path.into_inner();
    let meta = request_metadata(&req, options.get_ref());
    info!("💻️ Cancellation requested for {external_id}");
    match api.cancel_transaction(&external_id, &meta).await? {
        TransitionOutcome::Applied { transaction } => Ok(HttpResponse::Ok().json(transaction)),
        TransitionOutcome::NoOp { transaction, reason } => {
            Err(ServerError::Conflict(format!("Transaction {} was not cancelled. {reason}", transaction.external_id)))
        },
    }
}

route!(wallet_for_user => Get "/wallets/{user_id}" impl LedgerBackend);
pub async fn wallet_for_user<B: LedgerBackend>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    trace!("💻️ Fetching wallet for {user_id}");
    let wallet = api
        .fetch_wallet_for_user(&user_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} has no wallet")))?;
    Ok(HttpResponse::Ok().json(wallet))
}

//----------------------------------------------   Audit  ---------------------------------------------------------------

route!(flagged_audit_entries => Get "/audit/flagged" impl LedgerBackend);
pub async fn flagged_audit_entries<B: LedgerBackend>(
    query: web::Query<FlaggedQuery>,
    api: web::Data<ReconciliationApi<B>>,
) -> HttpResponse {
    let limit = query.limit.unwrap_or(DEFAULT_FLAGGED_LIMIT).clamp(1, MAX_FLAGGED_LIMIT);
    trace!("💻️ Fetching up to {limit} flagged audit entries");
    let entries = api.auditor().flagged_entries(limit).await;
    HttpResponse::Ok().json(entries)
}

//----------------------------------------------   Commissions  ---------------------------------------------------------

route!(open_cycle => Post "/commissions/cycles" impl LedgerBackend);
pub async fn open_cycle<B: LedgerBackend>(
    body: web::Json<OpenCycleRequest>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    info!("💻️ Opening {} commission cycle {} to {}", request.cycle_type, request.start_date, request.end_date);
    let cycle = api.commissions().open_cycle(request.into()).await?;
    Ok(HttpResponse::Created().json(cycle))
}

route!(calculate_cycle => Post "/commissions/cycles/{cycle_id}/calculate" impl LedgerBackend);
pub async fn calculate_cycle<B: LedgerBackend>(
    path: web::Path<i64>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let cycle_id = path.into_inner();
    info!("💻️ Calculating commission cycle #{cycle_id}");
    let calculation = api.commissions().calculate_cycle(cycle_id).await?;
    Ok(HttpResponse::Ok().json(calculation))
}

route!(complete_cycle => Post "/commissions/cycles/{cycle_id}/complete" impl LedgerBackend);
pub async fn complete_cycle<B: LedgerBackend>(
    path: web::Path<i64>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let cycle_id = path.into_inner();
    info!("💻️ Completing commission cycle #{cycle_id}");
    let cycle = api.commissions().complete_cycle(cycle_id).await?;
    Ok(HttpResponse::Ok().json(cycle))
}

route!(cycle_earnings => Get "/commissions/cycles/{cycle_id}/earnings" impl LedgerBackend);
pub async fn cycle_earnings<B: LedgerBackend>(
    path: web::Path<i64>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let cycle_id = path.into_inner();
    trace!("💻️ Fetching earnings for commission cycle #{cycle_id}");
    let earnings = api.commissions().earnings_for_cycle(cycle_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "cycle_id": cycle_id, "earnings": earnings })))
}

route!(pay_earning => Post "/commissions/earnings/{earning_id}/pay" impl LedgerBackend);
pub async fn pay_earning<B: LedgerBackend>(
    path: web::Path<i64>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let earning_id = path.into_inner();
    info!("💻️ Marking earning #{earning_id} as paid");
    let earning = api.commissions().mark_earning_paid(earning_id).await?;
    Ok(HttpResponse::Ok().json(earning))
}
