//! Websocket push of transaction status changes.
//!
//! A client opens `/ws/transactions/{external_id}` and receives one JSON [`TransactionNotification`] per status change
//! of that transaction, until either side closes the connection. Nothing is replayed: changes that happened before the
//! client subscribed are not sent.
use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{CloseReason, Message, MessageStream, Session};
use futures::StreamExt;
use ledger_engine::{NotificationHub, TransactionNotification};
use log::*;
use tokio::sync::broadcast::{error::RecvError, Receiver};

/// Upgrades the request to a websocket and starts forwarding notifications for `external_id` to it.
pub fn subscribe(
    req: &HttpRequest,
    body: web::Payload,
    external_id: String,
    hub: NotificationHub,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, msg_stream) = actix_ws::handle(req, body)?;
    let updates = hub.subscribe(&external_id);
    info!("📡️ Websocket client subscribed to {external_id}");
    actix_web::rt::spawn(forward_updates(external_id, session, msg_stream, updates, hub));
    Ok(response)
}

async fn forward_updates(
    external_id: String,
    mut session: Session,
    mut msg_stream: MessageStream,
    mut updates: Receiver<TransactionNotification>,
    hub: NotificationHub,
) {
    let close_reason = loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(notification) => {
                    let text = match serde_json::to_string(&notification) {
                        Ok(t) => t,
                        Err(e) => {
                            error!("📡️ Could not serialize notification for {external_id}. {e}");
                            continue;
                        },
                    };
                    if session.text(text).await.is_err() {
                        debug!("📡️ Websocket for {external_id} closed while sending");
                        break None;
                    }
                },
                Err(RecvError::Lagged(n)) => {
                    warn!("📡️ Websocket client for {external_id} is lagging. {n} notifications were skipped");
                },
                Err(RecvError::Closed) => break None,
            },
            msg = msg_stream.next() => match msg {
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                },
                Some(Ok(Message::Close(reason))) => break reason,
                // Clients have nothing to tell us
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    warn!("📡️ Websocket protocol error on {external_id}. {e}");
                    break None;
                },
                None => break None,
            },
        }
    };
    let _ = session.close(close_reason.or_else(|| Some(CloseReason::from(actix_ws::CloseCode::Normal)))).await;
    drop(updates);
    let pruned = hub.prune();
    debug!("📡️ Websocket client for {external_id} disconnected. {pruned} idle channel(s) pruned");
}
