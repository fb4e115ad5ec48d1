//! Live transaction notifications.
//!
//! Subscribers register interest in a single transaction (by external id) and receive a
//! [`TransactionNotification`] every time that transaction changes status. Delivery is best-effort and at-most-once:
//! a notification sent while nobody is listening is simply dropped.
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
};

use ledger_common::Amount;
use log::*;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{db_types::TransactionStatus, events::TransactionStatusEvent};

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Confirmed,
    Failed,
    Processing,
    Expired,
}

impl NotificationStatus {
    pub fn from_status(status: TransactionStatus) -> Option<Self> {
        match status {
            TransactionStatus::Pending => None,
            TransactionStatus::Processing => Some(Self::Processing),
            TransactionStatus::Completed => Some(Self::Confirmed),
            TransactionStatus::Failed | TransactionStatus::Cancelled => Some(Self::Failed),
            TransactionStatus::Expired => Some(Self::Expired),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAmounts {
    pub amount: Amount,
    pub fiat_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionNotification {
    pub transaction_id: String,
    pub status: NotificationStatus,
    pub amounts: NotificationAmounts,
    pub message: String,
}

impl TransactionNotification {
    pub fn from_event(event: &TransactionStatusEvent) -> Option<Self> {
        let status = NotificationStatus::from_status(event.status)?;
        let message = match event.status {
            TransactionStatus::Completed => format!("Payment confirmed. {} credited.", event.expected_amount),
            TransactionStatus::Failed => "Payment failed.".to_string(),
            TransactionStatus::Cancelled => "Transaction cancelled.".to_string(),
            TransactionStatus::Processing => "Payment is being processed.".to_string(),
            TransactionStatus::Expired => "Payment window expired.".to_string(),
            TransactionStatus::Pending => return None,
        };
        Some(Self {
            transaction_id: event.external_id.clone(),
            status,
            amounts: NotificationAmounts { amount: event.expected_amount, fiat_amount: event.expected_fiat_amount },
            message,
        })
    }
}

/// An in-process hub of broadcast channels, one per watched transaction.
#[derive(Clone)]
pub struct NotificationHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<TransactionNotification>>>>,
    capacity: usize,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self { channels: Arc::new(Mutex::new(HashMap::new())), capacity: capacity.max(1) }
    }

    // A panic while holding the lock cannot leave the map in an inconsistent state, so poisoning is ignored.
    fn channels(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<TransactionNotification>>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self, external_id: &str) -> broadcast::Receiver<TransactionNotification> {
        let mut channels = self.channels();
        let sender = channels.entry(external_id.to_string()).or_insert_with(|| broadcast::channel(self.capacity).0);
        trace!("📡️ New subscriber for {external_id}");
        sender.subscribe()
    }

    /// Pushes the notification to every live subscriber of the transaction, and returns how many there were.
    pub fn notify(&self, notification: TransactionNotification) -> usize {
        let mut channels = self.channels();
        let id = notification.transaction_id.clone();
        let Some(sender) = channels.get(&id) else {
            trace!("📡️ Nobody is watching {id}");
            return 0;
        };
        match sender.send(notification) {
            Ok(n) => {
                debug!("📡️ Notified {n} subscriber(s) of {id}");
                n
            },
            Err(_) => {
                channels.remove(&id);
                trace!("📡️ All subscribers for {id} have gone. Channel removed.");
                0
            },
        }
    }

    /// Drops channels that no longer have any receivers.
    pub fn prune(&self) -> usize {
        let mut channels = self.channels();
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    pub fn watched_count(&self) -> usize {
        self.channels().len()
    }

    /// A status-change hook that forwards events to this hub.
    pub fn hook(&self) -> impl Fn(TransactionStatusEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync {
        let hub = self.clone();
        move |event| {
            let hub = hub.clone();
            Box::pin(async move {
                if let Some(notification) = TransactionNotification::from_event(&event) {
                    hub.notify(notification);
                }
            })
        }
    }
}
