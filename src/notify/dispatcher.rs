//! Turns domain events into push notifications
//!
//! ```text
//! EventBus ──▶ NotificationDispatcher::run() ──▶ message_for() ──▶ PushNotifier::send()
//! ```

use super::{PushMessage, PushNotifier};
use crate::core::events::{DomainEvent, EventBus, EventEnvelope};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Push message for an event, `None` for events nobody is alerted about
pub fn message_for(event: &DomainEvent, audience: &str) -> Option<PushMessage> {
    let (title, body, url) = match event {
        DomainEvent::QuoteRequested {
            number,
            client_name,
            ..
        } => (
            "New quote request".to_string(),
            format!("{} from {}", number, client_name),
            "/admin/quotations",
        ),
        DomainEvent::InstallmentsOverdue { count } if *count > 0 => (
            "Overdue installments".to_string(),
            format!("{} installment(s) became overdue", count),
            "/admin/bills?status=overdue",
        ),
        DomainEvent::ReceiptAttached { bill_id, .. } => (
            "Payment receipt attached".to_string(),
            format!("A receipt was attached to bill {}", bill_id),
            "/admin/bills",
        ),
        _ => return None,
    };
    Some(PushMessage {
        title,
        body,
        url: Some(url.to_string()),
        audience: audience.to_string(),
    })
}

pub struct NotificationDispatcher {
    notifier: Arc<dyn PushNotifier>,
    audience: String,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn PushNotifier>, audience: impl Into<String>) -> Self {
        Self {
            notifier,
            audience: audience.into(),
        }
    }

    /// Subscribe now and process events on a background task
    pub fn spawn(self, bus: &EventBus) -> JoinHandle<()> {
        let receiver = bus.subscribe();
        tokio::spawn(self.run(receiver))
    }

    async fn run(self, mut receiver: Receiver<EventEnvelope>) {
        loop {
            match receiver.recv().await {
                Ok(envelope) => {
                    let Some(message) = message_for(&envelope.event, &self.audience) else {
                        continue;
                    };
                    if let Err(e) = self.notifier.send(&message).await {
                        tracing::warn!(
                            event = envelope.event.name(),
                            error = %e,
                            "failed to push notification"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification dispatcher lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
