//! In-process domain event bus
//!
//! Handlers publish what happened; listeners (the push notification
//! dispatcher) react without the handler waiting on them.
//!
//! ```text
//! bill handlers ─────┐
//!                    ├──▶ EventBus::publish() ──▶ broadcast channel ──▶ notification dispatcher
//! quotation handlers ┘
//! ```

use crate::billing::status::{BillType, Status};
use crate::core::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    BillCreated {
        bill_id: Uuid,
        bill_type: BillType,
        total: Money,
        installments: u32,
    },
    BillDeleted {
        bill_id: Uuid,
    },
    InstallmentStatusChanged {
        bill_id: Uuid,
        installment_id: Uuid,
        installment_number: u32,
        amount: Money,
        from: Status,
        to: Status,
    },
    ReceiptAttached {
        bill_id: Uuid,
        installment_id: Uuid,
        path: String,
    },
    ReceiptRemoved {
        bill_id: Uuid,
        installment_id: Uuid,
    },
    InstallmentsOverdue {
        count: usize,
    },
    QuoteRequested {
        quotation_id: Uuid,
        number: String,
        client_name: String,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BillCreated { .. } => "bill_created",
            DomainEvent::BillDeleted { .. } => "bill_deleted",
            DomainEvent::InstallmentStatusChanged { .. } => "installment_status_changed",
            DomainEvent::ReceiptAttached { .. } => "receipt_attached",
            DomainEvent::ReceiptRemoved { .. } => "receipt_removed",
            DomainEvent::InstallmentsOverdue { .. } => "installments_overdue",
            DomainEvent::QuoteRequested { .. } => "quote_requested",
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus, cheap to clone
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// `capacity` is how many events a slow receiver may lag behind
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all subscribers, returning how many will receive it
    ///
    /// Never fails: without subscribers the event is dropped.
    pub fn publish(&self, event: DomainEvent) -> usize {
        tracing::debug!(event = event.name(), "publishing domain event");
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Events published before this call are not received
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = DomainEvent::BillCreated {
            bill_id: Uuid::nil(),
            bill_type: BillType::Receivable,
            total: Money::from_cents(10_000),
            installments: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "bill_created");
        assert_eq!(json["bill_type"], "receivable");
        assert_eq!(json["total"], 100.0);
        assert_eq!(event.name(), "bill_created");
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let event = DomainEvent::InstallmentsOverdue { count: 4 };
        assert_eq!(bus.publish(event.clone()), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, event);
        assert!(!received.id.is_nil());
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.clone().subscribe();
        assert_eq!(bus.receiver_count(), 2);

        bus.publish(DomainEvent::BillDeleted {
            bill_id: Uuid::new_v4(),
        });

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.id, e2.id);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(DomainEvent::InstallmentsOverdue { count: 0 }), 0);
    }
}
