use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends and logs a failure instead of returning it; events never fail a request.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping domain event");
        }
    }
}

/// Domain events raised by the services after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ItemCreated { item_id: Uuid, item_code: String },
    ItemUpdated(Uuid),
    ItemDeleted {
        item_id: Uuid,
        packaging_removed: u64,
        supplier_items_removed: u64,
    },
    PackagingCreated { packaging_id: Uuid, item_id: Uuid },
    PackagingDeactivated { packaging_id: Uuid, cascaded: usize },
    SupplierSelectionsReplaced {
        item_id: Uuid,
        deactivated: u64,
        inserted: usize,
    },
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    WastageRecorded { wastage_id: Uuid, item_id: Uuid },
    ImageUploaded { image_id: Uuid, public_id: String },
    ImageDeleted { image_id: Uuid, public_id: String },
    UserLoggedIn(Uuid),
}

/// Consumes events until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ItemDeleted {
                item_id,
                packaging_removed,
                supplier_items_removed,
            } => info!(
                %item_id,
                packaging_removed,
                supplier_items_removed,
                "item deleted with dependents"
            ),
            Event::SupplierSelectionsReplaced {
                item_id,
                deactivated,
                inserted,
            } => info!(%item_id, deactivated, inserted, "supplier selections replaced"),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(%order_id, %old_status, %new_status, "order status changed"),
            other => info!(event = ?other, "domain event"),
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.emit(Event::OrderCreated(id)).await;

        assert_eq!(rx.recv().await, Some(Event::OrderCreated(id)));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::UserLoggedIn(Uuid::new_v4())).await.is_err());
        // emit swallows the same failure
        sender.emit(Event::UserLoggedIn(Uuid::new_v4())).await;
    }
}
