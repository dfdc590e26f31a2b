use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after their transactions commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order lifecycle
    OrderPlaced(Uuid),
    OrderCompleted(Uuid),
    OrderCanceled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Inventory
    StockAdjusted {
        product_id: Uuid,
        delta: i32,
        remaining: i32,
    },
    LowStock {
        product_id: Uuid,
        stock: i32,
        threshold: i32,
    },

    // Catalog
    CategoryDeleted {
        category_id: Uuid,
        products_removed: u64,
    },

    // Deployment
    RestaurantOnboarded(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender over the given channel.
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. A full or closed channel is reported
    /// to the caller; events are advisory and never gate a transaction.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Runs as a background task
/// for the lifetime of the process.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::LowStock {
                product_id,
                stock,
                threshold,
            } => {
                warn!(
                    product_id = %product_id,
                    stock = stock,
                    threshold = threshold,
                    "product is running low on stock"
                );
            }
            Event::CategoryDeleted {
                category_id,
                products_removed,
            } => {
                info!(
                    category_id = %category_id,
                    products_removed = products_removed,
                    "category deleted with its products"
                );
            }
            other => {
                info!(event = ?other, "event processed");
            }
        }
    }
    info!("event channel closed; processor exiting");
}
