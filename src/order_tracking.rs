//! Device-local record of in-flight orders, as kept by the customer-facing
//! page between status polls.
//!
//! This cache is a disposable hint, not a second source of truth: the
//! server's order status is authoritative, and callers reconcile through
//! the status endpoint before trusting anything recorded here. Entries are
//! serde-serializable so the client can persist them on the device.

use crate::entities::order::OrderStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entries older than this are dropped on pruning.
const RETENTION_HOURS: i64 = 24;

/// One locally tracked order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedOrder {
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
}

/// The device-local order list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderTracker {
    entries: Vec<TrackedOrder>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly placed order.
    pub fn record(&mut self, order_id: Uuid, created_at: DateTime<Utc>, status: OrderStatus) {
        self.entries.push(TrackedOrder {
            order_id,
            created_at,
            status,
        });
    }

    /// Drops entries older than 24 hours and entries already COMPLETED.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::hours(RETENTION_HOURS);
        self.entries
            .retain(|e| e.created_at > cutoff && e.status != OrderStatus::Completed);
    }

    /// The most recently placed entry still being tracked.
    pub fn latest(&self) -> Option<&TrackedOrder> {
        self.entries.iter().max_by_key(|e| e.created_at)
    }

    /// Writes a status fetched from the server back onto the local entry.
    /// Unknown ids are ignored: the server may know orders this device
    /// never placed, and vice versa after a cache wipe.
    pub fn reconcile(&mut self, order_id: Uuid, status: OrderStatus) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.order_id == order_id) {
            entry.status = status;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(entries: Vec<(i64, OrderStatus)>, now: DateTime<Utc>) -> OrderTracker {
        let mut tracker = OrderTracker::new();
        for (hours_ago, status) in entries {
            tracker.record(Uuid::new_v4(), now - Duration::hours(hours_ago), status);
        }
        tracker
    }

    #[test]
    fn prune_drops_stale_entries() {
        let now = Utc::now();
        let mut tracker = tracker_with(
            vec![(1, OrderStatus::Pending), (25, OrderStatus::Pending)],
            now,
        );

        tracker.prune(now);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn prune_drops_completed_entries() {
        let now = Utc::now();
        let mut tracker = tracker_with(
            vec![
                (1, OrderStatus::Completed),
                (2, OrderStatus::Pending),
                (3, OrderStatus::InProgress),
            ],
            now,
        );

        tracker.prune(now);
        assert_eq!(tracker.len(), 2);
        assert!(tracker
            .latest()
            .map(|e| e.status != OrderStatus::Completed)
            .unwrap_or(false));
    }

    #[test]
    fn latest_returns_most_recent() {
        let now = Utc::now();
        let mut tracker = OrderTracker::new();
        let older = Uuid::new_v4();
        let newer = Uuid::new_v4();
        tracker.record(older, now - Duration::hours(3), OrderStatus::Pending);
        tracker.record(newer, now - Duration::hours(1), OrderStatus::Pending);

        assert_eq!(tracker.latest().unwrap().order_id, newer);
    }

    #[test]
    fn reconcile_updates_status_in_place() {
        let now = Utc::now();
        let mut tracker = OrderTracker::new();
        let id = Uuid::new_v4();
        tracker.record(id, now, OrderStatus::Pending);

        tracker.reconcile(id, OrderStatus::InProgress);
        assert_eq!(tracker.latest().unwrap().status, OrderStatus::InProgress);

        // unknown ids are ignored
        tracker.reconcile(Uuid::new_v4(), OrderStatus::Completed);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn round_trips_through_serde() {
        let now = Utc::now();
        let mut tracker = OrderTracker::new();
        tracker.record(Uuid::new_v4(), now, OrderStatus::Pending);

        let json = serde_json::to_string(&tracker).unwrap();
        let restored: OrderTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 1);
    }
}
