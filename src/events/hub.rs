use crate::placement::PlacementSelection;
use serde::Serialize;
use tokio::sync::broadcast;

/// Events that flow from placement and inventory changes to SSE subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    /// A placement decision was written back to its provisioning request.
    PlacementSelected {
        request_id: i64,
        selection: PlacementSelection,
        /// Reservation opened for the selection, if one was requested.
        reservation_id: Option<i64>,
    },

    /// Placement ended without a destination.
    PlacementFailed { request_id: i64, kind: String, message: String },

    ReservationOpened { reservation_id: i64, host_id: Option<i64>, storage_id: Option<i64> },

    ReservationReleased { reservation_id: i64 },

    /// The stored inventory was swapped for a new snapshot.
    InventoryReplaced { clusters: usize, hosts: usize, storages: usize },
}

impl Event {
    /// Returns the SSE event type name for this event variant.
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::PlacementSelected { .. } => "placement_selected",
            Self::PlacementFailed { .. } => "placement_failed",
            Self::ReservationOpened { .. } => "reservation_opened",
            Self::ReservationReleased { .. } => "reservation_released",
            Self::InventoryReplaced { .. } => "inventory_replaced",
        }
    }
}

/// Broadcast hub between the API handlers that change state and the SSE
/// endpoint. Subscribers that fall more than `capacity` events behind get a
/// `Lagged` error and miss the intermediate events.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<Event>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fire-and-forget publish. Having no subscribers is not an error.
    pub fn publish(&self, event: Event) {
        let event_type = event.event_type();
        if self.sender.send(event).is_err() {
            tracing::trace!(event_type, "No SSE subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = EventHub::new(8);
        let mut rx = hub.subscribe();
        hub.publish(Event::ReservationReleased { reservation_id: 7 });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "reservation_released");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "ReservationReleased");
        assert_eq!(json["data"]["reservation_id"], 7);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let hub = EventHub::new(8);
        hub.publish(Event::InventoryReplaced { clusters: 0, hosts: 0, storages: 0 });
    }
}
