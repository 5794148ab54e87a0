//! Domain events for live availability updates. An explicit channel owned by
//! the app state rather than a process-global emitter; delivery is
//! best-effort and never gates a reservation.

use rifa_model::RaffleId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum DomainEvent {
    #[serde(rename = "selection:created")]
    SelectionCreated {
        raffle_id: RaffleId,
        number: u32,
        page_number: u32,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Best-effort publish. A send with no live subscribers is not an error.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

/// Default consumer: logs events for operators. Push notification fan-out is
/// out of scope; clients poll the availability endpoint.
pub fn spawn_event_logger(bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => debug!(?event, "domain event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event logger lagged, skipping");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new(8);
        bus.publish(DomainEvent::SelectionCreated {
            raffle_id: RaffleId::parse("r1").expect("id"),
            number: 5,
            page_number: 1,
        });
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let event = DomainEvent::SelectionCreated {
            raffle_id: RaffleId::parse("r1").expect("id"),
            number: 5,
            page_number: 1,
        };
        bus.publish(event.clone());
        assert_eq!(rx.recv().await.expect("event"), event);
    }

    #[test]
    fn selection_created_serializes_with_the_wire_event_name() {
        let event = DomainEvent::SelectionCreated {
            raffle_id: RaffleId::parse("r1").expect("id"),
            number: 5,
            page_number: 1,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["event"], "selection:created");
        assert_eq!(value["number"], 5);
    }
}
