//! Event broadcaster.
//!
//! Publishes state changes to real-time subscribers through the subscriber
//! server's broadcast channel. Fire-and-forget: with nobody connected the
//! line is simply dropped.

use homeguard_protocol::{BroadcastEvent, Outbound, SubscriberId};
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    outbound: broadcast::Sender<Outbound>,
}

impl EventBroadcaster {
    #[must_use]
    pub fn new(outbound: broadcast::Sender<Outbound>) -> Self {
        Self { outbound }
    }

    /// Send `event` to every subscriber. Returns how many were listening.
    pub fn publish(&self, event: &BroadcastEvent) -> usize {
        self.send(Outbound::broadcast(event.to_json()))
    }

    /// Send a line to one subscriber only.
    pub fn reply(&self, subscriber: SubscriberId, text: impl Into<String>) -> usize {
        self.send(Outbound::reply(subscriber, text))
    }

    fn send(&self, outbound: Outbound) -> usize {
        match self.outbound.send(outbound) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(dropped)) => {
                trace!(text = %dropped.text, "No subscribers, line dropped");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let (tx, _) = broadcast::channel(4);
        let broadcaster = EventBroadcaster::new(tx);
        assert_eq!(broadcaster.publish(&BroadcastEvent::bulb(true)), 0);
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let (tx, mut rx) = broadcast::channel(4);
        let broadcaster = EventBroadcaster::new(tx);

        assert_eq!(broadcaster.publish(&BroadcastEvent::bulb(false)), 1);
        let line = rx.try_recv().unwrap();
        assert_eq!(line.target, None);
        assert_eq!(line.text, r#"{"bulb":"off"}"#);
    }

    #[test]
    fn test_reply_is_addressed() {
        let (tx, mut rx) = broadcast::channel(4);
        let broadcaster = EventBroadcaster::new(tx);
        let subscriber = SubscriberId::new();

        broadcaster.reply(subscriber, "DOOR_OPEN_OK");
        let line = rx.try_recv().unwrap();
        assert!(line.is_for(subscriber));
        assert!(!line.is_for(SubscriberId::new()));
    }
}
