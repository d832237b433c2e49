use serde::Serialize;
use tenancy_models::Hostname;
use tokio::sync::broadcast;

/// Notifications raised while identifying and switching tenants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TenancyEvent {
    /// The environment's current hostname was explicitly replaced
    Switched { hostname: Hostname },
    /// A strategy matched the request to a registered hostname
    Identified { hostname: Hostname },
    /// A strategy found nothing for the request host
    NoneFound { host: String },
    UnderMaintenance { hostname: Hostname },
    Redirected { hostname: Hostname, location: String },
    Secured { hostname: Hostname, location: String },
}

impl TenancyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Switched { .. } => "hostnames.switched",
            Self::Identified { .. } => "hostnames.identified",
            Self::NoneFound { .. } => "hostnames.none_found",
            Self::UnderMaintenance { .. } => "hostnames.under_maintenance",
            Self::Redirected { .. } => "hostnames.redirected",
            Self::Secured { .. } => "hostnames.secured",
        }
    }
}

/// Synchronous, fire-and-forget delivery of tenancy events.
///
/// Implementations must not block: dispatch happens while the environment
/// holds its binding lock.
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: TenancyEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Default)]
pub struct NullDispatcher;

impl EventDispatcher for NullDispatcher {
    fn dispatch(&self, _event: TenancyEvent) {}
}

/// Fans events out to any number of subscribers over a tokio broadcast
/// channel. Subscribers that fall behind lose the oldest events.
#[derive(Debug, Clone)]
pub struct BroadcastDispatcher {
    sender: broadcast::Sender<TenancyEvent>,
}

impl Default for BroadcastDispatcher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl BroadcastDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TenancyEvent> {
        self.sender.subscribe()
    }
}

impl EventDispatcher for BroadcastDispatcher {
    fn dispatch(&self, event: TenancyEvent) {
        tracing::trace!(event = event.name(), "Dispatching tenancy event");
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn switched(fqdn: &str) -> TenancyEvent {
        TenancyEvent::Switched {
            hostname: Hostname::new(fqdn),
        }
    }

    #[test]
    fn test_dispatch_without_subscribers() {
        let dispatcher = BroadcastDispatcher::default();
        dispatcher.dispatch(switched("a.example.com"));
    }

    #[test]
    fn test_every_subscriber_receives_event() {
        let dispatcher = BroadcastDispatcher::new(8);
        let mut first = dispatcher.subscribe();
        let mut second = dispatcher.subscribe();

        let event = switched("a.example.com");
        dispatcher.dispatch(event.clone());

        assert_eq!(first.try_recv().unwrap(), event);
        assert_eq!(second.try_recv().unwrap(), event);
        assert!(matches!(first.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_slow_subscriber_lags() {
        let dispatcher = BroadcastDispatcher::new(2);
        let mut receiver = dispatcher.subscribe();

        for fqdn in ["a.example.com", "b.example.com", "c.example.com"] {
            dispatcher.dispatch(switched(fqdn));
        }

        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Lagged(1))));
        match receiver.try_recv().unwrap() {
            TenancyEvent::Switched { hostname } => assert_eq!(hostname.fqdn, "b.example.com"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_event_serialization_tag() {
        let json = serde_json::to_string(&TenancyEvent::NoneFound {
            host: "unknown.example.com".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"none_found","host":"unknown.example.com"}"#);
    }
}
