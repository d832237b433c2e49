// Current hostname binding for a single request

use crate::error::Result;
use crate::events::{EventDispatcher, TenancyEvent};
use crate::extractor::HostnameIdentification;
use crate::request::RequestHost;
use std::sync::Arc;
use tenancy_models::Hostname;
use tokio::sync::Mutex;

/// How the bound hostname got there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// Result of running the registered identification strategy
    Identified,
    /// Set through an explicit switch
    Switched,
}

enum Binding {
    Unbound,
    Pending(Arc<dyn HostnameIdentification>),
    Bound {
        hostname: Option<Hostname>,
        source: BindingSource,
    },
}

/// Single-slot, per-request binding of the active hostname.
///
/// Transitions:
/// - `Unbound -> Pending` on `register`
/// - `Pending -> Bound` on the first `resolve` (the strategy runs once)
/// - any state `-> Bound` on `switch`
///
/// The whole read-check-resolve-store sequence runs under one async mutex so
/// tasks sharing the binding never resolve twice or lose a switch.
pub struct CurrentHostname {
    binding: Mutex<Binding>,
}

impl Default for CurrentHostname {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentHostname {
    pub fn new() -> Self {
        Self {
            binding: Mutex::new(Binding::Unbound),
        }
    }

    /// Register a strategy for lazy resolution. A pending strategy is
    /// replaced; once bound, the value is kept and registration is ignored.
    pub async fn register(&self, strategy: Arc<dyn HostnameIdentification>) -> bool {
        let mut binding = self.binding.lock().await;
        match &*binding {
            Binding::Bound { .. } => {
                tracing::debug!("Hostname already bound, identification not re-registered");
                false
            }
            Binding::Unbound | Binding::Pending(_) => {
                *binding = Binding::Pending(strategy);
                true
            }
        }
    }

    /// Current hostname, running the pending strategy on first access.
    ///
    /// A failing strategy leaves the binding pending and hands the error
    /// back untouched.
    pub async fn resolve(&self, request: &RequestHost) -> Result<Option<Hostname>> {
        let mut binding = self.binding.lock().await;
        let strategy = match &*binding {
            Binding::Unbound => return Ok(None),
            Binding::Bound { hostname, .. } => return Ok(hostname.clone()),
            Binding::Pending(strategy) => Arc::clone(strategy),
        };

        let hostname = strategy.identify(request).await?;
        *binding = Binding::Bound {
            hostname: hostname.clone(),
            source: BindingSource::Identified,
        };
        Ok(hostname)
    }

    /// Bind `hostname` unconditionally and announce it before returning.
    pub async fn switch(&self, hostname: Hostname, dispatcher: &dyn EventDispatcher) -> Hostname {
        let mut binding = self.binding.lock().await;
        *binding = Binding::Bound {
            hostname: Some(hostname.clone()),
            source: BindingSource::Switched,
        };
        tracing::debug!(fqdn = %hostname.fqdn, "Switched current hostname");
        dispatcher.dispatch(TenancyEvent::Switched {
            hostname: hostname.clone(),
        });
        hostname
    }

    /// `None` until the binding holds a value
    pub async fn source(&self) -> Option<BindingSource> {
        match &*self.binding.lock().await {
            Binding::Bound { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub async fn is_resolved(&self) -> bool {
        self.source().await.is_some()
    }

    pub async fn is_pending(&self) -> bool {
        matches!(&*self.binding.lock().await, Binding::Pending(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TenancyError;
    use crate::events::{BroadcastDispatcher, NullDispatcher};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns a fixed result and counts invocations
    struct Fixed {
        hostname: Option<Hostname>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Fixed {
        fn new(hostname: Option<Hostname>) -> Arc<Self> {
            Arc::new(Self {
                hostname,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(hostname: Option<Hostname>) -> Arc<Self> {
            Arc::new(Self {
                hostname,
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(20),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HostnameIdentification for Fixed {
        async fn identify(&self, _request: &RequestHost) -> Result<Option<Hostname>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.hostname.clone())
        }
    }

    struct Failing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HostnameIdentification for Failing {
        async fn identify(&self, _request: &RequestHost) -> Result<Option<Hostname>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TenancyError::Identification("registry unavailable".to_string()))
        }
    }

    fn request() -> RequestHost {
        RequestHost::new("shop.example.com")
    }

    #[tokio::test]
    async fn test_unbound_reads_none() {
        let current = CurrentHostname::new();
        assert!(current.resolve(&request()).await.unwrap().is_none());
        assert!(current.resolve(&request()).await.unwrap().is_none());
        assert!(!current.is_resolved().await);
        assert!(!current.is_pending().await);
    }

    #[tokio::test]
    async fn test_resolves_once() {
        let strategy = Fixed::new(Some(Hostname::new("shop.example.com")));
        let current = CurrentHostname::new();
        assert!(current.register(strategy.clone()).await);
        assert!(current.is_pending().await);
        assert_eq!(strategy.calls(), 0);

        let first = current.resolve(&request()).await.unwrap();
        let second = current.resolve(&request()).await.unwrap();

        assert_eq!(strategy.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(current.source().await, Some(BindingSource::Identified));
    }

    #[tokio::test]
    async fn test_absent_result_is_memoized() {
        let strategy = Fixed::new(None);
        let current = CurrentHostname::new();
        current.register(strategy.clone()).await;

        assert!(current.resolve(&request()).await.unwrap().is_none());
        assert!(current.resolve(&request()).await.unwrap().is_none());
        assert_eq!(strategy.calls(), 1);
        assert!(current.is_resolved().await);
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let first = Fixed::new(Some(Hostname::new("first.example.com")));
        let second = Fixed::new(Some(Hostname::new("second.example.com")));
        let current = CurrentHostname::new();

        current.register(first.clone()).await;
        current.register(second.clone()).await;

        let hostname = current.resolve(&request()).await.unwrap().unwrap();
        assert_eq!(hostname.fqdn, "second.example.com");
        assert_eq!(first.calls(), 0);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn test_register_after_bound_is_ignored() {
        let first = Fixed::new(Some(Hostname::new("first.example.com")));
        let second = Fixed::new(Some(Hostname::new("second.example.com")));
        let current = CurrentHostname::new();

        current.register(first.clone()).await;
        current.resolve(&request()).await.unwrap();
        assert!(!current.register(second.clone()).await);

        let hostname = current.resolve(&request()).await.unwrap().unwrap();
        assert_eq!(hostname.fqdn, "first.example.com");
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_stays_pending() {
        let strategy = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let current = CurrentHostname::new();
        current.register(strategy.clone()).await;

        let err = current.resolve(&request()).await.unwrap_err();
        assert!(matches!(err, TenancyError::Identification(_)));
        assert!(current.is_pending().await);
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switch_overrides_and_emits() {
        let dispatcher = BroadcastDispatcher::default();
        let mut events = dispatcher.subscribe();
        let strategy = Fixed::new(Some(Hostname::new("identified.example.com")));
        let current = CurrentHostname::new();
        current.register(strategy.clone()).await;
        current.resolve(&request()).await.unwrap();

        let manual = Hostname::new("manual.example.com");
        let returned = current.switch(manual.clone(), &dispatcher).await;

        assert_eq!(returned, manual);
        assert_eq!(
            events.try_recv().unwrap(),
            TenancyEvent::Switched {
                hostname: manual.clone()
            }
        );
        assert!(events.try_recv().is_err());
        assert_eq!(current.resolve(&request()).await.unwrap(), Some(manual));
        assert_eq!(current.source().await, Some(BindingSource::Switched));
        assert_eq!(strategy.calls(), 1);
    }

    #[tokio::test]
    async fn test_switch_discards_pending_strategy() {
        let strategy = Fixed::new(Some(Hostname::new("identified.example.com")));
        let current = CurrentHostname::new();
        current.register(strategy.clone()).await;

        current
            .switch(Hostname::new("manual.example.com"), &NullDispatcher)
            .await;

        let hostname = current.resolve(&request()).await.unwrap().unwrap();
        assert_eq!(hostname.fqdn, "manual.example.com");
        assert_eq!(strategy.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_readers_resolve_once() {
        let strategy = Fixed::slow(Some(Hostname::new("shop.example.com")));
        let current = Arc::new(CurrentHostname::new());
        current.register(strategy.clone()).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let current = Arc::clone(&current);
            handles.push(tokio::spawn(async move {
                current.resolve(&request()).await.unwrap()
            }));
        }

        for handle in handles {
            let hostname = handle.await.unwrap().unwrap();
            assert_eq!(hostname.fqdn, "shop.example.com");
        }
        assert_eq!(strategy.calls(), 1);
    }

    #[tokio::test]
    async fn test_switch_during_resolve_is_not_lost() {
        let strategy = Arc::new(Fixed {
            hostname: Some(Hostname::new("identified.example.com")),
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        });
        let current = Arc::new(CurrentHostname::new());
        current.register(strategy.clone()).await;

        let reader = {
            let current = Arc::clone(&current);
            tokio::spawn(async move { current.resolve(&request()).await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Waits for the in-flight resolution, then overrides it
        current
            .switch(Hostname::new("manual.example.com"), &NullDispatcher)
            .await;

        let resolved = reader.await.unwrap().map(|h| h.fqdn);
        assert_eq!(resolved.as_deref(), Some("identified.example.com"));

        let after = current.resolve(&request()).await.unwrap().map(|h| h.fqdn);
        assert_eq!(after.as_deref(), Some("manual.example.com"));
        assert_eq!(current.source().await, Some(BindingSource::Switched));
        assert_eq!(strategy.calls(), 1);
    }
}
