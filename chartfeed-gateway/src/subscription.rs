//! Subscription registry
//!
//! Tracks which (symbol, period) keys have interested listeners and fans
//! inbound bars out to them. The registry is owned by the connection
//! supervisor task and only ever touched there, so it is a plain map with no
//! interior locking.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use chartfeed_core::{Bar, BarListener, SubscriptionKey};

/// Listener sets for all live subscription keys
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: HashMap<SubscriptionKey, Vec<BarListener>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under a key
    ///
    /// Returns `true` when the key was not tracked before (the caller owes
    /// the server a subscribe message). Re-adding the same handle is a no-op:
    /// a listener never receives a bar twice however often it subscribes.
    pub fn subscribe(&mut self, key: SubscriptionKey, listener: BarListener) -> bool {
        match self.subscriptions.entry(key) {
            Entry::Occupied(mut entry) => {
                let already = entry.get().iter().any(|l| Arc::ptr_eq(l, &listener));
                if already {
                    debug!("Listener already registered for {}", entry.key());
                } else {
                    entry.get_mut().push(listener);
                    debug!(
                        "Added listener to {} ({} registered)",
                        entry.key(),
                        entry.get().len()
                    );
                }
                false
            }
            Entry::Vacant(entry) => {
                debug!("Tracking new subscription {}", entry.key());
                entry.insert(vec![listener]);
                true
            }
        }
    }

    /// Drop the whole entry for a key, listeners and all
    ///
    /// Returns `true` when something was removed. An untracked key is a
    /// defined no-op; a later subscribe recreates the entry fresh.
    pub fn unsubscribe(&mut self, key: &SubscriptionKey) -> bool {
        match self.subscriptions.remove(key) {
            Some(listeners) => {
                debug!("Unsubscribed {} ({} listeners dropped)", key, listeners.len());
                true
            }
            None => {
                trace!("Unsubscribe for untracked key {}", key);
                false
            }
        }
    }

    /// Deliver a bar to every listener registered for the key
    ///
    /// Unknown keys deliver to nobody; the server and client views may
    /// transiently diverge around reconnects. Each invocation runs behind a
    /// panic guard so one bad callback cannot starve the rest. Returns the
    /// number of successful deliveries.
    pub fn dispatch(&self, key: &SubscriptionKey, bar: &Bar) -> usize {
        let Some(listeners) = self.subscriptions.get(key) else {
            trace!("No subscription for {}, dropping bar", key);
            return 0;
        };

        let mut delivered = 0;
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(bar.clone()))).is_err() {
                warn!("Bar listener for {} panicked", key);
            } else {
                delivered += 1;
            }
        }
        delivered
    }

    /// Keys currently tracked, for the on-open replay; order unspecified
    pub fn keys(&self) -> impl Iterator<Item = &SubscriptionKey> {
        self.subscriptions.keys()
    }

    pub fn contains(&self, key: &SubscriptionKey) -> bool {
        self.subscriptions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartfeed_core::Period;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_bar() -> Bar {
        Bar {
            timestamp: 1_700_000_000_000,
            open: 10.0,
            high: 10.5,
            low: 9.9,
            close: 10.2,
            volume: 1_000.0,
            amount: None,
            is_closed: Some(false),
        }
    }

    fn counting_listener() -> (BarListener, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let captured = Arc::clone(&count);
        let listener: BarListener = Arc::new(move |_bar| {
            captured.fetch_add(1, Ordering::SeqCst);
        });
        (listener, count)
    }

    #[test]
    fn test_subscribe_reports_newly_tracked() {
        let mut registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("600519.SH", Period::minutes(1));
        let (listener, _) = counting_listener();

        assert!(registry.subscribe(key.clone(), Arc::clone(&listener)));
        let (second, _) = counting_listener();
        assert!(!registry.subscribe(key.clone(), second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_handle_twice_delivers_once() {
        let mut registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("600519.SH", Period::minutes(1));
        let (listener, count) = counting_listener();

        registry.subscribe(key.clone(), Arc::clone(&listener));
        registry.subscribe(key.clone(), Arc::clone(&listener));

        assert_eq!(registry.dispatch(&key, &test_bar()), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_listeners_all_delivered() {
        let mut registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("000001.SZ", Period::daily());
        let (a, count_a) = counting_listener();
        let (b, count_b) = counting_listener();

        registry.subscribe(key.clone(), a);
        registry.subscribe(key.clone(), b);

        assert_eq!(registry.dispatch(&key, &test_bar()), 2);
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_unknown_key_is_silent() {
        let registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::from_wire("600519.SH", "5m");
        assert_eq!(registry.dispatch(&key, &test_bar()), 0);
    }

    #[test]
    fn test_unsubscribe_removes_entry() {
        let mut registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("600519.SH", Period::minutes(5));
        let (listener, count) = counting_listener();

        registry.subscribe(key.clone(), listener);
        assert!(registry.unsubscribe(&key));
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(&key, &test_bar()), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Untracked key is a no-op
        assert!(!registry.unsubscribe(&key));
    }

    #[test]
    fn test_resubscribe_after_unsubscribe_is_fresh() {
        let mut registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("600519.SH", Period::minutes(5));
        let (listener, _) = counting_listener();

        assert!(registry.subscribe(key.clone(), Arc::clone(&listener)));
        registry.unsubscribe(&key);
        // Entry was destroyed outright, so this is a brand new subscription
        assert!(registry.subscribe(key, listener));
    }

    #[test]
    fn test_panicking_listener_does_not_starve_the_rest() {
        let mut registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("600519.SH", Period::minutes(1));
        let panicking: BarListener = Arc::new(|_bar| panic!("listener bug"));
        let (counting, count) = counting_listener();

        registry.subscribe(key.clone(), panicking);
        registry.subscribe(key.clone(), counting);

        assert_eq!(registry.dispatch(&key, &test_bar()), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
